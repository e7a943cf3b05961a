//! Controller configuration, read from environment variables at startup.

use crate::error::ControllerError;
use ssh_client::SshConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const DEFAULT_INIT_SCRIPT_PATH: &str = "script/init_k8s_env.sh";
const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;
const DEFAULT_CONCURRENCY: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Local setup script uploaded by the default initialization batch
    pub init_script_path: String,
    /// Requeue delay after a successful pass
    pub resync_interval: Duration,
    /// Requeue delay after a failed pass
    pub error_requeue: Duration,
    /// Maximum number of nodes reconciled at once
    pub concurrency: u16,
    pub ssh: SshConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            init_script_path: DEFAULT_INIT_SCRIPT_PATH.to_string(),
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS),
            error_requeue: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            ssh: SshConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let ssh = SshConfig {
            ssh_binary: var("SSH_BINARY").unwrap_or(defaults.ssh.ssh_binary),
            scp_binary: var("SCP_BINARY").unwrap_or(defaults.ssh.scp_binary),
            sshpass_binary: var("SSHPASS_BINARY").unwrap_or(defaults.ssh.sshpass_binary),
            connect_timeout: seconds(var("SSH_CONNECT_TIMEOUT_SECS"), "SSH_CONNECT_TIMEOUT_SECS")?
                .unwrap_or(defaults.ssh.connect_timeout),
            command_timeout: seconds(var("SSH_COMMAND_TIMEOUT_SECS"), "SSH_COMMAND_TIMEOUT_SECS")?
                .unwrap_or(defaults.ssh.command_timeout),
        };

        let concurrency = number::<u16>(var("RECONCILE_CONCURRENCY"), "RECONCILE_CONCURRENCY")?
            .unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            namespace: var("WATCH_NAMESPACE"),
            init_script_path: var("INIT_SCRIPT_PATH").unwrap_or(defaults.init_script_path),
            resync_interval: seconds(var("RESYNC_INTERVAL_SECS"), "RESYNC_INTERVAL_SECS")?
                .unwrap_or(defaults.resync_interval),
            error_requeue: seconds(var("ERROR_REQUEUE_SECS"), "ERROR_REQUEUE_SECS")?
                .unwrap_or(defaults.error_requeue),
            concurrency,
            ssh,
        })
    }

    pub fn log(&self) {
        info!("Configuration:");
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Init script: {}", self.init_script_path);
        info!("  Resync interval: {:?}", self.resync_interval);
        info!("  Error requeue: {:?}", self.error_requeue);
        info!("  Concurrency: {}", self.concurrency);
        info!(
            "  SSH: {} / {} / {} (connect timeout {:?}, command timeout {:?})",
            self.ssh.ssh_binary,
            self.ssh.scp_binary,
            self.ssh.sshpass_binary,
            self.ssh.connect_timeout,
            self.ssh.command_timeout
        );
    }
}

fn number<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, ControllerError> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                ControllerError::InvalidConfig(format!("{key} must be a non-negative integer, got {raw:?}"))
            })
        })
        .transpose()
}

fn seconds(value: Option<String>, key: &str) -> Result<Option<Duration>, ControllerError> {
    Ok(number::<u64>(value, key)?.map(Duration::from_secs))
}
