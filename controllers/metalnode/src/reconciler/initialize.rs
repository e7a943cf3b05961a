//! Prerequisite installation and verification.

use super::{Reconciler, node_host};
use crate::error::ControllerError;
use crate::store::NodeKey;
use crds::{MetalNode, MetalNodeStatus, NodePhase};
use ssh_client::{Command, FileUpload};
use std::path::Path;
use tracing::{info, warn};

/// Where the setup script lands on the host.
const REMOTE_SCRIPT_DIR: &str = "/tmp";

/// Confirms the container runtime and Kubernetes tools respond.
pub const CHECK_COMMANDS: [&str; 4] = [
    "sudo docker version",
    "kubelet --version",
    "kubeadm version",
    "kubectl version",
];

/// Failure lines that are expected before the node joins a cluster:
/// kubectl cannot reach an API server yet.
pub fn benign_check_failures(address: &str) -> Vec<String> {
    [address, "localhost"]
        .iter()
        .flat_map(|server| {
            ["6443", "8080"].map(|port| {
                format!("The connection to the server {server}:{port} was refused - did you specify the right host or port?")
            })
        })
        .collect()
}

/// Drops the exact benign lines.
pub fn filter_benign(failures: Vec<String>, address: &str) -> Vec<String> {
    let benign = benign_check_failures(address);
    failures.into_iter().filter(|line| !benign.contains(line)).collect()
}

impl Reconciler {
    /// Initialization batch for `node`.
    ///
    /// The setup script is always uploaded; a non-empty `initializationCmd`
    /// replaces the default commands that run it.
    pub(crate) fn init_command(&self, node: &MetalNode) -> Command {
        let script = Path::new(&self.init_script_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("init_k8s_env.sh");
        let remote = format!("{REMOTE_SCRIPT_DIR}/{script}");

        let mut command = Command::new([
            format!("sudo chmod +x {remote}"),
            format!("sudo sed -i 's/\\r//g' {remote}"),
            format!("sudo /bin/bash {remote}"),
            format!("sudo hostnamectl set-hostname {}", node.host()),
        ])
        .with_upload(FileUpload::new(self.init_script_path.clone(), REMOTE_SCRIPT_DIR));

        if let Some(custom) = node.spec.initialization_cmd.as_ref().filter(|cmds| !cmds.is_empty()) {
            command.set_commands(custom.clone());
        }
        command
    }

    /// Takes an unset node through `Initializing` and `Checking` to
    /// `Success`, or to `Fail` when verification reports real failures.
    pub(crate) async fn initialize(
        &self,
        key: &NodeKey,
        node: &MetalNode,
        status: &mut MetalNodeStatus,
    ) -> Result<(), ControllerError> {
        let host = node_host(node);

        status.transition(NodePhase::Initializing);
        status.bootstrapped = false;
        status.ready = false;
        self.write_status(key, node, status).await?;
        info!(node = %key, host = %host.address, "Initializing metal node");

        // Failures here are kept as hints only; verification decides.
        let failures = self.run_on(&host, &self.init_command(node)).await;
        if !failures.is_empty() {
            warn!(node = %key, host = %host.address, "Initialization reported failures: {:?}", failures);
            status.initialization_failure_reason = failures;
            self.write_status(key, node, status).await?;
        }

        status.transition(NodePhase::Checking);
        self.write_status(key, node, status).await?;

        let check = Command::new(CHECK_COMMANDS);
        let failures = filter_benign(self.run_on(&host, &check).await, &host.address);
        if !failures.is_empty() {
            warn!(node = %key, host = %host.address, "Verification reported failures: {:?}", failures);
            let summary = failures.join("; ");
            status.check_failure_reason = failures;
            status.transition(NodePhase::Fail);
            return Err(ControllerError::InitializationFailed(summary));
        }

        status.transition(NodePhase::Success);
        info!(node = %key, host = %host.address, "Initialized metal node successfully");
        Ok(())
    }
}
