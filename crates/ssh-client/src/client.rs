//! OpenSSH backed executor
//!
//! Every command of a batch is a separate `ssh` invocation; uploads go
//! through `scp`. Password logins are wrapped in `sshpass -e` so the password
//! travels in the environment rather than on the command line.

use crate::command::{Command, FileUpload};
use crate::error::SshError;
use crate::executor_trait::{HostFailures, RemoteExecutor};
use crate::host::{Credential, Host};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// OpenSSH client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    /// `ssh` executable
    pub ssh_binary: String,
    /// `scp` executable
    pub scp_binary: String,
    /// `sshpass` executable, used for password logins
    pub sshpass_binary: String,
    /// Passed to ssh as `ConnectTimeout`
    pub connect_timeout: Duration,
    /// Upper bound for a single command or upload
    pub command_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_binary: "ssh".to_string(),
            scp_binary: "scp".to_string(),
            sshpass_binary: "sshpass".to_string(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(600),
        }
    }
}

/// Runs command batches through the system OpenSSH client.
#[derive(Debug, Clone, Default)]
pub struct SshClient {
    config: SshConfig,
}

/// A fully resolved client process: program, arguments and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) env: Option<(String, String)>,
    /// What the invocation does, for failure lines
    pub(crate) description: String,
}

/// Per-host state for the duration of one batch.
struct Session<'a> {
    host: &'a Host,
    // Removed from disk when the session is dropped
    identity: Option<NamedTempFile>,
}

impl<'a> Session<'a> {
    fn open(host: &'a Host) -> Result<Self, SshError> {
        let identity = match &host.credential {
            Credential::PrivateKey(key) => {
                // NamedTempFile is created owner read/write only
                let mut file = NamedTempFile::new()?;
                file.write_all(key.as_bytes())?;
                if !key.ends_with('\n') {
                    file.write_all(b"\n")?;
                }
                file.flush()?;
                Some(file)
            }
            Credential::Password(_) | Credential::Agent => None,
        };
        Ok(Self { host, identity })
    }

    fn identity_path(&self) -> Option<&Path> {
        self.identity.as_ref().map(NamedTempFile::path)
    }
}

impl SshClient {
    /// Creates a client using `config`.
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Settings this client runs with.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    async fn run_on_host(&self, host: &Host, command: &Command) -> Vec<String> {
        let session = match Session::open(host) {
            Ok(session) => session,
            Err(e) => {
                warn!(host = %host.address, "Failed to prepare ssh session: {}", e);
                return vec![e.to_string()];
            }
        };

        let mut failures = Vec::new();
        for file in command.file_uploads() {
            let invocation = self.scp_invocation(&session, file);
            if let Err(lines) = self.execute(&invocation).await {
                failures.extend(lines);
            }
        }
        // Keep going after a failure so every diagnostic is collected
        for remote_command in command.flatten() {
            let invocation = self.ssh_invocation(&session, remote_command);
            if let Err(lines) = self.execute(&invocation).await {
                failures.extend(lines);
            }
        }
        failures
    }

    /// Options shared by ssh and scp.
    fn common_options(&self, session: &Session<'_>) -> Vec<String> {
        let mut options = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs()),
        ];
        match &session.host.credential {
            Credential::PrivateKey(_) => {
                if let Some(path) = session.identity_path() {
                    options.push("-i".to_string());
                    options.push(path.display().to_string());
                }
                options.extend(["-o", "IdentitiesOnly=yes", "-o", "BatchMode=yes"].map(String::from));
            }
            Credential::Password(_) => {
                options.extend(
                    [
                        "-o",
                        "PubkeyAuthentication=no",
                        "-o",
                        "PreferredAuthentications=password,keyboard-interactive",
                    ]
                    .map(String::from),
                );
            }
            Credential::Agent => {
                options.extend(["-o", "BatchMode=yes"].map(String::from));
            }
        }
        options
    }

    fn ssh_invocation(&self, session: &Session<'_>, remote_command: &str) -> Invocation {
        let mut args = self.common_options(session);
        args.push("-p".to_string());
        args.push(session.host.port.to_string());
        args.push(session.host.ssh_target());
        args.push(remote_command.to_string());
        self.wrap(session, &self.config.ssh_binary, args, remote_command.to_string())
    }

    fn scp_invocation(&self, session: &Session<'_>, file: &FileUpload) -> Invocation {
        let mut args = self.common_options(session);
        args.push("-P".to_string());
        args.push(session.host.port.to_string());
        args.push(file.src.clone());
        args.push(session.host.scp_target(&file.dst));
        self.wrap(
            session,
            &self.config.scp_binary,
            args,
            format!("upload of {} to {}", file.src, file.dst),
        )
    }

    /// Prefixes password logins with `sshpass -e`.
    fn wrap(&self, session: &Session<'_>, program: &str, args: Vec<String>, description: String) -> Invocation {
        match &session.host.credential {
            Credential::Password(password) => {
                let mut wrapped = vec!["-e".to_string(), program.to_string()];
                wrapped.extend(args);
                Invocation {
                    program: self.config.sshpass_binary.clone(),
                    args: wrapped,
                    env: Some(("SSHPASS".to_string(), password.clone())),
                    description,
                }
            }
            Credential::PrivateKey(_) | Credential::Agent => Invocation {
                program: program.to_string(),
                args,
                env: None,
                description,
            },
        }
    }

    async fn execute(&self, invocation: &Invocation) -> Result<(), Vec<String>> {
        debug!("Running {}", invocation.description);

        let mut process = tokio::process::Command::new(&invocation.program);
        process
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some((key, value)) = &invocation.env {
            process.env(key, value);
        }

        let output = match tokio::time::timeout(self.config.command_timeout, process.output()).await {
            Err(_) => {
                let error = SshError::Timeout {
                    description: invocation.description.clone(),
                    timeout: self.config.command_timeout,
                };
                return Err(vec![error.to_string()]);
            }
            Ok(Err(source)) => {
                let error = SshError::Spawn {
                    program: invocation.program.clone(),
                    source,
                };
                return Err(vec![error.to_string()]);
            }
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(failure_lines(
                &invocation.description,
                output.status.code(),
                &output.stdout,
                &output.stderr,
            ))
        }
    }
}

/// Failure lines of a command that exited unsuccessfully.
///
/// Prefers stderr, falls back to stdout, and finally to a synthetic line so
/// that a failure is never reported as an empty list.
pub(crate) fn failure_lines(description: &str, code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Vec<String> {
    let collect = |bytes: &[u8]| -> Vec<String> {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    };

    let lines = collect(stderr);
    if !lines.is_empty() {
        return lines;
    }
    let lines = collect(stdout);
    if !lines.is_empty() {
        return lines;
    }
    let status = match code {
        Some(code) => format!("exit status {code}"),
        None => "a signal".to_string(),
    };
    vec![format!("{description} exited with {status}")]
}

#[async_trait::async_trait]
impl RemoteExecutor for SshClient {
    async fn run(&self, hosts: &[Host], command: &Command) -> HostFailures {
        let runs = hosts.iter().map(|host| async move {
            let failures = self.run_on_host(host, command).await;
            (host.address.clone(), failures)
        });
        futures::future::join_all(runs).await.into_iter().collect()
    }
}
