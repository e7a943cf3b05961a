//! SSH client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving the OpenSSH client.
///
/// These never escape [`crate::RemoteExecutor::run`]; they are rendered into
/// the per-host failure lines.
#[derive(Debug, Error)]
pub enum SshError {
    /// Local IO error (e.g. writing the private key file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The client binary could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Binary that failed to start
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// The remote command did not finish in time
    #[error("{description} timed out after {}s", timeout.as_secs())]
    Timeout {
        /// What was running
        description: String,
        /// Limit that was hit
        timeout: Duration,
    },
}
