//! RemoteExecutor trait for mocking
//!
//! The reconciler only sees this trait. `SshClient` implements it for real
//! hosts and `MockRemoteExecutor` (feature `test-util`) for unit tests.

use crate::command::Command;
use crate::host::Host;
use std::collections::HashMap;

/// Failure output per host address. An empty list means the batch succeeded.
pub type HostFailures = HashMap<String, Vec<String>>;

/// Runs command batches on remote hosts.
#[async_trait::async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Runs `command` on every host and returns the failure lines per host.
    ///
    /// Every submitted host has an entry in the result. Failures are data,
    /// not errors: transport problems show up as failure lines too.
    async fn run(&self, hosts: &[Host], command: &Command) -> HostFailures;
}
