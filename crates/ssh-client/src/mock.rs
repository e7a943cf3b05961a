//! Mock RemoteExecutor for unit testing
//!
//! Records every batch it receives and answers with failure lines scripted
//! per command string, without touching the network.

use crate::command::Command;
use crate::executor_trait::{HostFailures, RemoteExecutor};
use crate::host::Host;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A batch submitted to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Target hosts
    pub hosts: Vec<Host>,
    /// Submitted batch
    pub command: Command,
}

/// In-memory executor.
///
/// Clones share state, so a test can keep a handle while the reconciler owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteExecutor {
    failures: Arc<Mutex<HashMap<String, Vec<String>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockRemoteExecutor {
    /// Mock with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every run of `command` (exact match) report `lines`.
    pub fn fail_command(&self, command: impl Into<String>, lines: Vec<String>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.into(), lines);
    }

    /// Every batch received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of batches received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for MockRemoteExecutor {
    async fn run(&self, hosts: &[Host], command: &Command) -> HostFailures {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                hosts: hosts.to_vec(),
                command: command.clone(),
            });

        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let lines: Vec<String> = command
            .flatten()
            .iter()
            .filter_map(|c| failures.get(c))
            .flatten()
            .cloned()
            .collect();

        hosts
            .iter()
            .map(|host| (host.address.clone(), lines.clone()))
            .collect()
    }
}
