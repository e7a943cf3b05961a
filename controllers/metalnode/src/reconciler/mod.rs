//! MetalNode lifecycle.
//!
//! One call to [`Reconciler::reconcile`] is one pass over one node:
//!
//! ```text
//! Unset -> Initializing -> Checking -> Success | Fail
//! ```
//!
//! `Initializing` and `Checking` mark work in flight; a pass that finds a
//! node in either phase does nothing. A node stuck there after a controller
//! restart has to be reset by hand.
//!
//! Independently of the phase, a node with a bootstrap secret that has not
//! been applied yet gets its bootstrap data replayed and verified.
//!
//! Each pass works on its own copy of the status and ends with one
//! unconditional status write; intermediate writes only make progress
//! visible while long batches run. Writes carry only the lifecycle fields,
//! so a release from the cluster during a pass survives it. A pass that
//! fails with an in-flight phase writes back the status it started from,
//! so the node is not left marked busy with no work behind it.

pub mod bootstrap;
pub mod initialize;


use crate::error::ControllerError;
use crate::secrets::BootstrapDataSource;
use crate::store::{NodeKey, NodeStore};
use cloudinit::BootstrapDataParser;
use crds::{MetalNode, MetalNodeStatus, NodePhase};
use ssh_client::{Command, Credential, Host, RemoteExecutor};
use tracing::{debug, error, info};

/// Status computed by a pass, and how the pass ended.
#[derive(Debug)]
pub struct PassOutcome {
    pub status: MetalNodeStatus,
    pub result: Result<(), ControllerError>,
}

/// Reconciles MetalNode resources.
pub struct Reconciler {
    pub(crate) store: Box<dyn NodeStore>,
    pub(crate) executor: Box<dyn RemoteExecutor>,
    pub(crate) bootstrap_source: Box<dyn BootstrapDataSource>,
    pub(crate) parser: BootstrapDataParser,
    /// Local path of the setup script uploaded by the default init batch
    pub(crate) init_script_path: String,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: impl NodeStore + 'static,
        executor: impl RemoteExecutor + 'static,
        bootstrap_source: impl BootstrapDataSource + 'static,
        init_script_path: impl Into<String>,
    ) -> Self {
        Self {
            store: Box::new(store),
            executor: Box::new(executor),
            bootstrap_source: Box::new(bootstrap_source),
            parser: BootstrapDataParser::new(),
            init_script_path: init_script_path.into(),
        }
    }

    /// Runs one pass for the node identified by `key`.
    ///
    /// A node that no longer exists is not an error. An invalid endpoint
    /// fails the pass before any status is written.
    pub async fn reconcile(&self, key: &NodeKey) -> Result<(), ControllerError> {
        let Some(node) = self.store.get(key).await? else {
            debug!(node = %key, "MetalNode not found, nothing to do");
            return Ok(());
        };

        if let Err(e) = node.spec.node_endpoint.validate() {
            error!(node = %key, "Invalid metal node endpoint host: {}", e);
            return Err(e.into());
        }

        let PassOutcome { mut status, result } = self.run_pass(key, &node).await;

        if status.phase == NodePhase::Success {
            status.ready = true;
        }
        if let Err(e) = self.write_status(key, &node, &status).await {
            error!(node = %key, host = node.host(), "Failed to update metal node status: {}", e);
        }

        result
    }

    /// Computes the next status of `node`.
    ///
    /// Intermediate status writes happen here; the final write is left to
    /// the caller.
    pub async fn run_pass(&self, key: &NodeKey, node: &MetalNode) -> PassOutcome {
        let initial = node.status.clone().unwrap_or_default();
        let mut status = initial.clone();
        let result = self.advance(key, node, &mut status).await;
        if let Err(e) = &result {
            error!(node = %key, host = node.host(), phase = %status.phase, "Metal node pass failed: {}", e);
            if status.phase.is_in_flight() {
                status = initial;
            }
        }
        PassOutcome { status, result }
    }

    /// Writes the lifecycle fields of `status` for `node`.
    pub(crate) async fn write_status(
        &self,
        key: &NodeKey,
        node: &MetalNode,
        status: &MetalNodeStatus,
    ) -> Result<(), ControllerError> {
        let patch = match &node.status {
            Some(base) => status.lifecycle_patch(base),
            None => status.lifecycle_patch(&MetalNodeStatus::default()),
        };
        self.store.update_status(key, &patch).await
    }

    async fn advance(&self, key: &NodeKey, node: &MetalNode, status: &mut MetalNodeStatus) -> Result<(), ControllerError> {
        if status.phase.is_in_flight() {
            debug!(node = %key, phase = %status.phase, "Metal node busy, skipping pass");
            return Ok(());
        }

        if status.phase == NodePhase::Unset {
            self.initialize(key, node, status).await?;
        }

        if status.bootstrap_pending() {
            self.bootstrap(key, node, status).await?;
        }

        Ok(())
    }

    /// Runs `command` on `host` and returns that host's failure lines.
    pub(crate) async fn run_on(&self, host: &Host, command: &Command) -> Vec<String> {
        debug!(
            host = %host.address,
            "Running {} command(s), {} upload(s)",
            command.flatten().len(),
            command.file_uploads().len()
        );
        let mut failures = self.executor.run(std::slice::from_ref(host), command).await;
        let lines = failures.remove(&host.address).unwrap_or_default();
        if !lines.is_empty() {
            info!(host = %host.address, "Batch reported {} failure line(s)", lines.len());
        }
        lines
    }
}

/// SSH target for `node`; a configured key takes precedence over a password.
pub(crate) fn node_host(node: &MetalNode) -> Host {
    let auth = &node.spec.node_endpoint.ssh_auth;
    Host::new(
        auth.user.clone(),
        node.host(),
        auth.port,
        Credential::from_parts(auth.password.as_deref(), auth.ssh_key.as_deref()),
    )
}
