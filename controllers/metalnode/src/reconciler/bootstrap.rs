//! Bootstrap data replay.

use super::{Reconciler, node_host};
use crate::error::ControllerError;
use crate::store::NodeKey;
use crds::{MetalNode, MetalNodeStatus};
use ssh_client::Command;
use tracing::{info, warn};

/// Written by the bootstrap data once the node has joined.
pub const BOOTSTRAP_CHECK_COMMAND: &str = "sudo cat /run/cluster-api/bootstrap-success.complete";

impl Reconciler {
    /// Applies the bootstrap data referenced by `status.data_secret_name`
    /// and marks the node bootstrapped once the success marker is readable.
    ///
    /// Errors leave `phase` and `ready` alone. A node released from its
    /// cluster while the batch ran is not marked bootstrapped.
    pub(crate) async fn bootstrap(
        &self,
        key: &NodeKey,
        node: &MetalNode,
        status: &mut MetalNodeStatus,
    ) -> Result<(), ControllerError> {
        let host = node_host(node);
        info!(
            node = %key,
            host = %host.address,
            "Bootstrapping metal node with data from secret {}",
            status.data_secret_name
        );

        let data = self
            .bootstrap_source
            .get_bootstrap_data(&key.namespace, &status.data_secret_name)
            .await?;
        let outcome = self.parser.parse(&data.value, &data.format)?;
        for diagnostic in &outcome.diagnostics {
            warn!(node = %key, "Skipped bootstrap data block: {}", diagnostic);
        }

        let failures = self.run_on(&host, &outcome.command).await;
        if !failures.is_empty() {
            warn!(node = %key, host = %host.address, "Bootstrap reported failures: {:?}", failures);
            status.bootstrap_failure_reason = failures;
            self.write_status(key, node, status).await?;
        }

        let failures = self.run_on(&host, &Command::new([BOOTSTRAP_CHECK_COMMAND])).await;
        if !failures.is_empty() {
            return Err(ControllerError::BootstrapFailed(failures.join("; ")));
        }

        // The node may have been released while the batch ran.
        let still_assigned = self
            .store
            .get(key)
            .await?
            .and_then(|current| current.status)
            .is_some_and(|current| current.data_secret_name == status.data_secret_name);
        if !still_assigned {
            info!(
                node = %key,
                "Bootstrap secret {} no longer assigned, not marking metal node bootstrapped",
                status.data_secret_name
            );
            return Ok(());
        }

        status.bootstrapped = true;
        info!(node = %key, host = %host.address, "Bootstrapped metal node successfully");
        Ok(())
    }
}
