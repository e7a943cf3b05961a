//! MetalNode watcher.
//!
//! Drives the reconciler from `kube_runtime::Controller`, which re-lists on
//! reconnect and never runs two reconciles for the same object at once.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::NodeKey;
use crds::MetalNode;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{Controller, controller::{Action, Config as RuntimeConfig}, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Events arriving within this window are folded into one reconcile.
const DEBOUNCE: Duration = Duration::from_secs(1);

/// Watches MetalNode resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    metal_node_api: Api<MetalNode>,
    resync_interval: Duration,
    error_requeue: Duration,
    concurrency: u16,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, metal_node_api: Api<MetalNode>, config: &ControllerConfig) -> Self {
        Self {
            reconciler,
            metal_node_api,
            resync_interval: config.resync_interval,
            error_requeue: config.error_requeue,
            concurrency: config.concurrency,
        }
    }

    /// Runs until the watch stream ends.
    ///
    /// A successful pass requeues after the resync interval; a failed one
    /// after the fixed error delay.
    pub async fn watch_metal_nodes(&self) -> Result<(), ControllerError> {
        info!("Starting MetalNode watcher");

        let resync_interval = self.resync_interval;
        let error_requeue = self.error_requeue;

        let reconcile = move |node: Arc<MetalNode>, ctx: Arc<Reconciler>| async move {
            let key = NodeKey::from_node(&node);
            debug!(node = %key, "Reconciling MetalNode");
            ctx.reconcile(&key).await?;
            Ok::<_, ControllerError>(Action::requeue(resync_interval))
        };

        let error_policy = move |node: Arc<MetalNode>, error: &ControllerError, _ctx: Arc<Reconciler>| {
            error!(node = %NodeKey::from_node(&node), "Reconciliation error for MetalNode: {}", error);
            Action::requeue(error_requeue)
        };

        let controller_config = RuntimeConfig::default()
            .debounce(DEBOUNCE)
            .concurrency(self.concurrency);

        Controller::new(self.metal_node_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((object, _)) => debug!("Reconciled MetalNode {}", object),
                    Err(e) => error!("Controller error for MetalNode: {}", e),
                }
            })
            .await;

        Ok(())
    }
}
