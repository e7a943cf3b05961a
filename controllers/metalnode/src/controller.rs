//! Main controller implementation.
//!
//! Wires the Kubernetes-backed collaborators and the SSH executor into the
//! reconciler and runs the MetalNode watcher until it exits or the process
//! is interrupted.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::secrets::SecretBootstrapSource;
use crate::store::KubeNodeStore;
use crate::watcher::Watcher;
use crds::MetalNode;
use kube::{Api, Client};
use ssh_client::SshClient;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main controller for MetalNode provisioning.
pub struct Controller {
    metal_node_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing MetalNode Controller");

        let kube_client = Client::try_default().await?;

        if !Path::new(&config.init_script_path).is_file() {
            warn!(
                "Init script {} not found; nodes without initializationCmd will fail to initialize",
                config.init_script_path
            );
        }

        let reconciler = Reconciler::new(
            KubeNodeStore::new(kube_client.clone()),
            SshClient::new(config.ssh.clone()),
            SecretBootstrapSource::new(kube_client.clone()),
            config.init_script_path.clone(),
        );

        let metal_node_api: Api<MetalNode> = match &config.namespace {
            Some(namespace) => Api::namespaced(kube_client.clone(), namespace),
            None => Api::all(kube_client.clone()),
        };

        let watcher = Arc::new(Watcher::new(Arc::new(reconciler), metal_node_api, &config));
        let metal_node_watcher = tokio::spawn(async move { watcher.watch_metal_nodes().await });

        Ok(Self { metal_node_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("MetalNode Controller running");

        tokio::select! {
            result = &mut self.metal_node_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MetalNode watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("MetalNode watcher error: {}", e)))?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping MetalNode watcher");
                self.metal_node_watcher.abort();
            }
        }

        Ok(())
    }
}
