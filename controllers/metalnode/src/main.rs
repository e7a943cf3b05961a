//! MetalNode Controller
//!
//! Prepares bare-metal or unmanaged virtual hosts for Kubernetes over SSH
//! and joins them to a cluster:
//! - Installs the container runtime, kubelet and kubeadm with a setup script
//! - Verifies the tools respond
//! - Replays the cloud-config bootstrap data assigned by the cluster
//!   provisioner and checks for its success marker
//!
//! Progress and command output are reported in the MetalNode status.

mod config;
mod controller;
mod error;
mod reconciler;
mod secrets;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use rustls::crypto::{CryptoProvider, ring::default_provider};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    // kube uses rustls; pin the ring provider before the first connection.
    let _ = CryptoProvider::install_default(default_provider());

    info!("Starting MetalNode Controller");

    let config = ControllerConfig::from_env()?;
    config.log();

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
