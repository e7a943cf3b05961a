//! Controller-specific error types.
//!
//! Per-host command failures are not errors: they are recorded in the
//! MetalNode status as diagnostics. Only the failures below end a pass.

use cloudinit::CloudInitError;
use crds::ValidationError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the MetalNode Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Malformed node endpoint
    #[error("Invalid metal node endpoint: {0}")]
    Validation(#[from] ValidationError),

    /// Bootstrap data could not be translated
    #[error("Bootstrap data error: {0}")]
    CloudInit(#[from] CloudInitError),

    /// Bootstrap secret missing or incomplete
    #[error("Error retrieving bootstrap data: {0}")]
    BootstrapData(String),

    /// Verification batch reported failures
    #[error("Metal node initialization failed: {0}")]
    InitializationFailed(String),

    /// Bootstrap marker file could not be read back
    #[error("Metal node bootstrap failed: {0}")]
    BootstrapFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
