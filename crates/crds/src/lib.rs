//! MetalNode CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the MetalNode controller.

pub mod metal_node;
pub mod error;

pub use metal_node::*;
pub use error::*;
