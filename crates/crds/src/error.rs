//! CRD validation errors

use thiserror::Error;

/// Errors raised while validating a `MetalNode` spec
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The endpoint host is neither an IPv4 nor an IPv6 literal
    #[error("endpoint host {0:?} is not a valid IP address, neither IPv4 nor IPv6")]
    InvalidEndpointHost(String),
}
