//! SSH Remote Execution Client
//!
//! Runs ordered command batches and file uploads against provisioning hosts
//! by driving the system OpenSSH client (`ssh`, `scp`, and `sshpass` for
//! password logins).
//!
//! # Example
//!
//! ```no_run
//! use ssh_client::{Command, Credential, FileUpload, Host, RemoteExecutor, SshClient, SshConfig};
//!
//! # async fn example() {
//! let client = SshClient::new(SshConfig::default());
//! let host = Host::new("root", "10.0.0.5", 22, Credential::Password("secret".to_string()));
//! let command = Command::new(["sudo /bin/bash /tmp/setup.sh"])
//!     .with_upload(FileUpload::new("script/setup.sh", "/tmp"));
//!
//! let failures = client.run(&[host], &command).await;
//! assert!(failures["10.0.0.5"].is_empty());
//! # }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod host;
#[path = "trait.rs"]
pub mod executor_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{SshClient, SshConfig};
pub use command::{Command, FileUpload};
pub use error::SshError;
pub use host::{Credential, Host};
pub use executor_trait::{HostFailures, RemoteExecutor};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockRemoteExecutor, RecordedCall};
