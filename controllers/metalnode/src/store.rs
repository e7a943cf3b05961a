//! MetalNode persistence.
//!
//! The reconciler only needs to read a node and write the lifecycle part of
//! its status back; the `NodeStore` trait keeps it independent of the
//! Kubernetes API so the state machine can be tested against an in-memory
//! store.

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{LifecyclePatch, MetalNode};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::fmt;

/// Identity of a MetalNode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub namespace: String,
    pub name: String,
}

impl NodeKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_node(node: &MetalNode) -> Self {
        Self::new(node.namespace().unwrap_or_else(|| "default".to_string()), node.name_any())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[async_trait]
pub trait NodeStore: Send + Sync {
    /// `None` when the node no longer exists.
    async fn get(&self, key: &NodeKey) -> Result<Option<MetalNode>, ControllerError>;

    /// Merges the lifecycle fields into the node status. Other status
    /// fields are left as stored.
    async fn update_status(&self, key: &NodeKey, patch: &LifecyclePatch) -> Result<(), ControllerError>;
}

/// `NodeStore` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeNodeStore {
    client: Client,
}

impl KubeNodeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<MetalNode> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl NodeStore for KubeNodeStore {
    async fn get(&self, key: &NodeKey) -> Result<Option<MetalNode>, ControllerError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update_status(&self, key: &NodeKey, patch: &LifecyclePatch) -> Result<(), ControllerError> {
        let status_patch = serde_json::json!({ "status": patch });
        let pp = PatchParams::default();
        self.api(&key.namespace)
            .patch_status(&key.name, &pp, &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }
}
