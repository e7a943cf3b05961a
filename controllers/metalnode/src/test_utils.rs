//! Test utilities for unit testing the reconciler
//!
//! In-memory stand-ins for the Kubernetes-backed collaborators plus helpers
//! for building MetalNode fixtures. Clones share state, so a test keeps one
//! handle and gives the other to the reconciler.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::secrets::{BootstrapData, BootstrapDataSource};
use crate::store::{NodeKey, NodeStore};
use async_trait::async_trait;
use crds::{Endpoint, LifecyclePatch, MetalNode, MetalNodeSpec, MetalNodeStatus, SshAuth};
use kube::core::ErrorResponse;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use ssh_client::MockRemoteExecutor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub const TEST_NAMESPACE: &str = "metal";
pub const TEST_HOST: &str = "10.0.0.5";

/// Helper to create a test MetalNode with password auth
pub fn create_test_metal_node(name: &str, host: &str, status: Option<MetalNodeStatus>) -> MetalNode {
    MetalNode {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: MetalNodeSpec {
            node_name: Some(name.to_string()),
            node_endpoint: Endpoint {
                host: host.to_string(),
                ssh_auth: SshAuth {
                    user: "root".to_string(),
                    password: Some("secret".to_string()),
                    ssh_key: None,
                    port: 22,
                },
            },
            initialization_cmd: None,
        },
        status,
    }
}

pub fn test_key(name: &str) -> NodeKey {
    NodeKey::new(TEST_NAMESPACE, name)
}

#[derive(Clone, Default)]
pub struct InMemoryNodeStore {
    nodes: Arc<Mutex<HashMap<NodeKey, MetalNode>>>,
    writes: Arc<Mutex<Vec<MetalNodeStatus>>>,
    /// Successful writes still to let through, then writes to fail
    write_failures: Arc<Mutex<(usize, usize)>>,
}

impl InMemoryNodeStore {
    pub fn insert(&self, node: MetalNode) {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(NodeKey::from_node(&node), node);
    }

    /// Current persisted status of `key`.
    pub fn status(&self, key: &NodeKey) -> Option<MetalNodeStatus> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|node| node.status.clone())
    }

    /// Stored status after every successful status write, in order.
    pub fn writes(&self) -> Vec<MetalNodeStatus> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Makes the next `count` status writes fail like an unavailable API server.
    pub fn fail_writes(&self, count: usize) {
        self.fail_writes_after(0, count);
    }

    /// Lets `successes` writes through, then fails the next `count`.
    pub fn fail_writes_after(&self, successes: usize, count: usize) {
        *self.write_failures.lock().unwrap_or_else(PoisonError::into_inner) = (successes, count);
    }

    /// Releases `key` from its cluster, as the cluster provisioner would.
    pub fn release(&self, key: &NodeKey) {
        if let Some(node) = self.nodes.lock().unwrap_or_else(PoisonError::into_inner).get_mut(key) {
            node.reset();
        }
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn get(&self, key: &NodeKey) -> Result<Option<MetalNode>, ControllerError> {
        Ok(self.nodes.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    async fn update_status(&self, key: &NodeKey, patch: &LifecyclePatch) -> Result<(), ControllerError> {
        {
            let mut plan = self.write_failures.lock().unwrap_or_else(PoisonError::into_inner);
            let (successes, failures) = &mut *plan;
            if *successes > 0 {
                *successes -= 1;
            } else if *failures > 0 {
                *failures -= 1;
                return Err(ControllerError::Kube(kube::Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: "the server is currently unable to handle the request".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                })));
            }
        }

        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stored = MetalNodeStatus::default();
        if let Some(node) = nodes.get_mut(key) {
            let status = node.status.get_or_insert_with(MetalNodeStatus::default);
            status.apply(patch);
            stored = status.clone();
        } else {
            stored.apply(patch);
        }
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).push(stored);
        Ok(())
    }
}

/// Bootstrap secrets keyed by `namespace/name`.
#[derive(Clone, Default)]
pub struct StaticBootstrapSource {
    secrets: Arc<Mutex<HashMap<String, BootstrapData>>>,
}

impl StaticBootstrapSource {
    pub fn insert(&self, secret_name: &str, value: &str, format: &str) {
        self.secrets.lock().unwrap_or_else(PoisonError::into_inner).insert(
            format!("{TEST_NAMESPACE}/{secret_name}"),
            BootstrapData {
                value: value.as_bytes().to_vec(),
                format: format.as_bytes().to_vec(),
            },
        );
    }
}

#[async_trait]
impl BootstrapDataSource for StaticBootstrapSource {
    async fn get_bootstrap_data(&self, namespace: &str, secret_name: &str) -> Result<BootstrapData, ControllerError> {
        let id = format!("{namespace}/{secret_name}");
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| ControllerError::BootstrapData(format!("secret {id} not found")))
    }
}

/// Handles on the collaborators of a test reconciler.
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub store: InMemoryNodeStore,
    pub executor: MockRemoteExecutor,
    pub secrets: StaticBootstrapSource,
}

pub fn create_test_harness(nodes: Vec<MetalNode>) -> TestHarness {
    let store = InMemoryNodeStore::default();
    for node in nodes {
        store.insert(node);
    }
    let executor = MockRemoteExecutor::new();
    let secrets = StaticBootstrapSource::default();
    let reconciler = Reconciler::new(
        store.clone(),
        executor.clone(),
        secrets.clone(),
        "script/init_k8s_env.sh",
    );

    TestHarness {
        reconciler,
        store,
        executor,
        secrets,
    }
}
