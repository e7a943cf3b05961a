//! MetalNode CRD
//!
//! Describes a bare-metal or unmanaged virtual host reachable over SSH that
//! the controller prepares for, and then joins to, a Kubernetes cluster.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Desired state of a MetalNode: how to reach the host and how to prepare it.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.microscaler.io",
    version = "v1beta1",
    kind = "MetalNode",
    namespaced,
    status = "MetalNodeStatus",
    shortname = "mn",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Role","type":"string","jsonPath":".status.role"}"#,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".status.refCluster"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MetalNodeSpec {
    /// Name of the metal node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// SSH endpoint of the node
    pub node_endpoint: Endpoint,

    /// Commands replacing the default initialization batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialization_cmd: Option<Vec<String>>,
}

/// SSH endpoint of a node
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// SSH host, an IPv4 or IPv6 literal
    pub host: String,

    /// SSH credentials
    pub ssh_auth: SshAuth,
}

impl Endpoint {
    /// Checks that a non-empty host is an IP literal.
    ///
    /// Hostnames are rejected: the address doubles as the node's hostname
    /// and as the key of per-host command output.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Ok(());
        }
        self.host
            .parse::<IpAddr>()
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidEndpointHost(self.host.clone()))
    }
}

/// SSH login settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SshAuth {
    /// SSH login user
    pub user: String,

    /// SSH password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// PEM encoded private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_ssh_port() -> u16 {
    22
}

/// Observed state of a MetalNode.
///
/// `role`, `refCluster` and `dataSecretName` belong to whoever assigns the
/// node to a cluster; the remaining fields belong to the lifecycle
/// controller and are written through [`LifecyclePatch`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetalNodeStatus {
    /// Initialization phase
    #[serde(default)]
    pub phase: NodePhase,

    /// Output of failed initialization commands.
    ///
    /// Best-effort diagnostics: not necessarily the real cause of a failure.
    #[serde(default)]
    pub initialization_failure_reason: Vec<String>,

    /// Output of failed verification commands (docker, kubelet, kubeadm)
    #[serde(default)]
    pub check_failure_reason: Vec<String>,

    /// Output of failed bootstrap commands
    #[serde(default)]
    pub bootstrap_failure_reason: Vec<String>,

    /// Roles of this node, such as master, worker, etcd
    #[serde(default)]
    pub role: Vec<String>,

    /// Name of the cluster this node belongs to
    #[serde(default)]
    pub ref_cluster: String,

    /// Name of the secret holding the bootstrap data
    #[serde(default)]
    pub data_secret_name: String,

    /// Whether the bootstrap data has been applied and verified
    #[serde(default)]
    pub bootstrapped: bool,

    /// Whether the node is ready to init or join a cluster
    #[serde(default)]
    pub ready: bool,

    /// Time of the last phase change
    #[serde(default)]
    pub last_phase_transition_time: Option<DateTime<Utc>>,
}

impl MetalNodeStatus {
    /// Moves to `phase`, stamping the transition time only on an actual change.
    pub fn transition(&mut self, phase: NodePhase) {
        if self.phase != phase {
            self.phase = phase;
            self.last_phase_transition_time = Some(Utc::now());
        }
    }

    /// True when a bootstrap secret is assigned and not yet applied.
    pub fn bootstrap_pending(&self) -> bool {
        !self.data_secret_name.is_empty() && !self.bootstrapped
    }

    /// Lifecycle fields of this status, as computed from `base`.
    ///
    /// `bootstrapped` is carried only when it differs from `base`.
    pub fn lifecycle_patch(&self, base: &MetalNodeStatus) -> LifecyclePatch {
        LifecyclePatch {
            phase: self.phase,
            initialization_failure_reason: self.initialization_failure_reason.clone(),
            check_failure_reason: self.check_failure_reason.clone(),
            bootstrap_failure_reason: self.bootstrap_failure_reason.clone(),
            ready: self.ready,
            last_phase_transition_time: self.last_phase_transition_time,
            bootstrapped: (self.bootstrapped != base.bootstrapped).then_some(self.bootstrapped),
        }
    }

    /// Applies `patch` the way a merge patch of it would.
    pub fn apply(&mut self, patch: &LifecyclePatch) {
        self.phase = patch.phase;
        self.initialization_failure_reason = patch.initialization_failure_reason.clone();
        self.check_failure_reason = patch.check_failure_reason.clone();
        self.bootstrap_failure_reason = patch.bootstrap_failure_reason.clone();
        self.ready = patch.ready;
        self.last_phase_transition_time = patch.last_phase_transition_time;
        if let Some(bootstrapped) = patch.bootstrapped {
            self.bootstrapped = bootstrapped;
        }
    }
}

/// Status fields owned by the lifecycle controller.
///
/// Sent as a merge patch, so cluster assignment made concurrently by another
/// writer is left alone.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LifecyclePatch {
    /// Initialization phase
    pub phase: NodePhase,
    /// Output of failed initialization commands
    pub initialization_failure_reason: Vec<String>,
    /// Output of failed verification commands
    pub check_failure_reason: Vec<String>,
    /// Output of failed bootstrap commands
    pub bootstrap_failure_reason: Vec<String>,
    /// Readiness to init or join a cluster
    pub ready: bool,
    /// Time of the last phase change
    pub last_phase_transition_time: Option<DateTime<Utc>>,
    /// Only set when the pass changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrapped: Option<bool>,
}

/// Initialization phase of a MetalNode
///
/// Serializes as PascalCase ("Initializing", "Fail", ...) with the unset
/// phase as an empty string. Upper-case spellings are accepted on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum NodePhase {
    /// Not observed yet
    #[default]
    #[serde(rename = "")]
    Unset,

    /// Initialization commands are running
    #[serde(alias = "INITIALIZING")]
    Initializing,

    /// Verification commands are running
    #[serde(alias = "CHECKING")]
    Checking,

    /// Prerequisites are installed and verified
    #[serde(alias = "SUCCESS")]
    Success,

    /// Verification failed
    #[serde(alias = "FAIL")]
    Fail,
}

impl NodePhase {
    /// Wire spelling, empty for `Unset`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodePhase::Unset => "",
            NodePhase::Initializing => "Initializing",
            NodePhase::Checking => "Checking",
            NodePhase::Success => "Success",
            NodePhase::Fail => "Fail",
        }
    }

    /// Phases marking work in flight for the node.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, NodePhase::Initializing | NodePhase::Checking)
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePhase::Unset => f.write_str("Unset"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl MetalNode {
    /// The endpoint address.
    pub fn host(&self) -> &str {
        &self.spec.node_endpoint.host
    }

    /// Appends a role. Duplicates are kept.
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.status
            .get_or_insert_with(MetalNodeStatus::default)
            .role
            .push(role.into());
    }

    /// Exact role membership.
    pub fn has_role(&self, role: &str) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.role.iter().any(|r| r == role))
    }

    /// Substring match over the comma-joined role list.
    pub fn contains_role(&self, role: &str) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| !s.role.is_empty() && s.role.join(",").contains(role))
    }

    /// Cluster reference, empty when unassigned.
    pub fn ref_cluster(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.ref_cluster.as_str())
    }

    /// Readiness flag from the status.
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.ready)
    }

    /// Releases the node from its cluster.
    ///
    /// Clears role, cluster reference, bootstrap secret and the bootstrapped
    /// flag. Phase and readiness are kept, so a released node can be handed
    /// to another cluster without reinstalling prerequisites.
    pub fn reset(&mut self) {
        if let Some(status) = self.status.as_mut() {
            status.role.clear();
            status.ref_cluster.clear();
            status.data_secret_name.clear();
            status.bootstrapped = false;
        }
    }
}
