//! Bootstrap data lookup.

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

const VALUE_KEY: &str = "value";
const FORMAT_KEY: &str = "format";

/// Raw bootstrap document and its format tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapData {
    pub value: Vec<u8>,
    pub format: Vec<u8>,
}

#[async_trait]
pub trait BootstrapDataSource: Send + Sync {
    async fn get_bootstrap_data(&self, namespace: &str, secret_name: &str) -> Result<BootstrapData, ControllerError>;
}

/// Reads bootstrap data from a Secret with `value` and `format` keys, as
/// written by the cluster bootstrap provider.
#[derive(Clone)]
pub struct SecretBootstrapSource {
    client: Client,
}

impl SecretBootstrapSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BootstrapDataSource for SecretBootstrapSource {
    async fn get_bootstrap_data(&self, namespace: &str, secret_name: &str) -> Result<BootstrapData, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get(secret_name).await?;
        bootstrap_data_from_secret(&secret)
    }
}

/// Both keys must be present; either may be empty.
pub(crate) fn bootstrap_data_from_secret(secret: &Secret) -> Result<BootstrapData, ControllerError> {
    let data = secret.data.as_ref();
    let field = |key: &str| {
        data.and_then(|d| d.get(key))
            .map(|bytes| bytes.0.clone())
            .ok_or_else(|| ControllerError::BootstrapData(format!("secret {key} key is missing")))
    };

    Ok(BootstrapData {
        value: field(VALUE_KEY)?,
        format: field(FORMAT_KEY)?,
    })
}
