//! Read-only access to the cluster state the validator consults.

use std::collections::BTreeSet;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::crd::RegistryCacheConfig;
use crate::error::Result;

/// Structural view of a Secret. Values are never read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretView {
    pub name: String,
    pub namespace: String,
    pub immutable: bool,
    pub keys: BTreeSet<String>,
}

impl From<&Secret> for SecretView {
    fn from(secret: &Secret) -> Self {
        Self {
            name: secret.name_any(),
            namespace: secret.namespace().unwrap_or_default(),
            immutable: secret.immutable.unwrap_or(false),
            keys: secret
                .data
                .as_ref()
                .map(|data| data.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Capability to enumerate configurations and fetch secrets.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Every RegistryCacheConfig in the cluster, across all namespaces.
    async fn list_configs(&self) -> Result<Vec<RegistryCacheConfig>>;

    /// The named secret, or `None` when it does not exist.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretView>>;
}

/// ClusterReader backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn list_configs(&self) -> Result<Vec<RegistryCacheConfig>> {
        let api: Api<RegistryCacheConfig> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed registry cache configs");
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretView>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(name).await?;
        Ok(secret.as_ref().map(SecretView::from))
    }
}

/// In-memory ClusterReader over a fixed set of objects.
#[derive(Clone, Debug, Default)]
pub struct ClusterSnapshot {
    configs: Vec<RegistryCacheConfig>,
    secrets: Vec<SecretView>,
}

impl ClusterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RegistryCacheConfig) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_secret(mut self, secret: &Secret) -> Self {
        self.secrets.push(SecretView::from(secret));
        self
    }
}

#[async_trait]
impl ClusterReader for ClusterSnapshot {
    async fn list_configs(&self) -> Result<Vec<RegistryCacheConfig>> {
        Ok(self.configs.clone())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretView>> {
        Ok(self
            .secrets
            .iter()
            .find(|s| s.namespace == namespace && s.name == name)
            .cloned())
    }
}
