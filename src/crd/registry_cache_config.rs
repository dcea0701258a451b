//! RegistryCacheConfig Custom Resource Definition.
//!
//! Each RegistryCacheConfig describes one upstream container registry that
//! the registry-cache extension mirrors for the cluster.

use std::sync::LazyLock;

use jiff::SignedDuration;
use kube::CustomResource;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// RegistryCacheConfig is the Schema for the registrycacheconfigs API.
///
/// Example:
/// ```yaml
/// apiVersion: core.kyma-project.io/v1beta1
/// kind: RegistryCacheConfig
/// metadata:
///   name: docker-hub
///   namespace: default
/// spec:
///   upstream: docker.io
///   remoteURL: https://registry-1.docker.io
///   volume:
///     size: 10Gi
///   garbageCollection:
///     ttl: 168h
///   secretReferenceName: docker-hub-credentials
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "core.kyma-project.io",
    version = "v1beta1",
    kind = "RegistryCacheConfig",
    plural = "registrycacheconfigs",
    status = "RegistryCacheConfigStatus",
    namespaced,
    printcolumn = r#"{"name":"Upstream", "type":"string", "jsonPath":".spec.upstream"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCacheConfigSpec {
    /// Upstream is the remote registry host to cache (`<host>[:<port>]`).
    #[serde(default)]
    pub upstream: String,

    /// RemoteURL is the remote registry URL. The format must be
    /// `<scheme><host>[:<port>]` where `<scheme>` is `https://` or `http://`.
    #[serde(rename = "remoteURL", default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Volume contains settings for the registry cache volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,

    /// GarbageCollection contains settings for the garbage collection of content from the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage_collection: Option<GarbageCollection>,

    /// Name of the Secret (same namespace) holding the upstream registry credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_reference_name: Option<String>,

    /// Proxy contains settings for a proxy used in the registry cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Proxy>,

    /// HTTP contains settings for the HTTP server that hosts the registry cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,
}

impl RegistryCacheConfigSpec {
    /// A spec with an empty upstream and no optional section set.
    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty()
            && self.remote_url.is_none()
            && self.volume.is_none()
            && self.garbage_collection.is_none()
            && self.secret_reference_name.is_none()
            && self.proxy.is_none()
            && self.http.is_none()
    }
}

/// Volume contains settings for the registry cache volume.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Size of the registry cache volume as a Kubernetes quantity (e.g. `10Gi`).
    /// This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Name of the StorageClass used by the registry cache volume.
    /// This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// GarbageCollection contains settings for the garbage collection of content from the cache.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GarbageCollection {
    /// Time to live of a blob in the cache (e.g. `168h`). `0s` disables garbage collection.
    #[serde(default = "default_ttl")]
    pub ttl: String,
}

impl Default for GarbageCollection {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

fn default_ttl() -> String {
    "168h".to_string()
}

/// Duration grammar accepted by the API server for `metav1.Duration` fields.
static DURATION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[-+]?((\d+(\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h))+$").ok()
});

impl GarbageCollection {
    /// Parsed TTL, or `None` when the value is not a valid duration.
    ///
    /// Only unit-suffixed durations (`168h`, `1h30m`, `-1ns`) and a bare `0`
    /// are accepted; ISO 8601 and spelled-out forms are rejected.
    pub fn ttl_duration(&self) -> Option<SignedDuration> {
        let ttl = self.ttl.as_str();
        if matches!(ttl, "0" | "+0" | "-0") {
            return Some(SignedDuration::ZERO);
        }
        if !DURATION_RE.as_ref().is_some_and(|re| re.is_match(ttl)) {
            return None;
        }
        ttl.parse::<SignedDuration>().ok()
    }

    /// Whether garbage collection is turned off (a zero TTL).
    pub fn is_disabled(&self) -> bool {
        self.ttl_duration().is_some_and(|ttl| ttl.is_zero())
    }
}

/// Proxy contains settings for a proxy used in the registry cache.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    /// Proxy server for HTTP connections.
    #[serde(rename = "httpProxy", default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,

    /// Proxy server for HTTPS connections.
    #[serde(rename = "httpsProxy", default, skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
}

/// HTTP contains settings for the HTTP server that hosts the registry cache.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Http {
    /// Whether TLS is enabled for the HTTP server of the registry cache.
    #[serde(default)]
    pub tls: bool,
}

/// Status of a RegistryCacheConfig.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCacheConfigStatus {
    /// Current state of the configuration.
    #[serde(default)]
    pub state: State,

    /// Conditions describing the current state.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// State of a RegistryCacheConfig.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum State {
    /// Waiting for validation or configuration.
    #[default]
    Pending,
    /// Configuration has been applied.
    Ready,
    /// Validation or configuration failed.
    Error,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Pending => write!(f, "Pending"),
            State::Ready => write!(f, "Ready"),
            State::Error => write!(f, "Error"),
        }
    }
}

/// Condition describes the state of a configuration at a certain point.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition.
    pub r#type: String,
    /// Status of the condition ("True", "False", "Unknown").
    pub status: String,
    /// Machine-readable reason for the condition's last transition.
    pub reason: String,
    /// Human-readable message indicating details about last transition.
    #[serde(default)]
    pub message: String,
    /// Last time the condition transitioned from one status to another.
    pub last_transition_time: String,
    /// The generation of the resource this condition was observed for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
