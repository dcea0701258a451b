//! Validation policies for RegistryCacheConfig admission.
//!
//! Policies run in a fixed order and accumulate their errors:
//! - Guard: an empty spec is rejected on its own, nothing else runs
//! - Create and update: registry rules, uniqueness, DNS, secret reference
//! - Update only: immutable volume fields and the garbage collection transition

pub mod dns;
pub mod immutability;
pub mod registry_rules;
pub mod secret_reference;
pub mod uniqueness;

use crate::crd::RegistryCacheConfig;
use crate::webhooks::cluster::ClusterReader;
use crate::webhooks::field::{FieldError, FieldErrorList, FieldPath};
use crate::webhooks::resolver::DnsResolver;

/// Context for validation
pub struct ValidationContext<'a> {
    /// The resource being validated
    pub resource: &'a RegistryCacheConfig,
    /// The old resource (for UPDATE operations)
    pub old_resource: Option<&'a RegistryCacheConfig>,
    /// Existing configurations and secrets
    pub cluster: &'a dyn ClusterReader,
    /// DNS checks are skipped when absent
    pub dns: Option<&'a dyn DnsResolver>,
}

impl<'a> ValidationContext<'a> {
    /// Check if this is an UPDATE operation
    pub fn is_update(&self) -> bool {
        self.old_resource.is_some()
    }

    /// Namespace of the resource being validated
    pub fn namespace(&self) -> Option<&'a str> {
        self.resource.metadata.namespace.as_deref()
    }
}

/// Root of every field path reported for a RegistryCacheConfig.
pub(crate) fn spec_path() -> FieldPath {
    FieldPath::new("spec")
}

/// Run all validation policies
pub async fn validate_all(ctx: &ValidationContext<'_>) -> FieldErrorList {
    if ctx.resource.spec.is_empty() {
        return FieldError::required(spec_path(), "spec must not be empty").into();
    }

    let mut errors = registry_rules::validate(ctx);
    errors.extend(uniqueness::validate(ctx).await);
    errors.extend(dns::validate(ctx).await);
    errors.extend(secret_reference::validate(ctx).await);

    if ctx.is_update() {
        errors.extend(immutability::validate(ctx));
    }

    errors
}

/// Validates RegistryCacheConfig objects against the cluster they are submitted to.
///
/// Holds only borrowed capabilities; build one per admission request.
pub struct Validator<'a> {
    cluster: &'a dyn ClusterReader,
    dns: Option<&'a dyn DnsResolver>,
}

impl<'a> Validator<'a> {
    pub fn new(cluster: &'a dyn ClusterReader, dns: Option<&'a dyn DnsResolver>) -> Self {
        Self { cluster, dns }
    }

    /// Validate a configuration being created. An empty list means accept.
    pub async fn validate_create(&self, candidate: &RegistryCacheConfig) -> FieldErrorList {
        let ctx = ValidationContext {
            resource: candidate,
            old_resource: None,
            cluster: self.cluster,
            dns: self.dns,
        };
        validate_all(&ctx).await
    }

    /// Validate a change from `previous` to `candidate`. An empty list means accept.
    pub async fn validate_update(
        &self,
        candidate: &RegistryCacheConfig,
        previous: &RegistryCacheConfig,
    ) -> FieldErrorList {
        let ctx = ValidationContext {
            resource: candidate,
            old_resource: Some(previous),
            cluster: self.cluster,
            dns: self.dns,
        };
        validate_all(&ctx).await
    }
}
