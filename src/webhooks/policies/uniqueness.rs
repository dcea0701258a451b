//! Upstream uniqueness across the cluster.

use tracing::{debug, warn};

use super::{ValidationContext, spec_path};
use crate::crd::RegistryCacheConfig;
use crate::webhooks::field::{FieldError, FieldErrorList};

/// Reject an upstream already claimed by another configuration in any namespace.
///
/// Only the first collision is reported.
pub async fn validate(ctx: &ValidationContext<'_>) -> FieldErrorList {
    let upstream = &ctx.resource.spec.upstream;
    if upstream.is_empty() {
        return FieldErrorList::new();
    }

    let path = spec_path().child("upstream");
    let existing = match ctx.cluster.list_configs().await {
        Ok(configs) => configs,
        Err(e) => {
            warn!(error = %e, "Failed to list registry cache configs");
            return FieldError::internal(
                path,
                format!("failed to list existing registry cache configs: {}", e),
            )
            .into();
        }
    };

    let collision = existing
        .iter()
        .filter(|other| !is_same_object(other, ctx.resource))
        .find(|other| other.spec.upstream == *upstream);

    match collision {
        Some(other) => {
            debug!(
                upstream = %upstream,
                existing = ?other.metadata.name,
                existing_namespace = ?other.metadata.namespace,
                "Upstream already configured"
            );
            FieldError::duplicate(path, upstream.as_str()).into()
        }
        None => FieldErrorList::new(),
    }
}

fn is_same_object(a: &RegistryCacheConfig, b: &RegistryCacheConfig) -> bool {
    a.metadata.name == b.metadata.name && a.metadata.namespace == b.metadata.namespace
}
