//! Upstream credentials secret reference.

use tracing::warn;

use super::registry_rules::validate_upstream_secret;
use super::{ValidationContext, spec_path};
use crate::webhooks::field::{FieldError, FieldErrorList, FieldPath};

/// Namespace used when the resource carries none.
const DEFAULT_NAMESPACE: &str = "default";

/// Check the referenced secret exists in the resource's namespace and has the expected shape.
pub async fn validate(ctx: &ValidationContext<'_>) -> FieldErrorList {
    let Some(name) = ctx.resource.spec.secret_reference_name.as_deref() else {
        return FieldErrorList::new();
    };
    let path = spec_path().child("secretReferenceName");
    let namespace = ctx.namespace().unwrap_or(DEFAULT_NAMESPACE);

    match ctx.cluster.get_secret(namespace, name).await {
        Ok(Some(secret)) => validate_upstream_secret(&secret, &path, name),
        Ok(None) => missing(path, name),
        Err(e) if e.is_not_found() => missing(path, name),
        Err(e) => {
            warn!(namespace = %namespace, secret = %name, error = %e, "Failed to get referenced secret");
            FieldError::internal(path, format!("failed to get referenced secret {}: {}", name, e))
                .into()
        }
    }
}

fn missing(path: FieldPath, name: &str) -> FieldErrorList {
    FieldError::invalid(path, name, format!("secret {} does not exist", name)).into()
}
