//! Immutability validation policy.
//!
//! Only enforced on UPDATE operations
//!
//! Validates:
//! - Volume size and storage class cannot be changed once set
//! - Garbage collection cannot be turned back on after being disabled

use serde_json::Value;

use super::{ValidationContext, spec_path};
use crate::crd::{GarbageCollection, Quantity, RegistryCacheConfigSpec};
use crate::webhooks::field::{FieldError, FieldErrorList};

const IMMUTABLE_FIELD: &str = "field is immutable";

/// Validate immutability constraints on UPDATE operations
pub fn validate(ctx: &ValidationContext<'_>) -> FieldErrorList {
    let Some(old) = ctx.old_resource else {
        return FieldErrorList::new(); // Not an UPDATE
    };

    let mut errors = validate_volume(&old.spec, &ctx.resource.spec);
    errors.extend(validate_garbage_collection(&old.spec, &ctx.resource.spec));
    errors
}

fn validate_volume(old: &RegistryCacheConfigSpec, new: &RegistryCacheConfigSpec) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let (Some(old_volume), Some(new_volume)) = (&old.volume, &new.volume) else {
        return errors;
    };
    let volume_path = spec_path().child("volume");

    if let (Some(old_size), Some(new_size)) = (&old_volume.size, &new_volume.size) {
        if !same_quantity(old_size, new_size) {
            errors.push(FieldError::invalid(
                volume_path.child("size"),
                new_size.as_str(),
                IMMUTABLE_FIELD,
            ));
        }
    }

    if let (Some(old_class), Some(new_class)) =
        (&old_volume.storage_class_name, &new_volume.storage_class_name)
    {
        if old_class != new_class {
            errors.push(FieldError::invalid(
                volume_path.child("storageClassName"),
                new_class.as_str(),
                IMMUTABLE_FIELD,
            ));
        }
    }

    errors
}

fn validate_garbage_collection(
    old: &RegistryCacheConfigSpec,
    new: &RegistryCacheConfigSpec,
) -> FieldErrorList {
    let was_disabled = old
        .garbage_collection
        .as_ref()
        .is_none_or(GarbageCollection::is_disabled);

    match &new.garbage_collection {
        Some(gc) if was_disabled && is_enabled(gc) => FieldError::invalid(
            spec_path().child("garbageCollection").child("ttl"),
            serde_json::to_value(gc).unwrap_or(Value::Null),
            "garbage collection cannot be enabled",
        )
        .into(),
        _ => FieldErrorList::new(),
    }
}

fn is_enabled(gc: &GarbageCollection) -> bool {
    gc.ttl_duration().is_some_and(|ttl| !ttl.is_zero())
}

/// `10Gi` and `10240Mi` are the same size.
fn same_quantity(a: &str, b: &str) -> bool {
    match (Quantity::parse(a), Quantity::parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}
