//! Validating admission webhook for RegistryCacheConfig.
//!
//! [`Validator`] holds the decision logic. It is fed by a [`ClusterReader`]
//! for existing configurations and secrets, and an optional [`DnsResolver`].
//! The server module hosts it behind the Kubernetes admission API.

pub mod cluster;
pub mod field;
pub mod policies;
pub mod resolver;
mod server;

pub use cluster::{ClusterReader, ClusterSnapshot, KubeClusterReader, SecretView};
pub use field::{FieldError, FieldErrorKind, FieldErrorList, FieldPath};
pub use policies::{ValidationContext, Validator};
pub use resolver::{DnsResolver, SystemResolver};
pub use server::{
    VALIDATE_PATH, WebhookState, create_webhook_router, denial_message, review_request,
    run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
