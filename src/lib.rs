//! registry-cache-webhook library crate
//!
//! Admission-time validation for `RegistryCacheConfig` resources, plus the
//! servers that expose it to the Kubernetes API server.

pub mod config;
pub mod crd;
pub mod error;
pub mod health;
pub mod webhooks;

pub use config::WebhookConfig;
pub use error::{Error, Result};
pub use health::HealthState;
pub use webhooks::{Validator, WebhookState, run_webhook_server};
