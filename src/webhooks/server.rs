//! Admission webhook server.
//!
//! Serves the RegistryCacheConfig validating webhook over TLS. The API server
//! reaches it through a ValidatingWebhookConfiguration pointing at
//! [`VALIDATE_PATH`]; certificates are mounted from a secret.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{debug, error, info, warn};

use crate::config::WebhookConfig;
use crate::crd::RegistryCacheConfig;
use crate::error::{Error, Result};
use crate::health::{AdmissionResult, HealthState};
use crate::webhooks::cluster::ClusterReader;
use crate::webhooks::field::FieldErrorList;
use crate::webhooks::policies::Validator;
use crate::webhooks::resolver::DnsResolver;

/// Path the validating webhook is registered under
pub const VALIDATE_PATH: &str = "/validate-core-kyma-project-io-v1beta1-registrycacheconfig";

/// Reason prefixed to every denial message
const DENIAL_REASON: &str = "Invalid";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub cluster: Arc<dyn ClusterReader>,
    pub dns: Option<Arc<dyn DnsResolver>>,
    pub health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(cluster: Arc<dyn ClusterReader>, dns: Option<Arc<dyn DnsResolver>>) -> Self {
        Self {
            cluster,
            dns,
            health: None,
        }
    }

    pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
        self.health = Some(health);
        self
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(self.cluster.as_ref(), self.dns.as_deref())
    }

    fn record(&self, operation: &Operation, result: AdmissionResult, started: Instant) {
        if let Some(health) = &self.health {
            health.metrics.record_admission(
                operation_label(operation),
                result,
                started.elapsed().as_secs_f64(),
            );
        }
    }

    fn record_errors(&self, errors: &FieldErrorList) {
        if let Some(health) = &self.health {
            for err in errors {
                health.metrics.record_field_error(err.kind);
            }
        }
    }
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason(
    request: &AdmissionRequest<RegistryCacheConfig>,
    message: &str,
    reason: &str,
) -> AdmissionResponse {
    AdmissionResponse::from(request).deny(format!("[{}] {}", reason, message))
}

/// Message for a rejected object: `RegistryCacheConfig "<name>" is invalid: [...]`
pub fn denial_message(name: &str, errors: &FieldErrorList) -> String {
    format!(
        "RegistryCacheConfig \"{}\" is invalid: {}",
        name,
        errors.aggregate()
    )
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATE_PATH, post(validate_registry_cache_config))
        .with_state(state)
}

/// Validate a RegistryCacheConfig admission webhook handler
async fn validate_registry_cache_config(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<RegistryCacheConfig>>,
) -> impl IntoResponse {
    let request: AdmissionRequest<RegistryCacheConfig> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e))
                        .into_review(),
                ),
            );
        }
    };

    let response = review_request(&state, &request).await;
    (StatusCode::OK, Json(response.into_review()))
}

/// Decide a single admission request.
pub async fn review_request(
    state: &WebhookState,
    request: &AdmissionRequest<RegistryCacheConfig>,
) -> AdmissionResponse {
    let started = Instant::now();
    let uid = &request.uid;
    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing admission request"
    );

    // Only CREATE and UPDATE are validated
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        info!(uid = %uid, operation = ?request.operation, "Admission request allowed");
        state.record(&request.operation, AdmissionResult::Allowed, started);
        return AdmissionResponse::from(request);
    }

    let mut resource = match &request.object {
        Some(obj) => obj.clone(),
        None => {
            error!(uid = %uid, "Missing object in request");
            state.record(&request.operation, AdmissionResult::Invalid, started);
            return deny_with_reason(request, "Missing object in request", "InvalidRequest");
        }
    };
    // Objects submitted without a namespace inherit the request's
    if resource.metadata.namespace.is_none() {
        resource.metadata.namespace = request.namespace.clone();
    }

    let validator = state.validator();
    let errors = match (&request.operation, &request.old_object) {
        (Operation::Update, Some(old)) => validator.validate_update(&resource, old).await,
        (Operation::Update, None) => {
            error!(uid = %uid, "Missing old object in UPDATE request");
            state.record(&request.operation, AdmissionResult::Invalid, started);
            return deny_with_reason(request, "Missing old object in request", "InvalidRequest");
        }
        _ => validator.validate_create(&resource).await,
    };

    if errors.is_empty() {
        info!(uid = %uid, name = %request.name, "Admission request allowed");
        state.record(&request.operation, AdmissionResult::Allowed, started);
        return AdmissionResponse::from(request);
    }

    let name = resource
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| request.name.clone());
    let message = denial_message(&name, &errors);
    warn!(
        uid = %uid,
        name = %name,
        errors = errors.len(),
        message = %message,
        "Admission request denied"
    );
    state.record_errors(&errors);
    state.record(&request.operation, AdmissionResult::Denied, started);
    deny_with_reason(request, &message, DENIAL_REASON)
}

/// Run the webhook server with TLS
///
/// Binds to `0.0.0.0:<webhook_port>` with the certificate and key from `config`.
/// Marks the health state ready once the TLS material is loaded.
pub async fn run_webhook_server(state: Arc<WebhookState>, config: &WebhookConfig) -> Result<()> {
    let tls = RustlsConfig::from_pem_file(
        PathBuf::from(&config.cert_path),
        PathBuf::from(&config.key_path),
    )
    .await
    .map_err(|e| Error::Tls(e.to_string()))?;

    if let Some(health) = &state.health {
        health.set_ready(true).await;
    }

    let app = create_webhook_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    info!(port = config.webhook_port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
