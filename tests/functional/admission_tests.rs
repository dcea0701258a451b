//! AdmissionReview handling, from the wire format to the allow/deny decision.

use std::sync::Arc;

use registry_cache_webhook::HealthState;
use registry_cache_webhook::crd::RegistryCacheConfig;
use registry_cache_webhook::webhooks::{
    AdmissionRequest, AdmissionReview, ClusterSnapshot, WebhookState, review_request,
};
use serde_json::{Value, json};

use crate::common::fixtures::{MockResolver, RegistryCacheConfigBuilder, valid_secret};

fn review_json(operation: &str, object: Value, old_object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "b2f4c1de-1d53-4a36-9d3c-2f1c3f8f6a10",
            "kind": {"group": "core.kyma-project.io", "version": "v1beta1", "kind": "RegistryCacheConfig"},
            "resource": {"group": "core.kyma-project.io", "version": "v1beta1", "resource": "registrycacheconfigs"},
            "name": "docker",
            "namespace": "default",
            "operation": operation,
            "userInfo": {"username": "system:admin"},
            "object": object,
            "oldObject": old_object,
            "dryRun": false
        }
    })
}

fn config_json(spec: Value) -> Value {
    json!({
        "apiVersion": "core.kyma-project.io/v1beta1",
        "kind": "RegistryCacheConfig",
        "metadata": {"name": "docker"},
        "spec": spec
    })
}

fn parse(review: Value) -> AdmissionRequest<RegistryCacheConfig> {
    let review: AdmissionReview<RegistryCacheConfig> = serde_json::from_value(review).unwrap();
    review.try_into().unwrap()
}

fn state(cluster: ClusterSnapshot) -> WebhookState {
    WebhookState::new(Arc::new(cluster), Some(Arc::new(MockResolver::all_ok())))
}

#[tokio::test]
async fn test_create_allowed() {
    let req = parse(review_json(
        "CREATE",
        config_json(json!({
            "upstream": "docker.io",
            "remoteURL": "https://registry-1.docker.io",
            "volume": {"size": "10Gi", "storageClassName": "standard"},
            "garbageCollection": {"ttl": "168h"}
        })),
        Value::Null,
    ));

    let response = review_request(&state(ClusterSnapshot::new()), &req).await;
    assert!(response.allowed);
    assert_eq!(response.uid, "b2f4c1de-1d53-4a36-9d3c-2f1c3f8f6a10");
}

#[tokio::test]
async fn test_create_denied_with_all_errors() {
    let existing = RegistryCacheConfigBuilder::new("other")
        .namespace("team-a")
        .upstream("docker.io")
        .build();
    let req = parse(review_json(
        "CREATE",
        config_json(json!({
            "upstream": "docker.io",
            "remoteURL": "docker.io"
        })),
        Value::Null,
    ));

    let response = review_request(&state(ClusterSnapshot::new().with_config(existing)), &req).await;
    assert!(!response.allowed);
    assert_eq!(
        response.result.message,
        "[Invalid] RegistryCacheConfig \"docker\" is invalid: [\
         spec.remoteURL: Invalid value: \"docker.io\": url must start with 'http://' or 'https://', \
         spec.upstream: Duplicate value: \"docker.io\"]"
    );
}

#[tokio::test]
async fn test_namespace_taken_from_request() {
    // The secret lives in the request's namespace; the object omits it
    let secret = valid_secret();
    let req = parse(review_json(
        "CREATE",
        config_json(json!({
            "upstream": "docker.io",
            "secretReferenceName": "valid-secret"
        })),
        Value::Null,
    ));

    let response = review_request(&state(ClusterSnapshot::new().with_secret(&secret)), &req).await;
    assert!(response.allowed, "{}", response.result.message);
}

#[tokio::test]
async fn test_update_denied_on_gc_enabling() {
    let req = parse(review_json(
        "UPDATE",
        config_json(json!({"upstream": "docker.io", "garbageCollection": {"ttl": "1h"}})),
        config_json(json!({"upstream": "docker.io", "garbageCollection": {"ttl": "0s"}})),
    ));

    let response = review_request(&state(ClusterSnapshot::new()), &req).await;
    assert!(!response.allowed);
    assert!(response.result.message.contains("spec.garbageCollection.ttl"));
    assert!(
        response
            .result
            .message
            .contains("garbage collection cannot be enabled")
    );
}

#[tokio::test]
async fn test_update_without_old_object_denied() {
    let req = parse(review_json(
        "UPDATE",
        config_json(json!({"upstream": "docker.io"})),
        Value::Null,
    ));

    let response = review_request(&state(ClusterSnapshot::new()), &req).await;
    assert!(!response.allowed);
    assert!(response.result.message.starts_with("[InvalidRequest]"));
}

#[tokio::test]
async fn test_delete_allowed_even_if_invalid() {
    let req = parse(review_json(
        "DELETE",
        Value::Null,
        config_json(json!({"upstream": "docker.io:77777"})),
    ));

    let response = review_request(&state(ClusterSnapshot::new()), &req).await;
    assert!(response.allowed);
}

#[tokio::test]
async fn test_metrics_recorded() {
    let health = Arc::new(HealthState::new());
    let state = state(ClusterSnapshot::new()).with_health(health.clone());

    let allowed = parse(review_json(
        "CREATE",
        config_json(json!({"upstream": "docker.io"})),
        Value::Null,
    ));
    let denied = parse(review_json("CREATE", config_json(json!({})), Value::Null));

    assert!(review_request(&state, &allowed).await.allowed);
    assert!(!review_request(&state, &denied).await.allowed);

    let encoded = health.metrics.encode();
    assert!(encoded.contains(r#"registrycache_admission_requests_total{operation="CREATE",result="allowed"} 1"#));
    assert!(encoded.contains(r#"registrycache_admission_requests_total{operation="CREATE",result="denied"} 1"#));
    assert!(encoded.contains(r#"registrycache_validation_errors_total{kind="Required"} 1"#));
}

#[test]
fn test_malformed_review_is_rejected() {
    // A review without a request cannot be turned into an AdmissionRequest
    let review: AdmissionReview<RegistryCacheConfig> = serde_json::from_value(json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview"
    }))
    .unwrap();
    let request: Result<AdmissionRequest<RegistryCacheConfig>, _> = review.try_into();
    assert!(request.is_err());
}
