//! Multi-step scenarios spanning several admission decisions.

use registry_cache_webhook::webhooks::{ClusterSnapshot, FieldErrorKind, Validator};
use serde_json::json;

use crate::common::fixtures::{MockResolver, RegistryCacheConfigBuilder, SecretBuilder};
use crate::{Expected, assert_errors};

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a config, then walk it through a series of edits.
#[tokio::test]
async fn test_config_lifecycle() {
    let dns = MockResolver::all_ok();
    let secret = SecretBuilder::new("docker-creds")
        .immutable(true)
        .entry("username", "robot")
        .entry("password", "s3cret")
        .build();

    // Step 1: create with GC disabled and a fixed volume
    let v1 = RegistryCacheConfigBuilder::new("docker")
        .upstream("docker.io")
        .remote_url("https://registry-1.docker.io")
        .volume_size("10Gi")
        .storage_class_name("standard")
        .gc_ttl("0s")
        .build();
    let cluster = ClusterSnapshot::new().with_secret(&secret);
    let errors = Validator::new(&cluster, Some(&dns)).validate_create(&v1).await;
    assert_errors(&errors, &[]);

    // From here on the config is persisted
    let cluster = cluster.with_config(v1.clone());
    let validator = Validator::new(&cluster, Some(&dns));

    // Step 2: add credentials, everything else unchanged
    let v2 = RegistryCacheConfigBuilder::new("docker")
        .upstream("docker.io")
        .remote_url("https://registry-1.docker.io")
        .volume_size("10Gi")
        .storage_class_name("standard")
        .gc_ttl("0s")
        .secret_reference_name("docker-creds")
        .build();
    assert_errors(&validator.validate_update(&v2, &v1).await, &[]);

    // Step 3: try to grow the volume and turn GC on
    let v3 = RegistryCacheConfigBuilder::new("docker")
        .upstream("docker.io")
        .remote_url("https://registry-1.docker.io")
        .volume_size("20Gi")
        .storage_class_name("standard")
        .gc_ttl("24h")
        .secret_reference_name("docker-creds")
        .build();
    assert_errors(
        &validator.validate_update(&v3, &v2).await,
        &[
            Expected::invalid("spec.volume.size", "20Gi", "field is immutable"),
            Expected::invalid(
                "spec.garbageCollection.ttl",
                json!({"ttl": "24h"}),
                "garbage collection cannot be enabled",
            ),
        ],
    );

    // Step 4: same size written differently is not a change
    let v4 = RegistryCacheConfigBuilder::new("docker")
        .upstream("docker.io")
        .remote_url("https://registry-1.docker.io")
        .volume_size("10240Mi")
        .storage_class_name("standard")
        .gc_ttl("0s")
        .secret_reference_name("docker-creds")
        .build();
    assert_errors(&validator.validate_update(&v4, &v2).await, &[]);
}

/// A second config for an already cached upstream is rejected until the first is gone.
#[tokio::test]
async fn test_upstream_handover_between_namespaces() {
    let first = RegistryCacheConfigBuilder::new("quay")
        .namespace("team-a")
        .upstream("quay.io")
        .build();
    let second = RegistryCacheConfigBuilder::new("quay")
        .namespace("team-b")
        .upstream("quay.io")
        .build();

    let with_first = ClusterSnapshot::new().with_config(first);
    let errors = Validator::new(&with_first, None)
        .validate_create(&second)
        .await;
    assert_errors(&errors, &[Expected::duplicate("spec.upstream", "quay.io")]);

    let after_delete = ClusterSnapshot::new();
    let errors = Validator::new(&after_delete, None)
        .validate_create(&second)
        .await;
    assert_errors(&errors, &[]);
}

/// Re-enabling GC after disabling it is blocked, even across several updates.
#[tokio::test]
async fn test_gc_cannot_come_back() {
    let cluster = ClusterSnapshot::new();
    let validator = Validator::new(&cluster, None);

    let enabled = RegistryCacheConfigBuilder::new("ghcr")
        .upstream("ghcr.io")
        .gc_ttl("168h")
        .build();
    let disabled = RegistryCacheConfigBuilder::new("ghcr")
        .upstream("ghcr.io")
        .gc_ttl("0s")
        .build();
    let shorter = RegistryCacheConfigBuilder::new("ghcr")
        .upstream("ghcr.io")
        .gc_ttl("1h")
        .build();

    assert_errors(&validator.validate_update(&shorter, &enabled).await, &[]);
    assert_errors(&validator.validate_update(&disabled, &shorter).await, &[]);

    let errors = validator.validate_update(&enabled, &disabled).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.iter().next().unwrap().kind, FieldErrorKind::Invalid);
}

/// Only the hosts that fail to resolve are reported, ports stripped before lookup.
#[tokio::test]
async fn test_private_registry_dns() {
    let dns = MockResolver::with_hosts(&["registry.internal.example.com"]);
    let cluster = ClusterSnapshot::new();

    let cfg = RegistryCacheConfigBuilder::new("internal")
        .upstream("registry.internal.example.com:5000")
        .remote_url("https://mirror.internal.example.com:5000")
        .http_tls(false)
        .build();
    let errors = Validator::new(&cluster, Some(&dns)).validate_create(&cfg).await;
    assert_errors(
        &errors,
        &[Expected::invalid(
            "spec.remoteURL",
            "https://mirror.internal.example.com:5000",
            "remoteURL is not DNS resolvable",
        )],
    );
    assert_eq!(
        dns.lookups(),
        vec![
            "registry.internal.example.com",
            "mirror.internal.example.com"
        ]
    );
}
