// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for registry-cache-webhook.
//!
//! Uses proptest to generate random inputs and verify invariants.

#[path = "../common/mod.rs"]
mod common;

use proptest::prelude::*;

use registry_cache_webhook::crd::{Quantity, RegistryCacheConfig};
use registry_cache_webhook::webhooks::{
    ClusterSnapshot, FieldErrorKind, FieldErrorList, FieldPath, Validator,
};

use common::fixtures::{MockResolver, RegistryCacheConfigBuilder, SecretBuilder, valid_secret};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Strategy for DNS-1123 hosts like `docker.io` or `a-1.b.example`.
///
/// Labels start with a letter so no host reads as an IPv4 address.
fn host() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]([a-z0-9-]{0,8}[a-z0-9])?", 1..4).prop_map(|l| l.join("."))
}

/// Strategy for upstreams, with an optional port.
fn upstream() -> impl Strategy<Value = String> {
    (host(), prop::option::of(1u32..=65535)).prop_map(|(h, port)| match port {
        Some(p) => format!("{}:{}", h, p),
        None => h,
    })
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}"
}

fn namespace() -> impl Strategy<Value = String> {
    prop_oneof![Just("default".to_string()), Just("team-a".to_string()), name()]
}

/// Strategy for configs that pass every rule when DNS resolves.
fn valid_config() -> impl Strategy<Value = RegistryCacheConfig> {
    (
        name(),
        namespace(),
        upstream(),
        prop::option::of(host()),
        prop::option::of(1u32..500),
        prop::option::of(prop_oneof![Just("0s"), Just("1h"), Just("168h"), Just("30m")]),
        any::<bool>(),
    )
        .prop_map(|(name, ns, upstream, remote, size_gi, ttl, tls)| {
            let mut builder = RegistryCacheConfigBuilder::new(name)
                .namespace(ns)
                .upstream(upstream);
            if let Some(remote) = remote {
                builder = builder.remote_url(format!("https://{}", remote));
            }
            if let Some(size) = size_gi {
                builder = builder.volume_size(format!("{}Gi", size));
            }
            if let Some(ttl) = ttl {
                builder = builder.gc_ttl(ttl);
            }
            builder.http_tls(tls).build()
        })
}

fn sorted(errors: &FieldErrorList) -> Vec<String> {
    let mut errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
    errors.sort();
    errors
}

proptest! {
    /// An empty spec yields exactly one Required error on `spec`, whatever the cluster holds.
    #[test]
    fn empty_spec_is_single_required_error(
        cfg_name in name(),
        cfg_ns in namespace(),
        others in prop::collection::vec((name(), namespace()), 0..5),
    ) {
        let cluster = others.into_iter().fold(ClusterSnapshot::new(), |c, (n, ns)| {
            c.with_config(RegistryCacheConfigBuilder::new(n).namespace(ns).build())
        });
        let dns = MockResolver::with_hosts(&[]);
        let cfg = RegistryCacheConfigBuilder::new(cfg_name).namespace(cfg_ns).build();

        let errors = block_on(Validator::new(&cluster, Some(&dns)).validate_create(&cfg));
        prop_assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        prop_assert_eq!(err.kind, FieldErrorKind::Required);
        prop_assert_eq!(err.path.to_string(), "spec");
        prop_assert!(dns.lookups().is_empty());
    }

    /// Distinct objects with the same upstream collide.
    #[test]
    fn equal_upstreams_are_duplicates(
        shared in upstream(),
        (a, a_ns) in (name(), namespace()),
        (b, b_ns) in (name(), namespace()),
    ) {
        prop_assume!(a != b || a_ns != b_ns);

        let first = RegistryCacheConfigBuilder::new(a).namespace(a_ns).upstream(shared.clone()).build();
        let second = RegistryCacheConfigBuilder::new(b).namespace(b_ns).upstream(shared.clone()).build();
        let cluster = ClusterSnapshot::new().with_config(first);

        let errors = block_on(Validator::new(&cluster, None).validate_create(&second));
        let duplicates: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == FieldErrorKind::Duplicate)
            .collect();
        prop_assert_eq!(duplicates.len(), 1);
        prop_assert_eq!(duplicates[0].path.to_string(), "spec.upstream");
        prop_assert_eq!(&duplicates[0].value, &serde_json::json!(shared));
    }

    /// A missing secret yields exactly one Invalid error on `spec.secretReferenceName`.
    #[test]
    fn missing_secret_is_single_error(cfg in valid_config(), secret_name in name()) {
        let mut cfg = cfg;
        cfg.spec.secret_reference_name = Some(secret_name.clone());
        // A secret of the same name in another namespace does not count
        let elsewhere = SecretBuilder::new(secret_name).namespace("other_ns").immutable(true).build();
        let cluster = ClusterSnapshot::new().with_secret(&elsewhere);
        let dns = MockResolver::all_ok();

        let errors = block_on(Validator::new(&cluster, Some(&dns)).validate_create(&cfg));
        prop_assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        prop_assert_eq!(err.kind, FieldErrorKind::Invalid);
        prop_assert_eq!(err.path.to_string(), "spec.secretReferenceName");
        prop_assert!(err.detail.contains("does not exist"));
    }

    /// Generated configs pass, and the result does not change between calls.
    #[test]
    fn validate_create_is_idempotent(cfg in valid_config()) {
        let cluster = ClusterSnapshot::new().with_secret(&valid_secret());
        let dns = MockResolver::all_ok();
        let validator = Validator::new(&cluster, Some(&dns));

        let first = block_on(validator.validate_create(&cfg));
        let second = block_on(validator.validate_create(&cfg));
        prop_assert!(first.is_empty(), "{}", first.aggregate());
        prop_assert_eq!(sorted(&first), sorted(&second));
    }

    /// A config that is valid on create is valid as an update of itself.
    #[test]
    fn unchanged_update_is_accepted(cfg in valid_config()) {
        let cluster = ClusterSnapshot::new().with_config(cfg.clone());
        let dns = MockResolver::all_ok();
        let validator = Validator::new(&cluster, Some(&dns));

        prop_assume!(block_on(validator.validate_create(&cfg)).is_empty());
        let errors = block_on(validator.validate_update(&cfg, &cfg));
        prop_assert!(errors.is_empty(), "{}", errors.aggregate());
    }

    /// Out-of-range ports are always reported on `spec.upstream`.
    #[test]
    fn out_of_range_port_is_invalid(bare_host in host(), port in 65536u32..1_000_000) {
        let cfg = RegistryCacheConfigBuilder::new("cfg")
            .upstream(format!("{}:{}", bare_host, port))
            .build();
        let cluster = ClusterSnapshot::new();

        let errors = block_on(Validator::new(&cluster, None).validate_create(&cfg));
        prop_assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        prop_assert_eq!(err.path.to_string(), "spec.upstream");
        prop_assert!(err.detail.contains("[1, 65535]"));
    }

    /// Quantities with binary suffixes compare by magnitude.
    #[test]
    fn quantity_suffixes_agree(n in 1u32..4096) {
        let gi = Quantity::parse(&format!("{}Gi", n)).unwrap();
        let mi = Quantity::parse(&format!("{}Mi", u64::from(n) * 1024)).unwrap();
        prop_assert_eq!(gi, mi);
        prop_assert!(gi.is_positive());
    }

    /// Paths render dot-separated with bracketed indexes.
    #[test]
    fn field_path_rendering(fields in prop::collection::vec("[a-zA-Z]{1,8}", 1..5), index in 0usize..10) {
        let mut path = FieldPath::new("spec");
        for field in &fields {
            path = path.child(field);
        }
        let rendered = path.index(index).to_string();
        prop_assert_eq!(rendered, format!("spec.{}[{}]", fields.join("."), index));
    }
}
