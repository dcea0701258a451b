//! Registry cache rules.
//!
//! Structural checks on a single cache entry, independent of cluster state:
//! host and URL syntax, volume size, GC TTL and proxy URLs. Also the shape of
//! the upstream credentials secret.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::ValidationContext;
use crate::crd::{GarbageCollection, Http, Proxy, Quantity, RegistryCacheConfigSpec, Volume};
use crate::webhooks::cluster::SecretView;
use crate::webhooks::field::{FieldError, FieldErrorList, FieldPath};

const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const DNS1123_SUBDOMAIN_ERROR: &str = "a lowercase RFC 1123 subdomain must consist of lower case \
     alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character \
     (e.g. 'example.com')";
const UPSTREAM_FORMAT: &str = "; desired format: host[:port]";
const URL_FORMAT: &str = "; desired format: https://host[:port]";
const URL_SCHEME_ERROR: &str = "url must start with 'http://' or 'https://'";
const PORT_RANGE_ERROR: &str = "valid port must be in the range [1, 65535]";

static DNS1123_SUBDOMAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

/// A single cache entry, the unit the registry rules operate on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistryCache {
    pub upstream: String,
    pub remote_url: Option<String>,
    pub volume: Option<Volume>,
    pub garbage_collection: Option<GarbageCollection>,
    pub secret_reference_name: Option<String>,
    pub proxy: Option<Proxy>,
    pub http: Option<Http>,
}

impl From<&RegistryCacheConfigSpec> for RegistryCache {
    fn from(spec: &RegistryCacheConfigSpec) -> Self {
        Self {
            upstream: spec.upstream.clone(),
            remote_url: spec.remote_url.clone(),
            volume: spec.volume.clone(),
            garbage_collection: spec.garbage_collection.clone(),
            secret_reference_name: spec.secret_reference_name.clone(),
            proxy: spec.proxy.clone(),
            http: spec.http.clone(),
        }
    }
}

/// Run the rules against the candidate spec, rooted at `spec`.
pub fn validate(ctx: &ValidationContext<'_>) -> FieldErrorList {
    let cache = RegistryCache::from(&ctx.resource.spec);
    validate_registry_cache(&cache, &super::spec_path())
}

/// Validate a list of caches under `<path>.caches[i]`, flagging repeated upstreams.
pub fn validate_registry_config(caches: &[RegistryCache], path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let mut upstreams = HashSet::new();

    for (i, cache) in caches.iter().enumerate() {
        let cache_path = path.child("caches").index(i);
        errors.extend(validate_registry_cache(cache, &cache_path));

        if !upstreams.insert(cache.upstream.as_str()) {
            errors.push(FieldError::duplicate(
                cache_path.child("upstream"),
                cache.upstream.clone(),
            ));
        }
    }

    errors
}

/// Validate one cache entry with its fields directly under `path`.
pub fn validate_registry_cache(cache: &RegistryCache, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    // An empty upstream is handled by the empty-spec guard or left to the CRD schema
    if !cache.upstream.is_empty() {
        errors.extend(validate_upstream(&cache.upstream, &path.child("upstream")));
    }

    if let Some(remote_url) = &cache.remote_url {
        errors.extend(validate_remote_url(remote_url, &path.child("remoteURL")));
    }

    if let Some(volume) = &cache.volume {
        let volume_path = path.child("volume");
        if let Some(size) = &volume.size {
            errors.extend(validate_positive_quantity(size, &volume_path.child("size")));
        }
        if let Some(storage_class_name) = &volume.storage_class_name {
            errors.extend(validate_subdomain(
                storage_class_name,
                storage_class_name,
                &volume_path.child("storageClassName"),
                "",
            ));
        }
    }

    if let Some(gc) = &cache.garbage_collection {
        let ttl_path = path.child("garbageCollection").child("ttl");
        match gc.ttl_duration() {
            None => errors.push(FieldError::invalid(
                ttl_path,
                gc.ttl.clone(),
                "ttl must be a valid duration (e.g. '168h')",
            )),
            Some(ttl) if ttl.is_negative() => errors.push(FieldError::invalid(
                ttl_path,
                gc.ttl.clone(),
                "ttl must be a non-negative duration",
            )),
            Some(_) => {}
        }
    }

    if let Some(proxy) = &cache.proxy {
        let proxy_path = path.child("proxy");
        if let Some(http_proxy) = &proxy.http_proxy {
            errors.extend(validate_proxy_url(http_proxy, &proxy_path.child("httpProxy")));
        }
        if let Some(https_proxy) = &proxy.https_proxy {
            errors.extend(validate_proxy_url(https_proxy, &proxy_path.child("httpsProxy")));
        }
    }

    errors
}

/// Validate the structure of the secret holding upstream credentials.
///
/// All problems are reported together.
pub fn validate_upstream_secret(
    secret: &SecretView,
    path: &FieldPath,
    reference: &str,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let secret_ref = format!("{}/{}", secret.namespace, secret.name);

    if secret.keys.len() != 2 {
        errors.push(FieldError::invalid(
            path.clone(),
            reference,
            format!("referenced secret \"{}\" should have only two data entries", secret_ref),
        ));
    }

    for key in ["username", "password"] {
        if !secret.keys.contains(key) {
            errors.push(FieldError::invalid(
                path.clone(),
                reference,
                format!(
                    "missing \"{}\" data entry in referenced secret \"{}\"",
                    key, secret_ref
                ),
            ));
        }
    }

    if !secret.immutable {
        errors.push(FieldError::invalid(
            path.clone(),
            reference,
            format!("referenced secret \"{}\" should be immutable", secret_ref),
        ));
    }

    errors
}

fn validate_upstream(upstream: &str, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if has_http_scheme(upstream) {
        errors.push(FieldError::invalid(
            path.clone(),
            upstream,
            format!("upstream must not include a scheme{}", UPSTREAM_FORMAT),
        ));
        return errors;
    }

    let host = match upstream.rsplit_once(':') {
        Some((host, port)) => {
            if !is_valid_port(port) {
                errors.push(FieldError::invalid(path.clone(), upstream, PORT_RANGE_ERROR));
            }
            host
        }
        None => upstream,
    };

    errors.extend(validate_subdomain(host, upstream, path, UPSTREAM_FORMAT));
    errors
}

fn validate_remote_url(remote_url: &str, path: &FieldPath) -> FieldErrorList {
    if !has_http_scheme(remote_url) {
        return FieldError::invalid(path.clone(), remote_url, URL_SCHEME_ERROR).into();
    }

    let authority = authority(remote_url);
    let mut errors = FieldErrorList::new();
    let host = match split_port(authority) {
        Some((host, port)) => {
            if !is_valid_port(port) {
                errors.push(FieldError::invalid(path.clone(), remote_url, PORT_RANGE_ERROR));
            }
            host
        }
        None => authority,
    };

    errors.extend(validate_subdomain(host, remote_url, path, URL_FORMAT));
    errors
}

fn validate_proxy_url(proxy_url: &str, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if !has_http_scheme(proxy_url) {
        errors.push(FieldError::invalid(path.clone(), proxy_url, URL_SCHEME_ERROR));
    }

    let authority = authority(proxy_url);
    let host = split_port(authority).map_or(authority, |(host, _)| host);
    errors.extend(validate_subdomain(host, proxy_url, path, ""));
    errors
}

fn validate_positive_quantity(size: &str, path: &FieldPath) -> FieldErrorList {
    match Quantity::parse(size) {
        None => FieldError::invalid(
            path.clone(),
            size,
            "must be a valid quantity (e.g. '10Gi', '500Mi')",
        )
        .into(),
        Some(quantity) if !quantity.is_positive() => {
            FieldError::invalid(path.clone(), size, "must be greater than 0").into()
        }
        Some(_) => FieldErrorList::new(),
    }
}

/// Check `host` is a DNS-1123 subdomain, reporting `value` on failure.
fn validate_subdomain(host: &str, value: &str, path: &FieldPath, suffix: &str) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if host.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(FieldError::invalid(
            path.clone(),
            value,
            format!(
                "must be no more than {} characters{}",
                DNS1123_SUBDOMAIN_MAX_LENGTH, suffix
            ),
        ));
    }
    if !DNS1123_SUBDOMAIN_RE
        .as_ref()
        .is_some_and(|re| re.is_match(host))
    {
        errors.push(FieldError::invalid(
            path.clone(),
            value,
            format!("{}{}", DNS1123_SUBDOMAIN_ERROR, suffix),
        ));
    }

    errors
}

fn has_http_scheme(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// The `host[:port]` part of a URL, without scheme, userinfo or path.
fn authority(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or("");
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = rest.get(..end).unwrap_or(rest);
    authority.rsplit_once('@').map_or(authority, |(_, host)| host)
}

fn split_port(authority: &str) -> Option<(&str, &str)> {
    authority.rsplit_once(':')
}

fn is_valid_port(port: &str) -> bool {
    port.parse::<u32>().is_ok_and(|p| (1..=65535).contains(&p))
}
