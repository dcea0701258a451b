//! DNS resolvability of the upstream and remote URL hosts.

use tracing::debug;
use url::{Host, ParseError, Url};

use super::{ValidationContext, spec_path};
use crate::webhooks::field::{FieldError, FieldErrorList};

/// Check that the upstream host and the remote URL host resolve.
///
/// Does nothing without a resolver.
pub async fn validate(ctx: &ValidationContext<'_>) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let Some(dns) = ctx.dns else {
        return errors;
    };
    let spec = &ctx.resource.spec;

    if !spec.upstream.is_empty() {
        let host = strip_port(&spec.upstream);
        if !dns.is_resolvable(host).await {
            debug!(host = %host, "Upstream is not resolvable");
            errors.push(FieldError::invalid(
                spec_path().child("upstream"),
                spec.upstream.as_str(),
                "upstream is not DNS resolvable",
            ));
        }
    }

    if let Some(remote_url) = &spec.remote_url {
        let path = spec_path().child("remoteURL");
        match url_host(remote_url) {
            Err(e) => errors.push(FieldError::invalid(
                path,
                remote_url.as_str(),
                format!("failed to parse remoteURL: {}", e),
            )),
            Ok(Some(host)) => {
                if !dns.is_resolvable(&host).await {
                    debug!(host = %host, "Remote URL host is not resolvable");
                    errors.push(FieldError::invalid(
                        path,
                        remote_url.as_str(),
                        "remoteURL is not DNS resolvable",
                    ));
                }
            }
            Ok(None) => {}
        }
    }

    errors
}

/// `registry.example.com:5000` -> `registry.example.com`
fn strip_port(upstream: &str) -> &str {
    upstream.rsplit_once(':').map_or(upstream, |(host, _)| host)
}

/// Host of an absolute URL. Scheme-less input has no host rather than being an error.
fn url_host(raw: &str) -> Result<Option<String>, ParseError> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(url.host().and_then(|host| match host {
        Host::Domain(domain) if domain.is_empty() => None,
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }))
}
