//! DNS resolvability checks.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::DNS_LOOKUP_TIMEOUT;

/// Capability answering whether a hostname resolves to at least one address.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn is_resolvable(&self, host: &str) -> bool;
}

/// Resolver using the system's name resolution, bounded by a per-lookup timeout.
///
/// Timeouts and lookup errors both count as "not resolvable"; they are only
/// told apart in the logs.
#[derive(Clone, Debug)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(DNS_LOOKUP_TIMEOUT)
    }
}

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn is_resolvable(&self, host: &str) -> bool {
        let host = host.trim();
        if host.is_empty() {
            return false;
        }

        match tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!(host = %host, error = %e, "DNS lookup failed");
                false
            }
            Err(_) => {
                warn!(host = %host, timeout = ?self.timeout, "DNS lookup timed out");
                false
            }
        }
    }
}
