//! Runtime configuration read from the environment.

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Default health server port
pub const HEALTH_PORT: u16 = 8080;
/// Default per-host DNS lookup timeout
pub const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for the webhook process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    /// PEM certificate served by the webhook
    pub cert_path: String,
    /// PEM private key for `cert_path`
    pub key_path: String,
    /// Port for the TLS admission endpoint
    pub webhook_port: u16,
    /// Port for probes and metrics
    pub health_port: u16,
    /// Upper bound for a single DNS lookup
    pub dns_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            cert_path: WEBHOOK_CERT_PATH.to_string(),
            key_path: WEBHOOK_KEY_PATH.to_string(),
            webhook_port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            dns_timeout: DNS_LOOKUP_TIMEOUT,
        }
    }
}

impl WebhookConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset variables fall back to the defaults; malformed values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cert_path = lookup("WEBHOOK_CERT_PATH").unwrap_or(defaults.cert_path);
        let key_path = lookup("WEBHOOK_KEY_PATH").unwrap_or(defaults.key_path);
        let webhook_port = parse_port(&lookup, "WEBHOOK_PORT", defaults.webhook_port)?;
        let health_port = parse_port(&lookup, "HEALTH_PORT", defaults.health_port)?;

        let dns_timeout = match lookup("DNS_LOOKUP_TIMEOUT_MS") {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!(
                        "DNS_LOOKUP_TIMEOUT_MS must be a number of milliseconds (got '{}')",
                        raw
                    ))
                })?;
                if millis == 0 {
                    warn!("DNS_LOOKUP_TIMEOUT_MS is 0, using default");
                    defaults.dns_timeout
                } else {
                    Duration::from_millis(millis)
                }
            }
            None => defaults.dns_timeout,
        };

        Ok(Self {
            cert_path,
            key_path,
            webhook_port,
            health_port,
            dns_timeout,
        })
    }
}

fn parse_port<F>(lookup: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(Error::Config(format!(
                "{} must be a port number in [1, 65535] (got '{}')",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}
