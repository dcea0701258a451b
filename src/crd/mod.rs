//! Custom Resource Definitions (CRDs) for the registry cache webhook.
//!
//! - `RegistryCacheConfig`: Declares the caching configuration for one upstream registry

mod quantity;
mod registry_cache_config;

pub use quantity::Quantity;
pub use registry_cache_config::*;
