use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::rates::RatesMap;
use crate::models::region::RegionCode;

/// A remote source of exchange rates.
///
/// Each rate API implements this trait. If an API changes or disappears,
/// only its implementation is replaced; the fallback chain is untouched.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs and the cache label).
    fn name(&self) -> &str;

    /// Fetch the full rate map relative to `base`.
    ///
    /// Implementations must fail (rather than return an empty map) when the
    /// payload carries no usable rates.
    async fn fetch_rates(&self, base: &str) -> Result<RatesMap, CoreError>;
}

/// Server-side region lookup based on network-edge geolocation headers.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RegionLookup: Send + Sync {
    /// `Ok(None)` when the server could not tell.
    async fn lookup_region(&self) -> Result<Option<RegionCode>, CoreError>;
}
