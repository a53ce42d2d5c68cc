use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::currency::normalize_currency_code;
use crate::models::rates::CachedRates;
use crate::models::region::RegionCode;
use crate::models::settings::SavedPreferences;

use super::store::KeyValueStore;

/// Storage key for the saved display currency.
pub const CURRENCY_KEY: &str = "preferred_currency";
/// Storage key for the saved region code.
pub const REGION_KEY: &str = "preferred_region";
/// Storage key for the cached rate map.
pub const RATES_CACHE_KEY: &str = "exchange_rates_cache";

/// Typed access to the visitor's persisted preferences and rate cache.
///
/// Never fails: unreadable or invalid values load as `None`, and write
/// failures are logged and dropped. With storage unavailable the app
/// simply re-detects and re-fetches every time.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load both saved values at once.
    pub fn load(&self) -> SavedPreferences {
        SavedPreferences {
            currency: self.saved_currency(),
            region: self.saved_region(),
        }
    }

    pub fn saved_currency(&self) -> Option<String> {
        let raw = self.read(CURRENCY_KEY)?;
        match normalize_currency_code(&raw) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(error = %e, "ignoring invalid saved currency");
                None
            }
        }
    }

    pub fn saved_region(&self) -> Option<RegionCode> {
        let raw = self.read(REGION_KEY)?;
        match RegionCode::parse(&raw) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(error = %e, "ignoring invalid saved region");
                None
            }
        }
    }

    pub fn save_currency(&self, currency: &str) {
        self.write(CURRENCY_KEY, currency);
    }

    pub fn save_region(&self, region: &RegionCode) {
        self.write(REGION_KEY, region.as_str());
    }

    /// Cached rates if present, parseable, and younger than `ttl` at `now`.
    pub fn fresh_cached_rates(
        &self,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Option<CachedRates> {
        let raw = self.read(RATES_CACHE_KEY)?;
        let cached: CachedRates = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "discarding unreadable rate cache");
                return None;
            }
        };

        if cached.is_fresh(now, ttl) {
            Some(cached)
        } else {
            debug!(source = %cached.source, stamped = %cached.timestamp, "rate cache expired");
            None
        }
    }

    /// Replace the cache entry wholesale.
    pub fn save_cached_rates(&self, cached: &CachedRates) {
        match serde_json::to_string(cached) {
            Ok(json) => self.write(RATES_CACHE_KEY, &json),
            Err(e) => warn!(error = %e, "failed to serialize rate cache"),
        }
    }

    pub fn clear_cached_rates(&self) {
        if let Err(e) = self.store.remove(RATES_CACHE_KEY) {
            warn!(error = %e, "failed to clear rate cache");
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "preference read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "preference write failed");
        }
    }
}
