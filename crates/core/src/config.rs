use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::currency::normalize_currency_code;
use crate::models::region::RegionCode;

/// Runtime configuration for the pricing layer.
///
/// Every field has a default, so a TOML document only needs to name the
/// values it overrides:
///
/// ```toml
/// home_region = "IN"
/// markup = 1.5
/// region_endpoint = "https://example.com/api"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency that base prices and fetched rates are expressed in.
    pub reference_currency: String,

    /// Region that pays the base price without markup.
    pub home_region: String,

    /// Multiplier applied to prices for every other region, including unknown.
    pub markup: f64,

    /// Base price used when a region is missing from the pricing table.
    pub default_base_price: f64,

    /// Cached rate maps older than this are discarded.
    pub cache_ttl_secs: u64,

    /// Interval between background rate refreshes.
    pub refresh_interval_secs: u64,

    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_secs: u64,

    /// Base URL of the site API that exposes `GET /region`.
    pub region_endpoint: String,

    /// Base URL of the primary rate source (exchangerate-api v4).
    pub primary_rates_url: String,

    /// Base URL of the secondary rate source (Frankfurter).
    pub secondary_rates_url: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            reference_currency: "INR".to_string(),
            home_region: "IN".to_string(),
            markup: 1.5,
            default_base_price: 45_000.0,
            cache_ttl_secs: 60 * 60,
            refresh_interval_secs: 5 * 60,
            http_timeout_secs: 10,
            region_endpoint: "http://127.0.0.1:3000/api".to_string(),
            primary_rates_url: "https://api.exchangerate-api.com/v4".to_string(),
            secondary_rates_url: "https://api.frankfurter.dev/v1".to_string(),
        }
    }
}

impl PricingConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        let config: PricingConfig = toml::from_str(source)?;
        config.validate()
    }

    /// Check field ranges and normalize codes to uppercase.
    pub fn validate(mut self) -> Result<Self, CoreError> {
        self.reference_currency = normalize_currency_code(&self.reference_currency)?;
        self.home_region = RegionCode::parse(&self.home_region)?.to_string();

        if !self.markup.is_finite() || self.markup < 1.0 {
            return Err(CoreError::Config(format!(
                "markup must be a finite multiplier >= 1.0, got {}",
                self.markup
            )));
        }
        if !self.default_base_price.is_finite() || self.default_base_price <= 0.0 {
            return Err(CoreError::Config(format!(
                "default_base_price must be positive, got {}",
                self.default_base_price
            )));
        }
        if self.cache_ttl_secs == 0 {
            return Err(CoreError::Config("cache_ttl_secs must be > 0".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(CoreError::Config("refresh_interval_secs must be > 0".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(CoreError::Config("http_timeout_secs must be > 0".into()));
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
