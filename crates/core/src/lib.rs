pub mod config;
pub mod errors;
pub mod format;
pub mod models;
pub mod pricing;
pub mod providers;
pub mod services;
pub mod storage;

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use config::PricingConfig;
use errors::CoreError;
use format::format_amount;
use models::{
    currency::normalize_currency_code,
    pricing::RegionPricing,
    rates::{RatesMap, RatesSnapshot, RatesSource},
    region::{Region, RegionCode, RegionSource},
};
use pricing::{currencies, table::PricingTable};
use providers::{geo_region::GeoHeaderRegionLookup, registry::RateProviderChain, traits::RegionLookup};
use services::{
    currency_service::CurrencyConverter, rate_service::RateService, region_service::RegionDetector,
};
use storage::{preferences::Preferences, store::KeyValueStore};

/// Mutable part of the context. Never held across an `.await`.
#[derive(Debug, Clone)]
struct ContextState {
    currency: String,
    region: Region,
    region_source: RegionSource,
    rates: RatesSnapshot,
    /// Generation of the most recently started rate load.
    started: u64,
    /// Generation whose result is currently in `rates`.
    applied: u64,
    in_flight: usize,
}

/// Main entry point: the visitor's currency, region and exchange rates.
///
/// Exactly one currency and one region are active at a time. Before
/// [`initialize`](Self::initialize) runs, the context shows the reference
/// currency, an unknown region and the bundled emergency rates, so every
/// price query already returns a number.
#[must_use]
pub struct PricingContext {
    config: PricingConfig,
    table: PricingTable,
    converter: CurrencyConverter,
    rate_service: RateService,
    detector: RegionDetector,
    preferences: Preferences,
    state: RwLock<ContextState>,
}

impl std::fmt::Debug for PricingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("PricingContext")
            .field("currency", &state.currency)
            .field("region", &state.region)
            .field("rates_source", &state.rates.source)
            .field("loading", &(state.in_flight > 0))
            .finish()
    }
}

impl PricingContext {
    /// Context backed by the default HTTP rate providers and the region
    /// endpoint named in `config`.
    pub fn new(config: PricingConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, CoreError> {
        let chain = RateProviderChain::new_with_defaults(&config);
        let lookup = GeoHeaderRegionLookup::new(&config.region_endpoint, config.http_timeout());
        Self::with_components(config, store, chain, Some(Box::new(lookup)))
    }

    /// Context with caller-supplied providers. `lookup = None` disables
    /// geolocation, leaving saved preference or unknown.
    pub fn with_components(
        config: PricingConfig,
        store: Arc<dyn KeyValueStore>,
        chain: RateProviderChain,
        lookup: Option<Box<dyn RegionLookup>>,
    ) -> Result<Self, CoreError> {
        let config = config.validate()?;
        let home = RegionCode::parse(&config.home_region)?;
        let preferences = Preferences::new(store);

        let rate_service = RateService::new(
            chain,
            preferences.clone(),
            &config.reference_currency,
            config.cache_ttl(),
        );
        let state = ContextState {
            currency: config.reference_currency.clone(),
            region: Region::Unknown,
            region_source: RegionSource::Unknown,
            rates: rate_service.emergency_snapshot(),
            started: 0,
            applied: 0,
            in_flight: 0,
        };

        Ok(Self {
            table: PricingTable::new(&config.reference_currency, config.default_base_price),
            converter: CurrencyConverter::new(&config.reference_currency, home, config.markup),
            detector: RegionDetector::new(preferences.clone(), lookup),
            rate_service,
            preferences,
            state: RwLock::new(state),
            config,
        })
    }

    /// Load saved preferences, detect the region, pick the display
    /// currency and load exchange rates.
    ///
    /// A saved currency wins; otherwise the region's default currency is used.
    pub async fn initialize(&self) {
        let saved_currency = self
            .preferences
            .saved_currency()
            .filter(|code| currencies::is_supported_currency(code));
        let detection = self.detector.detect().await;
        let pricing = self.table.pricing_for(&detection.region);
        let currency = saved_currency.unwrap_or(pricing.base_currency);

        info!(
            region = %detection.region,
            source = ?detection.source,
            currency = %currency,
            "pricing context initialized"
        );

        {
            let mut state = self.state.write();
            state.currency = currency;
            state.region = detection.region;
            state.region_source = detection.source;
        }

        self.refresh_rates().await;
    }

    /// Reload rates through the cache → providers → emergency chain.
    pub async fn refresh_rates(&self) -> RatesSource {
        let generation = self.begin_load();
        let snapshot = self.rate_service.get_rates().await;
        self.apply_rates(generation, snapshot)
    }

    /// Reload rates from the providers, ignoring any cached map.
    pub async fn force_refresh_rates(&self) -> RatesSource {
        let generation = self.begin_load();
        let snapshot = self.rate_service.force_refresh().await;
        self.apply_rates(generation, snapshot)
    }

    fn begin_load(&self) -> u64 {
        let mut state = self.state.write();
        state.started += 1;
        state.in_flight += 1;
        state.started
    }

    /// Install `snapshot` unless a load started later has already landed.
    fn apply_rates(&self, generation: u64, snapshot: RatesSnapshot) -> RatesSource {
        let source = snapshot.source.clone();
        let mut state = self.state.write();
        state.in_flight = state.in_flight.saturating_sub(1);
        if generation > state.applied {
            state.applied = generation;
            state.rates = snapshot;
        } else {
            debug!(generation, applied = state.applied, "discarding superseded rate load");
        }
        source
    }

    /// Refresh rates every `interval` on the tokio runtime.
    ///
    /// The first refresh happens one interval from now. The task stops
    /// when the returned handle is stopped or dropped.
    pub fn spawn_auto_refresh(self: &Arc<Self>, interval: Duration) -> RefreshHandle {
        let ctx = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval() fires immediately on the first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let source = ctx.refresh_rates().await;
                debug!(source = %source, "scheduled rate refresh");
            }
        });
        RefreshHandle { handle }
    }

    /// [`spawn_auto_refresh`](Self::spawn_auto_refresh) with the configured interval.
    pub fn spawn_default_refresh(self: &Arc<Self>) -> RefreshHandle {
        self.spawn_auto_refresh(self.config.refresh_interval())
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Switch the display currency and persist it.
    ///
    /// If the currency has a home region (e.g., GBP → GB), that region
    /// becomes active and is persisted too.
    pub fn set_currency(&self, currency: &str) -> Result<(), CoreError> {
        let code = normalize_currency_code(currency)?;
        let info =
            currencies::currency_info(&code).ok_or_else(|| CoreError::UnknownCurrency(code.clone()))?;

        let home = info.home_region.map(RegionCode::parse).transpose()?;

        self.preferences.save_currency(&code);
        if let Some(region) = &home {
            self.preferences.save_region(region);
        }

        let mut state = self.state.write();
        state.currency = code;
        if let Some(region) = home {
            state.region = Region::Known(region);
            state.region_source = RegionSource::Saved;
        }
        Ok(())
    }

    /// Switch the active region and persist it. The display currency is
    /// left alone.
    pub fn set_region(&self, region: &str) -> Result<RegionPricing, CoreError> {
        let code = RegionCode::parse(region)?;
        self.preferences.save_region(&code);
        let pricing = self.table.lookup(code.as_str());

        let mut state = self.state.write();
        state.region = Region::Known(code);
        state.region_source = RegionSource::Saved;
        Ok(pricing)
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    #[must_use]
    pub fn currency(&self) -> String {
        self.state.read().currency.clone()
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.state.read().region.clone()
    }

    #[must_use]
    pub fn region_source(&self) -> RegionSource {
        self.state.read().region_source
    }

    /// Pricing record for the active region.
    #[must_use]
    pub fn region_pricing(&self) -> RegionPricing {
        self.table.pricing_for(&self.state.read().region)
    }

    #[must_use]
    pub fn rates(&self) -> RatesMap {
        self.state.read().rates.rates.clone()
    }

    #[must_use]
    pub fn rates_source(&self) -> RatesSource {
        self.state.read().rates.source.clone()
    }

    /// True while any rate fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().in_flight > 0
    }

    /// Markup multiplier for the active region.
    #[must_use]
    pub fn markup(&self) -> f64 {
        self.converter.markup_for(&self.state.read().region)
    }

    // ── Pricing ─────────────────────────────────────────────────────

    /// Convert a reference-currency amount into the active currency,
    /// applying the active region's markup.
    #[must_use]
    pub fn convert_price(&self, base_amount: f64) -> f64 {
        let state = self.state.read();
        self.converter.convert(
            &state.rates.rates,
            base_amount,
            self.converter.reference_currency(),
            &state.currency,
            &state.region,
        )
    }

    /// [`convert_price`](Self::convert_price), formatted for display.
    /// `max_fraction_digits` defaults to 0.
    #[must_use]
    pub fn format_price(&self, base_amount: f64, max_fraction_digits: Option<u8>) -> String {
        let value = self.convert_price(base_amount);
        let currency = self.currency();
        let locale = currencies::currency_info(&currency)
            .map(|c| c.locale.to_string())
            .unwrap_or_else(|| self.region_pricing().locale);
        format_amount(value, &currency, &locale, max_fraction_digits.unwrap_or(0))
    }

    /// The active region's base package price in the active currency.
    #[must_use]
    pub fn package_price(&self) -> f64 {
        self.convert_price(self.region_pricing().base_price)
    }
}

/// Owns the background refresh task; aborts it on `stop` or drop.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
