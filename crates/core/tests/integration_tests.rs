// ═══════════════════════════════════════════════════════════════════
// Integration Tests: PricingContext end to end: detection, currency
// selection, rate loading, conversion, formatting, auto refresh
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use travel_pricing_core::config::PricingConfig;
use travel_pricing_core::errors::CoreError;
use travel_pricing_core::models::rates::{RatesMap, RatesSource};
use travel_pricing_core::models::region::{Region, RegionCode, RegionSource};
use travel_pricing_core::providers::registry::RateProviderChain;
use travel_pricing_core::providers::traits::{RateProvider, RegionLookup};
use travel_pricing_core::storage::file_store::JsonFileStore;
use travel_pricing_core::storage::preferences::{
    Preferences, CURRENCY_KEY, RATES_CACHE_KEY, REGION_KEY,
};
use travel_pricing_core::storage::store::{KeyValueStore, MemoryStore, UnavailableStore};
use travel_pricing_core::PricingContext;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * b.abs().max(1.0)
}

fn region(code: &str) -> Region {
    Region::Known(RegionCode::parse(code).unwrap())
}

// ═══════════════════════════════════════════════════════════════════
// Mocks
// ═══════════════════════════════════════════════════════════════════

struct StaticRates {
    rates: Option<Vec<(&'static str, f64)>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RateProvider for StaticRates {
    fn name(&self) -> &str {
        "Static"
    }

    async fn fetch_rates(&self, base: &str) -> Result<RatesMap, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rates
            .clone()
            .map(|rates| RatesMap::from_rates(base, rates))
            .ok_or_else(|| CoreError::Network("unreachable".into()))
    }
}

struct StaticLookup {
    region: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RegionLookup for StaticLookup {
    async fn lookup_region(&self) -> Result<Option<RegionCode>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.region.map(RegionCode::parse).transpose()
    }
}

const LIVE_RATES: &[(&str, f64)] = &[
    ("USD", 0.012),
    ("EUR", 0.011),
    ("GBP", 0.0095),
    ("AED", 0.044),
    ("JPY", 1.8),
];

struct Harness {
    ctx: Arc<PricingContext>,
    rate_calls: Arc<AtomicUsize>,
    lookup_calls: Arc<AtomicUsize>,
}

fn harness(
    store: Arc<dyn KeyValueStore>,
    rates: Option<Vec<(&'static str, f64)>>,
    geo: Option<&'static str>,
) -> Harness {
    init_tracing();
    let rate_calls = Arc::new(AtomicUsize::new(0));
    let lookup_calls = Arc::new(AtomicUsize::new(0));

    let mut chain = RateProviderChain::new();
    chain.register(Box::new(StaticRates {
        rates,
        calls: rate_calls.clone(),
    }));
    let lookup = StaticLookup {
        region: geo,
        calls: lookup_calls.clone(),
    };

    let ctx = PricingContext::with_components(
        PricingConfig::default(),
        store,
        chain,
        Some(Box::new(lookup)),
    )
    .unwrap();

    Harness {
        ctx: Arc::new(ctx),
        rate_calls,
        lookup_calls,
    }
}

fn live() -> Option<Vec<(&'static str, f64)>> {
    Some(LIVE_RATES.to_vec())
}

// ═══════════════════════════════════════════════════════════════════
// Before initialize
// ═══════════════════════════════════════════════════════════════════

mod before_initialize {
    use super::*;

    #[test]
    fn shows_reference_currency_with_emergency_rates() {
        let h = harness(Arc::new(MemoryStore::new()), live(), Some("US"));
        assert_eq!(h.ctx.currency(), "INR");
        assert_eq!(h.ctx.region(), Region::Unknown);
        assert_eq!(h.ctx.rates_source(), RatesSource::Emergency);
        assert!(!h.ctx.is_loading());
    }

    #[test]
    fn already_prices_with_unknown_markup() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        assert_eq!(h.ctx.convert_price(45_000.0), 67_500.0);
        assert_eq!(h.ctx.markup(), 1.5);
    }

    #[test]
    fn debug_output() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        let text = format!("{:?}", h.ctx);
        assert!(text.contains("PricingContext"));
        assert!(text.contains("INR"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// initialize
// ═══════════════════════════════════════════════════════════════════

mod initialize {
    use super::*;

    #[tokio::test]
    async fn foreign_visitor_gets_local_currency_and_markup() {
        let h = harness(Arc::new(MemoryStore::new()), live(), Some("US"));
        h.ctx.initialize().await;

        assert_eq!(h.ctx.region(), region("US"));
        assert_eq!(h.ctx.region_source(), RegionSource::Geolocation);
        assert_eq!(h.ctx.currency(), "USD");
        assert_eq!(h.ctx.rates_source(), RatesSource::Provider("Static".into()));
        assert!(!h.ctx.is_loading());

        assert!(approx(h.ctx.convert_price(45_000.0), 810.0));
        assert!(approx(h.ctx.package_price(), 810.0));
        assert_eq!(h.ctx.format_price(45_000.0, None), "$810");
    }

    #[tokio::test]
    async fn home_visitor_pays_base_price() {
        let store = Arc::new(MemoryStore::new());
        store.set(REGION_KEY, "IN").unwrap();
        let h = harness(store, live(), Some("US"));
        h.ctx.initialize().await;

        assert_eq!(h.lookup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.ctx.region(), region("IN"));
        assert_eq!(h.ctx.currency(), "INR");
        assert_eq!(h.ctx.markup(), 1.0);
        assert_eq!(h.ctx.convert_price(45_000.0), 45_000.0);
        assert_eq!(h.ctx.format_price(45_000.0, Some(2)), "₹45,000");
    }

    #[tokio::test]
    async fn saved_currency_wins_over_region_currency() {
        let store = Arc::new(MemoryStore::new());
        store.set(CURRENCY_KEY, "eur").unwrap();
        let h = harness(store, live(), Some("US"));
        h.ctx.initialize().await;

        assert_eq!(h.ctx.region(), region("US"));
        assert_eq!(h.ctx.currency(), "EUR");
        // 45000 × 1.5 × 0.011
        assert!(approx(h.ctx.convert_price(45_000.0), 742.5));
        assert_eq!(h.ctx.format_price(45_000.0, Some(2)), "742,5\u{a0}€");
    }

    #[tokio::test]
    async fn unsupported_saved_currency_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.set(CURRENCY_KEY, "XYZ").unwrap();
        let h = harness(store, live(), Some("GB"));
        h.ctx.initialize().await;
        assert_eq!(h.ctx.currency(), "GBP");
    }

    #[tokio::test]
    async fn unknown_region_uses_reference_currency_with_markup() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        h.ctx.initialize().await;

        assert_eq!(h.ctx.region(), Region::Unknown);
        assert_eq!(h.ctx.currency(), "INR");
        assert_eq!(h.ctx.convert_price(45_000.0), 67_500.0);
        assert_eq!(h.ctx.region_pricing().region_name, "Unknown");
    }

    #[tokio::test]
    async fn region_outside_table_gets_fallback_pricing() {
        let h = harness(Arc::new(MemoryStore::new()), live(), Some("BR"));
        h.ctx.initialize().await;

        let pricing = h.ctx.region_pricing();
        assert_eq!(pricing.region_name, "BR");
        assert_eq!(pricing.base_currency, "INR");
        assert_eq!(h.ctx.currency(), "INR");
        assert_eq!(h.ctx.markup(), 1.5);
    }

    #[tokio::test]
    async fn rate_apis_down_still_prices() {
        let h = harness(Arc::new(MemoryStore::new()), None, Some("GB"));
        h.ctx.initialize().await;

        assert_eq!(h.ctx.rates_source(), RatesSource::Emergency);
        let price = h.ctx.convert_price(45_000.0);
        assert!(price.is_finite() && price > 0.0);
        assert!(h.ctx.format_price(45_000.0, None).starts_with('£'));
    }

    #[tokio::test]
    async fn corrupted_rate_cache_never_prices_at_zero() {
        let store = Arc::new(MemoryStore::new());
        let cache = json!({
            "rates": { "base": "INR", "rates": { "INR": 2.0, "USD": 0.0 } },
            "timestamp": chrono::Utc::now().timestamp_millis(),
            "source": "Static",
        });
        store.set(RATES_CACHE_KEY, &cache.to_string()).unwrap();

        let h = harness(store, live(), Some("US"));
        h.ctx.initialize().await;
        h.ctx.set_currency("USD").unwrap();

        assert_eq!(h.ctx.rates_source(), RatesSource::Provider("Static".into()));
        assert_eq!(h.ctx.rates().rate("INR"), Some(1.0));
        assert!(approx(h.ctx.convert_price(45_000.0), 45_000.0 * 1.5 * 0.012));
        assert_eq!(h.ctx.format_price(45_000.0, None), "$810");
    }

    #[tokio::test]
    async fn storage_disabled_still_works() {
        let h = harness(Arc::new(UnavailableStore), live(), Some("AE"));
        h.ctx.initialize().await;

        assert_eq!(h.ctx.currency(), "AED");
        assert!(approx(h.ctx.convert_price(45_000.0), 45_000.0 * 1.5 * 0.044));
        assert!(h.ctx.set_currency("USD").is_ok());
        assert_eq!(h.ctx.currency(), "USD");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Selection
// ═══════════════════════════════════════════════════════════════════

mod selection {
    use super::*;

    #[tokio::test]
    async fn set_currency_persists_currency_and_home_region() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(store.clone(), live(), Some("US"));
        h.ctx.initialize().await;

        h.ctx.set_currency("gbp").unwrap();
        assert_eq!(h.ctx.currency(), "GBP");
        assert_eq!(h.ctx.region(), region("GB"));
        assert_eq!(h.ctx.region_source(), RegionSource::Saved);

        let saved = Preferences::new(store).load();
        assert_eq!(saved.currency.as_deref(), Some("GBP"));
        assert_eq!(saved.region.unwrap().as_str(), "GB");
    }

    #[tokio::test]
    async fn selecting_home_currency_removes_markup() {
        let h = harness(Arc::new(MemoryStore::new()), live(), Some("US"));
        h.ctx.initialize().await;
        assert_eq!(h.ctx.markup(), 1.5);

        h.ctx.set_currency("INR").unwrap();
        assert_eq!(h.ctx.region(), region("IN"));
        assert_eq!(h.ctx.convert_price(45_000.0), 45_000.0);
    }

    #[test]
    fn set_currency_rejects_bad_input() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        assert!(matches!(h.ctx.set_currency("XYZ"), Err(CoreError::UnknownCurrency(_))));
        assert!(matches!(h.ctx.set_currency("12"), Err(CoreError::InvalidCurrency(_))));
        assert_eq!(h.ctx.currency(), "INR");
    }

    #[test]
    fn set_region_persists_and_returns_pricing() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(store.clone(), live(), None);

        let pricing = h.ctx.set_region("ae").unwrap();
        assert_eq!(pricing.base_currency, "AED");
        assert_eq!(h.ctx.region(), region("AE"));
        assert_eq!(store.get(REGION_KEY).unwrap().as_deref(), Some("AE"));
        // Display currency is unchanged.
        assert_eq!(h.ctx.currency(), "INR");
    }

    #[test]
    fn set_region_rejects_bad_code() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        assert!(matches!(h.ctx.set_region("UAE"), Err(CoreError::InvalidRegion(_))));
    }

    #[tokio::test]
    async fn selection_survives_restart_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let first = harness(Arc::new(JsonFileStore::new(&path)), live(), Some("US"));
        first.ctx.initialize().await;
        first.ctx.set_currency("JPY").unwrap();

        let second = harness(Arc::new(JsonFileStore::new(&path)), live(), Some("US"));
        second.ctx.initialize().await;
        assert_eq!(second.ctx.currency(), "JPY");
        assert_eq!(second.ctx.region(), region("JP"));
        assert_eq!(second.lookup_calls.load(Ordering::SeqCst), 0);
        // Rates come from the cache the first context wrote.
        assert_eq!(second.ctx.rates_source(), RatesSource::Cache("Static".into()));
        assert_eq!(second.rate_calls.load(Ordering::SeqCst), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Refresh
// ═══════════════════════════════════════════════════════════════════

mod refresh {
    use super::*;

    #[tokio::test]
    async fn refresh_uses_cache_within_ttl() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        h.ctx.initialize().await;
        let source = h.ctx.refresh_rates().await;

        assert_eq!(source, RatesSource::Cache("Static".into()));
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refresh_goes_to_providers() {
        let h = harness(Arc::new(MemoryStore::new()), live(), None);
        h.ctx.initialize().await;
        let source = h.ctx.force_refresh_rates().await;

        assert_eq!(source, RatesSource::Provider("Static".into()));
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_ticks_until_stopped() {
        // Failing providers never populate the cache, so every tick hits them.
        let h = harness(Arc::new(MemoryStore::new()), None, None);
        let handle = h.ctx.spawn_auto_refresh(Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 3);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(3_000)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn default_refresh_ticks_every_five_minutes() {
        let h = harness(Arc::new(MemoryStore::new()), None, None);
        let handle = h.ctx.spawn_default_refresh();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 2);
        handle.stop();
    }

    /// First call parks until `gate` is notified and returns an older
    /// USD rate; later calls answer immediately.
    struct GatedRates {
        gate: Arc<tokio::sync::Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RateProvider for GatedRates {
        fn name(&self) -> &str {
            "Gated"
        }

        async fn fetch_rates(&self, base: &str) -> Result<RatesMap, CoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
                return Ok(RatesMap::from_rates(base, vec![("USD", 0.010)]));
            }
            Ok(RatesMap::from_rates(base, vec![("USD", 0.012)]))
        }
    }

    #[tokio::test]
    async fn overlapping_refreshes_keep_newest_rates_and_loading_flag() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = RateProviderChain::new();
        chain.register(Box::new(GatedRates {
            gate: gate.clone(),
            calls: calls.clone(),
        }));
        let ctx = Arc::new(
            PricingContext::with_components(
                PricingConfig::default(),
                Arc::new(MemoryStore::new()),
                chain,
                None,
            )
            .unwrap(),
        );

        let slow = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.force_refresh_rates().await }
        });
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(ctx.is_loading());

        ctx.force_refresh_rates().await;
        assert!(ctx.is_loading());
        assert_eq!(ctx.rates().rate("USD"), Some(0.012));

        gate.notify_one();
        slow.await.unwrap();
        assert!(!ctx.is_loading());
        assert_eq!(ctx.rates().rate("USD"), Some(0.012));
        assert_eq!(ctx.rates_source(), RatesSource::Provider("Gated".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_refresh() {
        let h = harness(Arc::new(MemoryStore::new()), None, None);
        {
            let _handle = h.ctx.spawn_auto_refresh(Duration::from_secs(60));
        }
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.rate_calls.load(Ordering::SeqCst), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// HTTP end to end
// ═══════════════════════════════════════════════════════════════════

mod http {
    use super::*;

    #[tokio::test]
    async fn full_stack_against_mock_servers() {
        init_tracing();
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/region"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "region": "GB" })))
            .mount(&site)
            .await;

        let primary = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;

        let secondary = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "base": "INR",
                "rates": { "GBP": 0.0095, "USD": 0.012 }
            })))
            .mount(&secondary)
            .await;

        let config = PricingConfig {
            region_endpoint: format!("{}/api", site.uri()),
            primary_rates_url: primary.uri(),
            secondary_rates_url: secondary.uri(),
            http_timeout_secs: 5,
            ..PricingConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ctx = PricingContext::new(config, store.clone()).unwrap();
        ctx.initialize().await;

        assert_eq!(ctx.region(), region("GB"));
        assert_eq!(ctx.currency(), "GBP");
        assert_eq!(ctx.rates_source(), RatesSource::Provider("Frankfurter".into()));
        // 45000 × 1.5 × 0.0095 = 641.25
        assert_eq!(ctx.format_price(45_000.0, Some(2)), "£641.25");
        assert!(store.get(RATES_CACHE_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn everything_unreachable() {
        init_tracing();
        let config = PricingConfig {
            region_endpoint: "http://127.0.0.1:9/api".into(),
            primary_rates_url: "http://127.0.0.1:9".into(),
            secondary_rates_url: "http://127.0.0.1:9".into(),
            http_timeout_secs: 2,
            ..PricingConfig::default()
        };
        let ctx = PricingContext::new(config, Arc::new(MemoryStore::new())).unwrap();
        ctx.initialize().await;

        assert_eq!(ctx.region(), Region::Unknown);
        assert_eq!(ctx.rates_source(), RatesSource::Emergency);
        assert_eq!(ctx.convert_price(45_000.0), 67_500.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PricingConfig {
            markup: f64::NAN,
            ..PricingConfig::default()
        };
        assert!(matches!(
            PricingContext::new(config, Arc::new(MemoryStore::new())),
            Err(CoreError::Config(_))
        ));
    }
}
