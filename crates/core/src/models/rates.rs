use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Currency code → multiplier relative to the reference currency.
///
/// The reference currency's own entry is always exactly `1.0`. A map is
/// replaced wholesale on refresh, never merged entry by entry.
/// Deserialized maps go through [`RatesMap::from_rates`] as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRatesMap")]
pub struct RatesMap {
    base: String,
    rates: BTreeMap<String, f64>,
}

/// Persisted shape of a [`RatesMap`], before validation.
#[derive(Deserialize)]
struct RawRatesMap {
    base: String,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

impl From<RawRatesMap> for RatesMap {
    fn from(raw: RawRatesMap) -> Self {
        RatesMap::from_rates(&raw.base, raw.rates)
    }
}

impl RatesMap {
    /// Build a map from raw provider output.
    ///
    /// Codes are uppercased, entries that are not finite and positive are
    /// dropped, and the base entry is forced to `1.0`.
    pub fn from_rates<I, K>(base: &str, rates: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let base = base.trim().to_ascii_uppercase();
        let mut map: BTreeMap<String, f64> = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .map(|(code, rate)| (code.as_ref().trim().to_ascii_uppercase(), rate))
            .collect();
        map.insert(base.clone(), 1.0);
        Self { base, rates: map }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Multiplier for `currency`, case-insensitive.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(&currency.trim().to_ascii_uppercase()).copied()
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.rate(currency).is_some()
    }

    /// Number of currencies besides the base itself.
    pub fn quoted_count(&self) -> usize {
        self.rates.len().saturating_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }
}

/// A rate map as persisted in the preference store.
///
/// Serialized as `{"rates": {...}, "timestamp": <ms>, "source": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRates {
    pub rates: RatesMap,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl CachedRates {
    pub fn new(rates: RatesMap, source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            rates,
            timestamp,
            source: source.into(),
        }
    }

    /// Fresh means strictly younger than `ttl` at `now`.
    /// Entries stamped in the future are treated as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        let age = now - self.timestamp;
        age >= chrono::Duration::zero() && age < ttl
    }
}

/// Where the currently active rate map came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatesSource {
    /// Fresh cache entry written by the named provider.
    Cache(String),
    /// Fetched just now from the named provider.
    Provider(String),
    /// Bundled emergency table.
    Emergency,
}

impl std::fmt::Display for RatesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatesSource::Cache(name) => write!(f, "cache ({name})"),
            RatesSource::Provider(name) => write!(f, "{name}"),
            RatesSource::Emergency => write!(f, "emergency"),
        }
    }
}

/// An active rate map plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesSnapshot {
    pub rates: RatesMap,
    pub source: RatesSource,
}
