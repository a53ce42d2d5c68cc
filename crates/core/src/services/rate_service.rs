use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::rates::{CachedRates, RatesSnapshot, RatesSource};
use crate::pricing::emergency::emergency_rates;
use crate::providers::registry::RateProviderChain;
use crate::storage::preferences::Preferences;

/// Produces the active rate map. Never fails.
///
/// Chain: fresh cache → providers in order → bundled emergency table.
/// A successful fetch replaces the cache entry wholesale; the emergency
/// table is never written to the cache.
pub struct RateService {
    chain: RateProviderChain,
    preferences: Preferences,
    reference_currency: String,
    ttl: chrono::Duration,
}

impl RateService {
    pub fn new(
        chain: RateProviderChain,
        preferences: Preferences,
        reference_currency: &str,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            chain,
            preferences,
            reference_currency: reference_currency.trim().to_ascii_uppercase(),
            ttl,
        }
    }

    pub fn reference_currency(&self) -> &str {
        &self.reference_currency
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.chain.provider_names()
    }

    pub async fn get_rates(&self) -> RatesSnapshot {
        self.get_rates_at(Utc::now()).await
    }

    /// Same as [`get_rates`](Self::get_rates) with an explicit clock.
    pub async fn get_rates_at(&self, now: DateTime<Utc>) -> RatesSnapshot {
        if let Some(cached) = self.preferences.fresh_cached_rates(now, self.ttl) {
            if cached.rates.base() != self.reference_currency {
                debug!(base = cached.rates.base(), "rate cache has a different base, ignoring");
            } else if cached.rates.quoted_count() == 0 {
                debug!(source = %cached.source, "rate cache quotes no currencies, ignoring");
            } else {
                debug!(source = %cached.source, "rate cache hit");
                return RatesSnapshot {
                    rates: cached.rates,
                    source: RatesSource::Cache(cached.source),
                };
            }
        }

        self.fetch_live_at(now).await
    }

    /// Skip the cache and go straight to the providers.
    pub async fn force_refresh(&self) -> RatesSnapshot {
        self.fetch_live_at(Utc::now()).await
    }

    async fn fetch_live_at(&self, now: DateTime<Utc>) -> RatesSnapshot {
        match self.chain.fetch_first(&self.reference_currency).await {
            Ok((rates, provider)) => {
                info!(provider = %provider, count = rates.quoted_count(), "exchange rates refreshed");
                self.preferences
                    .save_cached_rates(&CachedRates::new(rates.clone(), provider.clone(), now));
                RatesSnapshot {
                    rates,
                    source: RatesSource::Provider(provider),
                }
            }
            Err(e) => {
                warn!(error = %e, "all rate providers failed, using emergency rates");
                self.emergency_snapshot()
            }
        }
    }

    pub fn emergency_snapshot(&self) -> RatesSnapshot {
        RatesSnapshot {
            rates: emergency_rates(&self.reference_currency),
            source: RatesSource::Emergency,
        }
    }
}
