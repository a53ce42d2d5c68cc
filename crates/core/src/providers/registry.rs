use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::rates::RatesMap;

use super::exchangerate_api::ExchangeRateApiProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::RateProvider;
use crate::config::PricingConfig;

/// Ordered chain of rate providers, tried first to last.
pub struct RateProviderChain {
    providers: Vec<Box<dyn RateProvider>>,
}

impl RateProviderChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// exchangerate-api first, Frankfurter as the fallback.
    pub fn new_with_defaults(config: &PricingConfig) -> Self {
        let mut chain = Self::new();
        chain.register(Box::new(ExchangeRateApiProvider::with_base_url(
            &config.primary_rates_url,
            config.http_timeout(),
        )));
        chain.register(Box::new(FrankfurterProvider::with_base_url(
            &config.secondary_rates_url,
            config.http_timeout(),
        )));
        chain
    }

    /// Append a provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn RateProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Try each provider in order and return the first usable map with
    /// the name of the provider that produced it.
    ///
    /// A provider that returns a map quoting nothing but the base is
    /// treated as a failure.
    pub async fn fetch_first(&self, base: &str) -> Result<(RatesMap, String), CoreError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.fetch_rates(base).await {
                Ok(rates) if rates.quoted_count() > 0 => {
                    debug!(provider = provider.name(), count = rates.quoted_count(), "fetched rates");
                    return Ok((rates, provider.name().to_string()));
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "rate provider returned an empty rate set");
                    last_error = Some(CoreError::Api {
                        provider: provider.name().to_string(),
                        message: format!("Empty rate set for base {base}"),
                    });
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "rate provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::Api {
            provider: "none".into(),
            message: "No rate providers registered".into(),
        }))
    }
}

impl Default for RateProviderChain {
    fn default() -> Self {
        Self::new()
    }
}
