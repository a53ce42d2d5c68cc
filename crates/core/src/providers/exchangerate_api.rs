use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::rates::RatesMap;
use super::traits::RateProvider;

const BASE_URL: &str = "https://api.exchangerate-api.com/v4";
const NAME: &str = "ExchangeRate-API";

/// exchangerate-api.com v4 provider. Primary rate source.
///
/// - **Free**: no API key for the `latest` endpoint.
/// - **Endpoint**: `/latest/{BASE}` → `{"base": "...", "rates": {...}}`
/// - Quotes ~160 currencies, including the base itself.
pub struct ExchangeRateApiProvider {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL, Duration::from_secs(10))
    }

    /// Point the provider at another host (mirrors, test servers).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(timeout);
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for ExchangeRateApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_rates(&self, base: &str) -> Result<RatesMap, CoreError> {
        let base = base.trim().to_uppercase();
        let url = format!("{}/latest/{base}", self.base_url);

        let resp: LatestResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: NAME.into(),
                message: format!("Failed to parse rates for base {base}: {e}"),
            })?;

        if resp.rates.is_empty() {
            return Err(CoreError::Api {
                provider: NAME.into(),
                message: format!("No rates returned for base {base}"),
            });
        }

        Ok(RatesMap::from_rates(&base, resp.rates))
    }
}
