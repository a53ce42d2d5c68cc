use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::rates::RatesMap;
use super::traits::RateProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";
const NAME: &str = "Frankfurter";

/// Frankfurter API provider. Fallback rate source.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Coverage**: ~30 currencies (EUR, USD, INR, GBP, JPY, etc.). AED is not quoted.
/// - **Endpoint**: `/latest?base={BASE}`
///
/// The base currency is omitted from the response; `RatesMap` adds it back as 1.0.
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL, Duration::from_secs(10))
    }

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

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_rates(&self, base: &str) -> Result<RatesMap, CoreError> {
        let base = base.trim().to_uppercase();
        let url = format!("{}/latest?base={base}", self.base_url);

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: NAME.into(),
                message: format!("Failed to parse response for base {base}: {e}"),
            })?;

        if resp.rates.is_empty() {
            return Err(CoreError::Api {
                provider: NAME.into(),
                message: format!("No rates found for base {base}"),
            });
        }

        Ok(RatesMap::from_rates(&base, resp.rates))
    }
}
