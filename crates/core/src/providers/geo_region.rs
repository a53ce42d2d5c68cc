use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::region::RegionCode;
use super::traits::RegionLookup;

const NAME: &str = "RegionEndpoint";

/// Calls the site API's `GET {base}/region`, which reads the CDN's
/// geolocation headers and answers `{"region": "IN"}` or `{"region": null}`.
pub struct GeoHeaderRegionLookup {
    client: Client,
    endpoint: String,
}

impl GeoHeaderRegionLookup {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(timeout);
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            endpoint: format!("{}/region", api_base.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct RegionResponse {
    region: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RegionLookup for GeoHeaderRegionLookup {
    async fn lookup_region(&self) -> Result<Option<RegionCode>, CoreError> {
        let resp: RegionResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: NAME.into(),
                message: format!("Failed to parse region response: {e}"),
            })?;

        match resp.region.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => RegionCode::parse(code).map(Some),
        }
    }
}
