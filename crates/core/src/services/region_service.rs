use tracing::{debug, info, warn};

use crate::models::region::{Region, RegionDetection, RegionSource};
use crate::providers::traits::RegionLookup;
use crate::storage::preferences::Preferences;

/// Resolves the visitor's region.
///
/// Order: saved preference (no network) → geolocation endpoint → unknown.
/// No retries: one failed lookup means `Unknown`.
pub struct RegionDetector {
    preferences: Preferences,
    lookup: Option<Box<dyn RegionLookup>>,
}

impl RegionDetector {
    pub fn new(preferences: Preferences, lookup: Option<Box<dyn RegionLookup>>) -> Self {
        Self {
            preferences,
            lookup,
        }
    }

    pub async fn detect(&self) -> RegionDetection {
        if let Some(saved) = self.preferences.saved_region() {
            debug!(region = %saved, "using saved region");
            return RegionDetection {
                region: Region::Known(saved),
                source: RegionSource::Saved,
            };
        }

        let Some(lookup) = &self.lookup else {
            return RegionDetection::unknown();
        };

        match lookup.lookup_region().await {
            Ok(Some(code)) => {
                info!(region = %code, "region detected from geolocation");
                RegionDetection {
                    region: Region::Known(code),
                    source: RegionSource::Geolocation,
                }
            }
            Ok(None) => {
                debug!("geolocation endpoint returned no region");
                RegionDetection::unknown()
            }
            Err(e) => {
                warn!(error = %e, "region lookup failed");
                RegionDetection::unknown()
            }
        }
    }
}
