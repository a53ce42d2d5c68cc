use serde::{Deserialize, Serialize};

/// Per-region pricing record.
///
/// `base_price` is in the reference currency; `base_currency` is the
/// currency the region displays by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPricing {
    pub country_code: String,
    pub base_currency: String,
    pub base_price: f64,
    pub locale: String,
    pub region_name: String,
}
