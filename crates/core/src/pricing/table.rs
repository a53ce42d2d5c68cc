use crate::models::pricing::RegionPricing;
use crate::models::region::Region;

/// Flat package price in the reference currency (INR).
pub const BASE_PACKAGE_PRICE: f64 = 45_000.0;

/// Static pricing rows: (country, display currency, locale, name).
const REGIONS: &[(&str, &str, &str, &str)] = &[
    ("IN", "INR", "en-IN", "India"),
    ("US", "USD", "en-US", "United States"),
    ("GB", "GBP", "en-GB", "United Kingdom"),
    ("AE", "AED", "en-AE", "United Arab Emirates"),
    ("AU", "AUD", "en-AU", "Australia"),
    ("CA", "CAD", "en-CA", "Canada"),
    ("SG", "SGD", "en-SG", "Singapore"),
    ("DE", "EUR", "de-DE", "Germany"),
    ("FR", "EUR", "fr-FR", "France"),
    ("JP", "JPY", "ja-JP", "Japan"),
];

/// Region → pricing lookup. Pure: no I/O, no caching.
///
/// Codes missing from the table get a synthesized record in the reference
/// currency, named after the unrecognized code.
#[derive(Debug, Clone)]
pub struct PricingTable {
    reference_currency: String,
    reference_locale: String,
    default_base_price: f64,
}

impl PricingTable {
    pub fn new(reference_currency: impl Into<String>, default_base_price: f64) -> Self {
        let reference_currency = reference_currency.into().to_ascii_uppercase();
        let reference_locale = REGIONS
            .iter()
            .find(|(_, currency, _, _)| *currency == reference_currency)
            .map_or("en-US", |(_, _, locale, _)| *locale)
            .to_string();
        Self {
            reference_currency,
            reference_locale,
            default_base_price,
        }
    }

    /// Pricing record for a region code (case-insensitive).
    pub fn lookup(&self, code: &str) -> RegionPricing {
        let upper = code.trim().to_ascii_uppercase();
        match REGIONS.iter().find(|(country, _, _, _)| *country == upper) {
            Some((country, currency, locale, name)) => RegionPricing {
                country_code: country.to_string(),
                base_currency: currency.to_string(),
                base_price: BASE_PACKAGE_PRICE,
                locale: locale.to_string(),
                region_name: name.to_string(),
            },
            None => self.fallback(&upper, code.trim()),
        }
    }

    /// Pricing record for a detected region; `Unknown` gets the fallback.
    pub fn pricing_for(&self, region: &Region) -> RegionPricing {
        match region.code() {
            Some(code) => self.lookup(code.as_str()),
            None => self.fallback("", "Unknown"),
        }
    }

    /// Every region in the static table, in display order.
    pub fn supported_regions(&self) -> Vec<RegionPricing> {
        REGIONS
            .iter()
            .map(|(country, _, _, _)| self.lookup(country))
            .collect()
    }

    pub fn is_supported(&self, code: &str) -> bool {
        let upper = code.trim().to_ascii_uppercase();
        REGIONS.iter().any(|(country, _, _, _)| *country == upper)
    }

    fn fallback(&self, country_code: &str, display_name: &str) -> RegionPricing {
        RegionPricing {
            country_code: country_code.to_string(),
            base_currency: self.reference_currency.clone(),
            base_price: self.default_base_price,
            locale: self.reference_locale.clone(),
            region_name: display_name.to_string(),
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new("INR", BASE_PACKAGE_PRICE)
    }
}

/// Lookup against the default table (INR reference, flat base price).
pub fn region_pricing(code: &str) -> RegionPricing {
    PricingTable::default().lookup(code)
}
