use crate::models::currency::CurrencyInfo;

/// Display currencies the site offers in its currency picker.
pub const SUPPORTED_CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo { code: "INR", symbol: "₹", name: "Indian Rupee", locale: "en-IN", home_region: Some("IN") },
    CurrencyInfo { code: "USD", symbol: "$", name: "US Dollar", locale: "en-US", home_region: Some("US") },
    CurrencyInfo { code: "EUR", symbol: "€", name: "Euro", locale: "de-DE", home_region: Some("DE") },
    CurrencyInfo { code: "GBP", symbol: "£", name: "British Pound", locale: "en-GB", home_region: Some("GB") },
    CurrencyInfo { code: "AED", symbol: "AED", name: "UAE Dirham", locale: "en-AE", home_region: Some("AE") },
    CurrencyInfo { code: "AUD", symbol: "A$", name: "Australian Dollar", locale: "en-AU", home_region: Some("AU") },
    CurrencyInfo { code: "CAD", symbol: "CA$", name: "Canadian Dollar", locale: "en-CA", home_region: Some("CA") },
    CurrencyInfo { code: "SGD", symbol: "S$", name: "Singapore Dollar", locale: "en-SG", home_region: Some("SG") },
    CurrencyInfo { code: "JPY", symbol: "¥", name: "Japanese Yen", locale: "ja-JP", home_region: Some("JP") },
];

/// Catalogue entry for a currency code (case-insensitive).
pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    let upper = code.trim().to_ascii_uppercase();
    SUPPORTED_CURRENCIES.iter().find(|c| c.code == upper)
}

pub fn is_supported_currency(code: &str) -> bool {
    currency_info(code).is_some()
}

/// Region a visitor is assumed to be in after picking `code`.
pub fn home_region_for(code: &str) -> Option<&'static str> {
    currency_info(code).and_then(|c| c.home_region)
}
