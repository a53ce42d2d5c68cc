use crate::models::rates::RatesMap;

/// Approximate INR-relative rates bundled with the build.
/// Used only when the cache is stale and both rate APIs fail.
const EMERGENCY_INR_RATES: &[(&str, f64)] = &[
    ("INR", 1.0),
    ("USD", 0.012),
    ("EUR", 0.011),
    ("GBP", 0.0095),
    ("AED", 0.044),
    ("AUD", 0.018),
    ("CAD", 0.016),
    ("SGD", 0.016),
    ("JPY", 1.8),
];

/// Emergency table rebased onto `reference_currency`.
///
/// If the reference currency is not in the table, only its own `1.0`
/// entry survives.
pub fn emergency_rates(reference_currency: &str) -> RatesMap {
    let reference = reference_currency.trim().to_ascii_uppercase();
    let pivot = EMERGENCY_INR_RATES
        .iter()
        .find(|(code, _)| *code == reference)
        .map(|(_, rate)| *rate);

    match pivot {
        Some(pivot) => RatesMap::from_rates(
            &reference,
            EMERGENCY_INR_RATES
                .iter()
                .map(|(code, rate)| (*code, rate / pivot)),
        ),
        None => RatesMap::from_rates(&reference, std::iter::empty::<(&str, f64)>()),
    }
}
