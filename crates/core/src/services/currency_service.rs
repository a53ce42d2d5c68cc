use tracing::warn;

use crate::errors::CoreError;
use crate::format::format_amount;
use crate::models::rates::RatesMap;
use crate::models::region::{Region, RegionCode};
use crate::pricing::emergency::emergency_rates;

/// Converts reference-currency prices into a display currency.
///
/// Amounts are first multiplied by the markup unless the region is the home
/// region, then divided by the source rate and multiplied by the target
/// rate (both relative to the reference currency).
pub struct CurrencyConverter {
    reference_currency: String,
    home_region: RegionCode,
    markup: f64,
    emergency: RatesMap,
}

impl CurrencyConverter {
    pub fn new(reference_currency: &str, home_region: RegionCode, markup: f64) -> Self {
        Self {
            reference_currency: reference_currency.trim().to_ascii_uppercase(),
            emergency: emergency_rates(reference_currency),
            home_region,
            markup,
        }
    }

    pub fn reference_currency(&self) -> &str {
        &self.reference_currency
    }

    pub fn home_region(&self) -> &RegionCode {
        &self.home_region
    }

    /// 1.0 at home, the configured markup everywhere else (unknown included).
    pub fn markup_for(&self, region: &Region) -> f64 {
        if region.is_home(&self.home_region) {
            1.0
        } else {
            self.markup
        }
    }

    /// Strict conversion: fails if either currency has no rate in `rates`.
    pub fn try_convert(
        &self,
        rates: &RatesMap,
        amount: f64,
        from: &str,
        to: &str,
        region: &Region,
    ) -> Result<f64, CoreError> {
        let from_rate = rates
            .rate(from)
            .ok_or_else(|| CoreError::UnknownCurrency(from.to_uppercase()))?;
        let to_rate = rates
            .rate(to)
            .ok_or_else(|| CoreError::UnknownCurrency(to.to_uppercase()))?;

        Ok(amount * self.markup_for(region) / from_rate * to_rate)
    }

    /// Best-effort conversion that always yields a number.
    ///
    /// Missing rates are taken from the emergency table; if a currency is
    /// unknown there too, the marked-up amount is returned unconverted.
    pub fn convert(
        &self,
        rates: &RatesMap,
        amount: f64,
        from: &str,
        to: &str,
        region: &Region,
    ) -> f64 {
        let marked_up = amount * self.markup_for(region);

        let from_rate = rates.rate(from).or_else(|| self.emergency.rate(from));
        let to_rate = rates.rate(to).or_else(|| self.emergency.rate(to));

        match (from_rate, to_rate) {
            (Some(from_rate), Some(to_rate)) => marked_up / from_rate * to_rate,
            _ => {
                warn!(from, to, "no rate for conversion, returning unconverted amount");
                marked_up
            }
        }
    }

    /// Convert from the reference currency and format for `locale`.
    pub fn convert_and_format(
        &self,
        rates: &RatesMap,
        base_amount: f64,
        to: &str,
        region: &Region,
        locale: &str,
        max_fraction_digits: u8,
    ) -> String {
        let value = self.convert(rates, base_amount, &self.reference_currency, to, region);
        format_amount(value, to, locale, max_fraction_digits)
    }
}
