//! Locale-aware currency formatting.
//!
//! Covers the handful of locales the site ships. Unknown locales format
//! like `en-US`.

use crate::pricing::currencies::currency_info;

/// Highest fraction-digit count honoured; larger requests are clamped.
pub const MAX_FRACTION_DIGITS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// 1,234,567
    Thousands,
    /// 12,34,567 (lakh/crore)
    Indian,
}

#[derive(Debug, Clone, Copy)]
struct LocaleStyle {
    group: &'static str,
    decimal: &'static str,
    grouping: Grouping,
    symbol_after: bool,
}

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

fn style_for(locale: &str) -> LocaleStyle {
    let normalized = locale.trim().replace('_', "-");
    match normalized.as_str() {
        "en-IN" | "hi-IN" => LocaleStyle {
            group: ",",
            decimal: ".",
            grouping: Grouping::Indian,
            symbol_after: false,
        },
        "de-DE" | "de-AT" | "nl-NL" | "es-ES" | "it-IT" => LocaleStyle {
            group: ".",
            decimal: ",",
            grouping: Grouping::Thousands,
            symbol_after: true,
        },
        "fr-FR" => LocaleStyle {
            group: NARROW_NBSP,
            decimal: ",",
            grouping: Grouping::Thousands,
            symbol_after: true,
        },
        _ => LocaleStyle {
            group: ",",
            decimal: ".",
            grouping: Grouping::Thousands,
            symbol_after: false,
        },
    }
}

/// Format `amount` in `currency` using `locale` conventions.
///
/// Rounds half away from zero to at most `max_fraction_digits` digits and
/// drops trailing zeros, so `45000.0` with 2 digits renders as `₹45,000`.
/// Non-finite amounts render as zero.
pub fn format_amount(amount: f64, currency: &str, locale: &str, max_fraction_digits: u8) -> String {
    let style = style_for(locale);
    let digits = max_fraction_digits.min(MAX_FRACTION_DIGITS);
    let amount = if amount.is_finite() { amount } else { 0.0 };

    let factor = 10f64.powi(i32::from(digits));
    let scaled = (amount.abs() * factor).round();
    let factor_int = 10u128.pow(u32::from(digits));
    let scaled_int = scaled as u128;
    let whole = scaled_int / factor_int;
    let fraction = scaled_int % factor_int;
    let negative = amount < 0.0 && scaled_int > 0;

    let mut number = group_digits(&whole.to_string(), style.group, style.grouping);
    if digits > 0 && fraction > 0 {
        let frac = format!("{:0width$}", fraction, width = usize::from(digits));
        number.push_str(style.decimal);
        number.push_str(frac.trim_end_matches('0'));
    }

    let symbol = currency_info(currency)
        .map(|c| c.symbol.to_string())
        .unwrap_or_else(|| currency.trim().to_ascii_uppercase());
    let sign = if negative { "-" } else { "" };

    if style.symbol_after {
        format!("{sign}{number}{NBSP}{symbol}")
    } else if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        // Letter codes ("AED") get a separating space, glyphs ("$") do not.
        format!("{sign}{symbol}{NBSP}{number}")
    } else {
        format!("{sign}{symbol}{number}")
    }
}

fn group_digits(digits: &str, separator: &str, grouping: Grouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let step = match grouping {
        Grouping::Thousands => 3,
        Grouping::Indian => 2,
    };

    // Split `head` into groups of `step` from the right.
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    let mut out = groups.join(separator);
    out.push_str(separator);
    out.push_str(tail);
    out
}
