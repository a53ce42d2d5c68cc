use thiserror::Error;

/// Unified error type for the entire travel-pricing-core library.
///
/// Providers and stores return `Result<T, CoreError>`. The services turn
/// most of these into a fallback step; only configuration loading and the
/// explicit setters on `PricingContext` hand them back to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Storage ─────────────────────────────────────────────────────
    #[error("Storage unavailable: {0}")]
    Storage(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Validation ──────────────────────────────────────────────────
    #[error("Invalid currency code '{0}': must be exactly 3 ASCII letters")]
    InvalidCurrency(String),

    #[error("Invalid region code '{0}': must be exactly 2 ASCII letters")]
    InvalidRegion(String),

    #[error("No exchange rate known for currency: {0}")]
    UnknownCurrency(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; keep query strings out of logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
