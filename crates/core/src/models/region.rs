use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A two-letter country code, always stored uppercase (e.g., "IN", "US").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    /// Validate and normalize a region code. Surrounding whitespace is ignored.
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        let trimmed = code.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::InvalidRegion(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(code: RegionCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for RegionCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The visitor's region as far as we could tell.
///
/// `Unknown` is a normal steady state, not an error: it selects the
/// markup policy for non-home visitors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Region {
    Known(RegionCode),
    #[default]
    Unknown,
}

impl Region {
    pub fn code(&self) -> Option<&RegionCode> {
        match self {
            Region::Known(code) => Some(code),
            Region::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Region::Known(_))
    }

    /// True only for a known region equal to `home`.
    pub fn is_home(&self, home: &RegionCode) -> bool {
        self.code() == Some(home)
    }
}

impl From<RegionCode> for Region {
    fn from(code: RegionCode) -> Self {
        Region::Known(code)
    }
}

impl From<Option<RegionCode>> for Region {
    fn from(code: Option<RegionCode>) -> Self {
        code.map_or(Region::Unknown, Region::Known)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Known(code) => write!(f, "{code}"),
            Region::Unknown => write!(f, "unknown"),
        }
    }
}

/// Which step of the detection chain produced a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionSource {
    /// Saved preference; no network call was made.
    Saved,
    /// Server-side lookup of edge geolocation headers.
    Geolocation,
    /// Nothing produced a region.
    Unknown,
}

/// Result of running the region detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDetection {
    pub region: Region,
    pub source: RegionSource,
}

impl RegionDetection {
    pub fn unknown() -> Self {
        Self {
            region: Region::Unknown,
            source: RegionSource::Unknown,
        }
    }
}
