use serde::{Deserialize, Serialize};

use super::region::RegionCode;

/// The visitor's saved choices, as loaded from the preference store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedPreferences {
    /// Display currency picked by the visitor (e.g., "USD").
    pub currency: Option<String>,

    /// Region picked by the visitor, or adopted from their currency choice.
    pub region: Option<RegionCode>,
}
