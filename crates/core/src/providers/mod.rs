pub mod registry;
pub mod traits;

// Remote implementations
pub mod exchangerate_api;
pub mod frankfurter;
pub mod geo_region;
