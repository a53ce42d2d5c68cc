pub mod currency;
pub mod pricing;
pub mod rates;
pub mod region;
pub mod settings;
