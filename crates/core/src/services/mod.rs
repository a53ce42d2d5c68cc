pub mod currency_service;
pub mod rate_service;
pub mod region_service;
