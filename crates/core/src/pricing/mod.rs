pub mod currencies;
pub mod emergency;
pub mod table;
