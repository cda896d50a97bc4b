//! Pythonia
//!
//! Booking ledger for a small serviced-apartment business: a product catalog,
//! a guest reward-points ledger, an order pricing engine and flat-file records.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod discounts;
pub mod draft;
pub mod engine;
pub mod fixtures;
pub mod guests;
pub mod logging;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod records;
