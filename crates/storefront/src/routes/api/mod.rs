//! JSON API handlers.

pub mod bestbuy;
pub mod walmart;
