//! Core types for LocalStock.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod postal_code;
pub mod price;
pub mod product;
pub mod search;
pub mod status;

pub use id::ProductId;
pub use postal_code::{PostalCode, PostalCodeError};
pub use price::effective_price;
pub use product::Product;
pub use search::{SearchRequest, SearchRequestError};
pub use status::*;
