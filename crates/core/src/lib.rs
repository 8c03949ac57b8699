//! LocalStock Core - Shared types library.
//!
//! This crate provides common types used across all LocalStock components:
//! - `storefront` - Search service and retailer acquisition layer
//! - `cli` - Command-line tools for ad-hoc searches and signature debugging
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no caches. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - The unified product model, retailer identifiers, stock
//!   statuses, postal codes and validated search requests

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
