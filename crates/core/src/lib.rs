//! ShopDrop Core - Shared domain types.
//!
//! This crate provides the value types shared by all ShopDrop components:
//! - `storefront` - Registration, verification, cart and checkout services
//! - `cli` - Command-line tools for migrations and account inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Validation happens at construction time so that a value
//! of one of these types is always well-formed.
//!
//! # Modules
//!
//! - [`types`] - Emails, phone numbers, string-backed IDs, prices and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
