//! ShopDrop Storefront library.
//!
//! Registration, phone verification, sign-in, cart and checkout for the
//! ShopDrop marketplace. The binary in `main.rs` wires these into an axum
//! server; the CLI and the integration tests use the library directly.
//!
//! # Layout
//!
//! - [`services`] - The pipeline components, written against [`ports`]
//! - [`ports`] - Identity, phone challenge, profile store and payment traits
//!   plus in-memory adapters
//! - [`db`], [`firebase`] - Production adapters
//! - [`routes`], [`middleware`] - The JSON HTTP surface
//! - [`state`] - Composition root

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod firebase;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod ports;
pub mod routes;
pub mod services;
pub mod state;
