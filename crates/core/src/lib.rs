//! Marketplace Core - Shared types library.
//!
//! This crate provides common types used across all marketplace components:
//! - `cart` - Persistent shopping-cart store
//! - `cli` - Command-line front end for inspecting and editing the cart
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no async runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe product IDs, prices, and quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
