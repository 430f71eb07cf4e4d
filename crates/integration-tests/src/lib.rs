//! Integration tests for the marketplace cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - Cart behaviour through a running store
//! - `cart_persistence` - Restarting stores against the same storage
//!
//! This library only holds shared fixtures.

#![cfg_attr(not(test), forbid(unsafe_code))]

use marketplace_cart::{CartConfig, CartHandle, CartStore, KeyValueStore, NewLineItem};
use marketplace_core::{Price, ProductId};

/// A catalog product with a fixed title, image and a price of 10.
#[must_use]
pub fn product(id: &str) -> NewLineItem {
    NewLineItem {
        id: ProductId::new(id),
        title: "Shoe".to_owned(),
        image_url: "u".to_owned(),
        price: Price::from_cents(1000),
    }
}

/// Start a store on `storage` and wait for its load to finish.
///
/// # Panics
///
/// Panics if the store stops before it finishes loading.
pub async fn start<S: KeyValueStore>(storage: S) -> CartHandle {
    let handle = CartStore::new(storage, &CartConfig::default()).spawn();
    handle.loaded().await.expect("cart store failed to load");
    handle
}

/// `(id, quantity)` pairs of the handle's current cart, in order.
///
/// # Panics
///
/// Panics if the store is not running.
#[must_use]
pub fn quantities(handle: &CartHandle) -> Vec<(String, u32)> {
    let cart = handle.cart().expect("cart store is not running");
    cart.iter()
        .map(|item| (item.id.to_string(), item.quantity.get()))
        .collect()
}

/// Owned `(id, quantity)` pairs for comparing against [`quantities`].
#[must_use]
pub fn pairs(expected: &[(&str, u32)]) -> Vec<(String, u32)> {
    expected
        .iter()
        .map(|(id, quantity)| ((*id).to_owned(), *quantity))
        .collect()
}
