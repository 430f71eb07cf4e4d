//! Marketplace Cart - persistent shopping-cart store.
//!
//! Holds the line items a shopper has picked, keeps them in insertion order,
//! and mirrors every change to a single key-value record so the cart survives
//! application restarts.
//!
//! # Usage
//!
//! ```rust,no_run
//! use marketplace_cart::{CartConfig, CartStore, FileStore, NewLineItem};
//! use marketplace_core::{Price, ProductId};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartConfig::from_env()?;
//! let cart = CartStore::new(FileStore::new(&config.storage_dir), &config).spawn();
//! cart.loaded().await?;
//!
//! cart.add_to_cart(NewLineItem {
//!     id: ProductId::new("1"),
//!     title: "Shoe".to_owned(),
//!     image_url: "https://cdn.example.com/1.png".to_owned(),
//!     price: Price::from_cents(1000),
//! })
//! .await?;
//! cart.decrement(ProductId::new("1")).await?;
//!
//! cart.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`cart`] - Line items and the ordered cart collection
//! - [`store`] - The store task and the handle callers use
//! - [`storage`] - Key-value backends the record is persisted to
//! - [`snapshot`] - Encoding of the persisted record
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use cart::{AddOutcome, Cart, DecrementOutcome, LineItem, NewLineItem};
pub use config::{CartConfig, ConfigError};
pub use error::CartError;
pub use snapshot::DEFAULT_STORAGE_KEY;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{CartHandle, CartSnapshot, CartStore};
