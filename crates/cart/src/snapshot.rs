//! Reading and writing the persisted cart record.
//!
//! The record is a JSON array of line items stored under a single key. Every
//! write replaces the whole array.

use tracing::instrument;

use crate::cart::{Cart, LineItem};
use crate::error::{CartError, Result};
use crate::storage::KeyValueStore;

/// Storage key the cart has always been persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketplace:products";

/// Decode a stored record into its line items, without normalizing them.
///
/// # Errors
///
/// Returns [`CartError::Decode`] if `raw` is not a JSON array of line items.
pub fn decode(raw: &str) -> Result<Vec<LineItem>> {
    serde_json::from_str(raw).map_err(CartError::Decode)
}

/// Encode a cart as a stored record.
///
/// # Errors
///
/// Returns [`CartError::Encode`] if serialization fails.
pub fn encode(cart: &Cart) -> Result<String> {
    serde_json::to_string(cart).map_err(CartError::Encode)
}

/// Read the record stored under `key`.
///
/// Returns `Ok(None)` when nothing has been stored yet.
///
/// # Errors
///
/// Returns an error if the backend fails or the record cannot be decoded.
#[instrument(skip(storage))]
pub async fn read_snapshot<S: KeyValueStore>(storage: &S, key: &str) -> Result<Option<Vec<LineItem>>> {
    match storage.get(key).await? {
        Some(raw) => decode(&raw).map(Some),
        None => Ok(None),
    }
}

/// Overwrite the record stored under `key` with `cart`.
///
/// # Errors
///
/// Returns an error if encoding or the backend write fails.
#[instrument(skip(storage, cart), fields(items = cart.len()))]
pub async fn write_snapshot<S: KeyValueStore>(storage: &S, key: &str, cart: &Cart) -> Result<()> {
    let raw = encode(cart)?;
    storage.set(key, raw).await?;
    Ok(())
}
