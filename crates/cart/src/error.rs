//! Cart error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the cart API.
///
/// Cart mutations only ever fail with [`CartError::Uninitialized`]; storage
/// and codec failures during load and persist are logged by the store and
/// never reach callers. The remaining variants come from the explicit snapshot
/// helpers in [`crate::snapshot`].
#[derive(Debug, Error)]
pub enum CartError {
    /// The handle's store is not running (never started or already shut down).
    #[error("cart must be used within an active CartStore")]
    Uninitialized,

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The persisted record is not a valid cart.
    #[error("failed to decode persisted cart: {0}")]
    Decode(#[source] serde_json::Error),

    /// The cart could not be encoded for storage.
    #[error("failed to encode cart snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
