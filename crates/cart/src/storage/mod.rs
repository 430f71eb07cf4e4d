//! Key-value persistence seam.
//!
//! The cart is stored as a single record under one key. Backends only need to
//! read and overwrite whole string values; they never see partial updates.
//!
//! - [`MemoryStore`] keeps records in process memory (tests, ephemeral sessions)
//! - [`FileStore`] keeps one file per key under a data directory

mod file;
mod memory;

use std::future::Future;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend cannot serve requests at all.
    ///
    /// The shipped backends never return this; it is for implementations
    /// outside this crate whose failures are not I/O errors (a remote
    /// service that is offline, a closed connection pool).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string records addressed by key.
///
/// `set` replaces the whole value stored under `key`.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`, or `None` if nothing was stored.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), StorageError>> + Send;
}
