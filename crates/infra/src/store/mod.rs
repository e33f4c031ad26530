//! Key-value persistence for the cart and the last order.
//!
//! The storefront never reads a value back into a live mutation: it writes
//! the full cart after every change and reads it once on startup. A store
//! therefore only needs whole-value get/put/remove under a few fixed keys.

mod file;
mod in_memory;

pub use file::FileStore;
pub use in_memory::InMemoryStore;

use std::sync::Arc;

use thiserror::Error;

/// Key holding the serialized cart (a JSON array of entries).
pub const CART_KEY: &str = "classCart";

/// Key holding the most recently placed order (a JSON object).
pub const LAST_ORDER_KEY: &str = "lastOrder";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached (IO error, poisoned lock, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A value was present but could not be decoded.
    #[error("stored value under {key:?} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// A value could not be encoded for writing.
    #[error("could not encode value for {key:?}: {reason}")]
    Encode { key: String, reason: String },
}

/// Whole-value string store keyed by fixed names.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the value under `key`.
    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove `key`; removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}
