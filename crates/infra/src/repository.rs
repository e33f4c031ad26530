//! Typed access to the stored cart and last order.

use serde::Serialize;
use serde::de::DeserializeOwned;

use classcart_cart::{Cart, Order};

use crate::store::{CART_KEY, KeyValueStore, LAST_ORDER_KEY, StoreError};

/// JSON (de)serialization on top of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CartRepository<S> {
    store: S,
}

impl<S> CartRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> CartRepository<S> {
    /// Read the stored cart.
    ///
    /// Never fails: an unreachable store or an undecodable value is logged and
    /// treated as an empty cart.
    pub fn load_cart(&self) -> Cart {
        match self.read::<Cart>(CART_KEY) {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::new(),
            Err(err) => {
                tracing::warn!(key = CART_KEY, error = %err, "stored cart unusable; starting empty");
                Cart::new()
            }
        }
    }

    pub fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.write(CART_KEY, cart)
    }

    pub fn clear_cart(&self) -> Result<(), StoreError> {
        self.store.remove(CART_KEY)
    }

    pub fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.write(LAST_ORDER_KEY, order)
    }

    pub fn load_last_order(&self) -> Result<Option<Order>, StoreError> {
        self.read(LAST_ORDER_KEY)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.put(key, raw)
    }
}
