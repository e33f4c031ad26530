use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use classcart_catalog::CatalogItem;
use classcart_core::{DomainError, DomainResult, ItemId, Price};

/// A chosen quantity of one catalog item, with the item's display fields
/// copied at the time it was first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub id: ItemId,
    pub name: String,
    /// Display price, currency-prefixed.
    pub price: String,
    pub quantity: u32,
}

impl CartEntry {
    pub fn snapshot(item: &CatalogItem, quantity: u32) -> Self {
        Self {
            id: item.id(),
            name: item.name().to_string(),
            price: item.price().to_string(),
            quantity,
        }
    }

    pub fn line_total(&self) -> DomainResult<Decimal> {
        Price::parse(&self.price)?.times(self.quantity)
    }
}

/// Sum of `price × quantity` over `entries`.
///
/// The first unparsable price or overflowing sum aborts the whole computation.
pub fn compute_total(entries: &[CartEntry]) -> DomainResult<Decimal> {
    entries.iter().try_fold(Decimal::ZERO, |acc, entry| {
        acc.checked_add(entry.line_total()?)
            .ok_or(DomainError::AmountOverflow)
    })
}

/// Ordered cart, at most one entry per catalog item.
///
/// Serialized as a bare JSON array of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from raw entries, merging duplicates into the first
    /// occurrence. Zero-quantity entries and merges that would overflow the
    /// quantity are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = CartEntry>) -> Self {
        let mut cart = Self::new();
        for entry in entries {
            if entry.quantity > 0 {
                let _ = cart.try_add(entry);
            }
        }
        cart
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn get(&self, id: ItemId) -> Option<&CartEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quantity held for `id` (zero when absent).
    pub fn quantity_of(&self, id: ItemId) -> u32 {
        self.get(id).map_or(0, |entry| entry.quantity)
    }

    /// Total number of spaces across all entries (the cart badge).
    pub fn total_quantity(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |sum, entry| sum.saturating_add(entry.quantity))
    }

    pub fn total(&self) -> DomainResult<Decimal> {
        compute_total(&self.entries)
    }

    /// Merge `entry` into an existing entry for the same item, or append it.
    ///
    /// Callers have already bounded the quantity by the item's capacity; a
    /// merge past `u32::MAX` saturates.
    pub fn add(&mut self, entry: CartEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(entry.quantity),
            None => self.entries.push(entry),
        }
    }

    /// Like [`Cart::add`], but hands `entry` back instead of overflowing.
    pub fn try_add(&mut self, entry: CartEntry) -> Result<(), CartEntry> {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => match existing.quantity.checked_add(entry.quantity) {
                Some(quantity) => {
                    existing.quantity = quantity;
                    Ok(())
                }
                None => Err(entry),
            },
            None => {
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, id: ItemId) -> Option<CartEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
