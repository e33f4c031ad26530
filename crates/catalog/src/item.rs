use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use classcart_core::{DomainError, DomainResult, ItemId, Price};

/// A bookable class with a limited number of spaces.
///
/// `remaining` is unsigned, so it can never go below zero; `reserve` refuses
/// to take more than is left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    id: ItemId,
    name: String,
    location: String,
    /// Display price, currency-prefixed (e.g. `"£150"`).
    price: String,
    remaining: u32,
    /// Quantity the catalog page is composing for the next add. UI state only.
    requested_quantity: u32,
    in_cart: bool,
}

impl CatalogItem {
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        location: impl Into<String>,
        price: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            location: location.into(),
            price: price.into(),
            remaining: capacity,
            requested_quantity: 1,
            in_cart: false,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    /// Parsed price.
    pub fn price_value(&self) -> DomainResult<Price> {
        Price::parse(&self.price)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn requested_quantity(&self) -> u32 {
        self.requested_quantity
    }

    pub fn in_cart(&self) -> bool {
        self.in_cart
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining == 0
    }

    /// Check that `quantity` spaces could be taken right now.
    pub fn check_available(&self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { requested: 0 });
        }
        if quantity > self.remaining {
            return Err(DomainError::InsufficientCapacity {
                item_id: self.id,
                requested: quantity,
                remaining: self.remaining,
            });
        }
        Ok(())
    }

    /// Take `quantity` spaces.
    pub fn reserve(&mut self, quantity: u32) -> DomainResult<()> {
        self.check_available(quantity)?;
        self.remaining -= quantity;
        Ok(())
    }

    /// Take up to `quantity` spaces without checking; stops at zero.
    ///
    /// For replaying decisions already validated by `check_available`.
    pub fn take_spaces(&mut self, quantity: u32) {
        self.remaining = self.remaining.saturating_sub(quantity);
    }

    /// Give `quantity` spaces back.
    pub fn release(&mut self, quantity: u32) {
        self.remaining = self.remaining.saturating_add(quantity);
    }

    pub fn set_requested_quantity(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { requested: 0 });
        }
        self.requested_quantity = quantity;
        Ok(())
    }

    pub fn reset_requested_quantity(&mut self) {
        self.requested_quantity = 1;
    }

    pub fn set_in_cart(&mut self, in_cart: bool) {
        self.in_cart = in_cart;
    }
}

/// The full set of catalog items, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate identifiers.
    pub fn new(items: Vec<CatalogItem>) -> DomainResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(DomainError::DuplicateItem(item.id));
            }
        }
        Ok(Self { items })
    }

    pub(crate) fn from_items_unchecked(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut CatalogItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Look up an item or fail with `UnknownItem`.
    pub fn require(&self, id: ItemId) -> DomainResult<&CatalogItem> {
        self.get(id).ok_or(DomainError::UnknownItem(id))
    }
}
