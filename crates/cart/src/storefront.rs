use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use classcart_catalog::{Catalog, CatalogItem, CatalogQuery};
use classcart_core::{Aggregate, DomainError, DomainResult, ItemId, OrderId};
use classcart_events::Event;

use crate::cart::{Cart, CartEntry};
use crate::checkout::{CustomerForm, Order, validate_checkout};

/// Aggregate root: the catalog and the cart, kept mutually consistent.
///
/// For every catalog item, spaces held in the cart plus spaces remaining equal
/// the spaces the item started with, across any sequence of adds and removes.
/// A completed checkout clears the cart without giving spaces back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storefront {
    catalog: Catalog,
    cart: Cart,
    /// Customer details of the checkout currently in flight.
    pending_checkout: Option<CustomerForm>,
    last_order: Option<Order>,
    version: u64,
}

/// Cart entries that could not be re-applied when restoring a stored cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub dropped: Vec<CartEntry>,
    /// Entries kept although their item is no longer in the catalog.
    pub orphaned: Vec<ItemId>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.orphaned.is_empty()
    }
}

impl Storefront {
    /// Fresh storefront with an empty cart.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cart: Cart::new(),
            pending_checkout: None,
            last_order: None,
            version: 0,
        }
    }

    /// Rebuild a storefront from a freshly seeded catalog and a stored cart.
    ///
    /// Each stored entry takes its spaces from the catalog again. Entries that
    /// ask for more than the catalog can supply are dropped; entries whose item
    /// no longer exists are kept as they are, unless they hold no spaces or
    /// would overflow an earlier entry for the same id.
    pub fn restore(mut catalog: Catalog, stored: Cart) -> (Self, RestoreReport) {
        let mut report = RestoreReport::default();
        let mut cart = Cart::new();

        for entry in stored.entries().iter().cloned() {
            match catalog.get_mut(entry.id) {
                Some(item) => match item.reserve(entry.quantity) {
                    Ok(()) => {
                        item.set_in_cart(true);
                        cart.add(entry);
                    }
                    Err(_) => report.dropped.push(entry),
                },
                None if entry.quantity == 0 => report.dropped.push(entry),
                None => {
                    let id = entry.id;
                    match cart.try_add(entry) {
                        Ok(()) if !report.orphaned.contains(&id) => report.orphaned.push(id),
                        Ok(()) => {}
                        Err(entry) => report.dropped.push(entry),
                    }
                }
            }
        }

        let storefront = Self {
            catalog,
            cart,
            pending_checkout: None,
            last_order: None,
            version: 0,
        };
        (storefront, report)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn item(&self, id: ItemId) -> Option<&CatalogItem> {
        self.catalog.get(id)
    }

    pub fn total(&self) -> DomainResult<Decimal> {
        self.cart.total()
    }

    /// The catalog page's current view.
    pub fn view(&self, query: &CatalogQuery) -> DomainResult<Vec<CatalogItem>> {
        query.apply(self.catalog.items())
    }

    pub fn is_checkout_in_flight(&self) -> bool {
        self.pending_checkout.is_some()
    }

    pub fn last_order(&self) -> Option<&Order> {
        self.last_order.as_ref()
    }
}

/// Command: SetRequestedQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequestedQuantity {
    pub item_id: ItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddToCart.
///
/// Without an explicit quantity, the item's requested quantity is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    pub item_id: ItemId,
    pub quantity: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveFromCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromCart {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: BeginCheckout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginCheckout {
    pub customer: CustomerForm,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteCheckout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCheckout {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AbandonCheckout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonCheckout {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorefrontCommand {
    SetRequestedQuantity(SetRequestedQuantity),
    AddToCart(AddToCart),
    RemoveFromCart(RemoveFromCart),
    BeginCheckout(BeginCheckout),
    CompleteCheckout(CompleteCheckout),
    AbandonCheckout(AbandonCheckout),
}

impl StorefrontCommand {
    pub fn set_requested_quantity(item_id: ItemId, quantity: u32) -> Self {
        Self::SetRequestedQuantity(SetRequestedQuantity {
            item_id,
            quantity,
            occurred_at: Utc::now(),
        })
    }

    pub fn add_to_cart(item_id: ItemId, quantity: u32) -> Self {
        Self::AddToCart(AddToCart {
            item_id,
            quantity: Some(quantity),
            occurred_at: Utc::now(),
        })
    }

    /// Add using the quantity the catalog page composed for this item.
    pub fn add_requested(item_id: ItemId) -> Self {
        Self::AddToCart(AddToCart {
            item_id,
            quantity: None,
            occurred_at: Utc::now(),
        })
    }

    pub fn remove_from_cart(item_id: ItemId) -> Self {
        Self::RemoveFromCart(RemoveFromCart {
            item_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn begin_checkout(customer: CustomerForm) -> Self {
        Self::BeginCheckout(BeginCheckout {
            customer,
            occurred_at: Utc::now(),
        })
    }

    pub fn complete_checkout(order_id: OrderId) -> Self {
        Self::CompleteCheckout(CompleteCheckout {
            order_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn abandon_checkout() -> Self {
        Self::AbandonCheckout(AbandonCheckout {
            occurred_at: Utc::now(),
        })
    }
}

/// Event: RequestedQuantitySet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedQuantitySet {
    pub item_id: ItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAddedToCart. Carries the display snapshot so replay does not
/// depend on the catalog's current text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddedToCart {
    pub item_id: ItemId,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemovedFromCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemovedFromCart {
    pub item_id: ItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CheckoutStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutStarted {
    pub customer: CustomerForm,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order: Order,
}

/// Event: CheckoutAbandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAbandoned {
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorefrontEvent {
    RequestedQuantitySet(RequestedQuantitySet),
    ItemAddedToCart(ItemAddedToCart),
    ItemRemovedFromCart(ItemRemovedFromCart),
    CheckoutStarted(CheckoutStarted),
    OrderPlaced(OrderPlaced),
    CheckoutAbandoned(CheckoutAbandoned),
}

impl StorefrontEvent {
    /// Whether applying this event changes what must be stored under the cart key.
    pub fn touches_cart(&self) -> bool {
        matches!(
            self,
            StorefrontEvent::ItemAddedToCart(_) | StorefrontEvent::ItemRemovedFromCart(_)
        )
    }
}

impl Event for StorefrontEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StorefrontEvent::RequestedQuantitySet(_) => "catalog.item.quantity_requested",
            StorefrontEvent::ItemAddedToCart(_) => "cart.item_added",
            StorefrontEvent::ItemRemovedFromCart(_) => "cart.item_removed",
            StorefrontEvent::CheckoutStarted(_) => "checkout.started",
            StorefrontEvent::OrderPlaced(_) => "checkout.order_placed",
            StorefrontEvent::CheckoutAbandoned(_) => "checkout.abandoned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StorefrontEvent::RequestedQuantitySet(e) => e.occurred_at,
            StorefrontEvent::ItemAddedToCart(e) => e.occurred_at,
            StorefrontEvent::ItemRemovedFromCart(e) => e.occurred_at,
            StorefrontEvent::CheckoutStarted(e) => e.occurred_at,
            StorefrontEvent::OrderPlaced(e) => e.order.placed_at(),
            StorefrontEvent::CheckoutAbandoned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Storefront {
    type Command = StorefrontCommand;
    type Event = StorefrontEvent;
    type Error = DomainError;

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StorefrontEvent::RequestedQuantitySet(e) => {
                if let Some(item) = self.catalog.get_mut(e.item_id) {
                    // Zero never reaches an event; handle rejects it.
                    let _ = item.set_requested_quantity(e.quantity);
                }
            }
            StorefrontEvent::ItemAddedToCart(e) => {
                if let Some(item) = self.catalog.get_mut(e.item_id) {
                    item.take_spaces(e.quantity);
                    item.set_in_cart(true);
                    item.reset_requested_quantity();
                }
                self.cart.add(CartEntry {
                    id: e.item_id,
                    name: e.name.clone(),
                    price: e.price.clone(),
                    quantity: e.quantity,
                });
            }
            StorefrontEvent::ItemRemovedFromCart(e) => {
                self.cart.remove(e.item_id);
                if let Some(item) = self.catalog.get_mut(e.item_id) {
                    item.release(e.quantity);
                    item.set_in_cart(false);
                }
            }
            StorefrontEvent::CheckoutStarted(e) => {
                self.pending_checkout = Some(e.customer.clone());
            }
            StorefrontEvent::OrderPlaced(e) => {
                // Sold spaces stay sold; only the in-cart flags go back.
                for line in e.order.lines() {
                    if let Some(item) = self.catalog.get_mut(line.id) {
                        item.set_in_cart(false);
                    }
                }
                self.cart.clear();
                self.pending_checkout = None;
                self.last_order = Some(e.order.clone());
            }
            StorefrontEvent::CheckoutAbandoned(_) => {
                self.pending_checkout = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StorefrontCommand::SetRequestedQuantity(cmd) => self.handle_set_requested(cmd),
            StorefrontCommand::AddToCart(cmd) => self.handle_add(cmd),
            StorefrontCommand::RemoveFromCart(cmd) => self.handle_remove(cmd),
            StorefrontCommand::BeginCheckout(cmd) => self.handle_begin_checkout(cmd),
            StorefrontCommand::CompleteCheckout(cmd) => self.handle_complete_checkout(cmd),
            StorefrontCommand::AbandonCheckout(cmd) => self.handle_abandon_checkout(cmd),
        }
    }
}

impl Storefront {
    fn ensure_no_checkout_in_flight(&self) -> Result<(), DomainError> {
        if self.pending_checkout.is_some() {
            return Err(DomainError::CheckoutInProgress);
        }
        Ok(())
    }

    fn handle_set_requested(
        &self,
        cmd: &SetRequestedQuantity,
    ) -> Result<Vec<StorefrontEvent>, DomainError> {
        self.ensure_no_checkout_in_flight()?;
        self.catalog.require(cmd.item_id)?;
        if cmd.quantity == 0 {
            return Err(DomainError::InvalidQuantity { requested: 0 });
        }

        Ok(vec![StorefrontEvent::RequestedQuantitySet(
            RequestedQuantitySet {
                item_id: cmd.item_id,
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add(&self, cmd: &AddToCart) -> Result<Vec<StorefrontEvent>, DomainError> {
        self.ensure_no_checkout_in_flight()?;
        let item = self.catalog.require(cmd.item_id)?;
        let quantity = cmd.quantity.unwrap_or(item.requested_quantity());
        item.check_available(quantity)?;

        Ok(vec![StorefrontEvent::ItemAddedToCart(ItemAddedToCart {
            item_id: item.id(),
            name: item.name().to_string(),
            price: item.price().to_string(),
            quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveFromCart) -> Result<Vec<StorefrontEvent>, DomainError> {
        self.ensure_no_checkout_in_flight()?;
        let Some(entry) = self.cart.get(cmd.item_id) else {
            return Ok(vec![]);
        };

        Ok(vec![StorefrontEvent::ItemRemovedFromCart(
            ItemRemovedFromCart {
                item_id: entry.id,
                quantity: entry.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_begin_checkout(
        &self,
        cmd: &BeginCheckout,
    ) -> Result<Vec<StorefrontEvent>, DomainError> {
        self.ensure_no_checkout_in_flight()?;
        validate_checkout(&cmd.customer, &self.cart)?;
        // Surface bad price data before the customer waits on the delay.
        self.cart.total()?;

        Ok(vec![StorefrontEvent::CheckoutStarted(CheckoutStarted {
            customer: cmd.customer.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete_checkout(
        &self,
        cmd: &CompleteCheckout,
    ) -> Result<Vec<StorefrontEvent>, DomainError> {
        let Some(customer) = &self.pending_checkout else {
            return Err(DomainError::NoCheckoutInProgress);
        };
        let order = Order::place(cmd.order_id, customer.clone(), &self.cart, cmd.occurred_at)?;

        Ok(vec![StorefrontEvent::OrderPlaced(OrderPlaced { order })])
    }

    fn handle_abandon_checkout(
        &self,
        cmd: &AbandonCheckout,
    ) -> Result<Vec<StorefrontEvent>, DomainError> {
        if self.pending_checkout.is_none() {
            return Err(DomainError::NoCheckoutInProgress);
        }

        Ok(vec![StorefrontEvent::CheckoutAbandoned(CheckoutAbandoned {
            occurred_at: cmd.occurred_at,
        })])
    }
}
