//! Command execution pipeline for the storefront.
//!
//! ```text
//! StorefrontCommand
//!   ↓
//! 1. Handle (pure decision, produces events or a DomainError)
//!   ↓
//! 2. Write the order record, if an order is being placed
//!   ↓
//! 3. Apply events to the in-memory storefront
//!   ↓
//! 4. Persist the cart (full overwrite, or key removal after checkout)
//!   ↓
//! 5. Publish enveloped events to subscribers
//! ```
//!
//! The order record is written before the events are applied so a failed
//! write leaves the cart intact. Cart writes happen after the in-memory change
//! they reflect; a failed cart write is reported but the change stands.

use thiserror::Error;

use classcart_cart::{CustomerForm, Order, Storefront, StorefrontCommand, StorefrontEvent};
use classcart_catalog::Catalog;
use classcart_core::{Aggregate, DomainError, OrderId};
use classcart_events::{EventBus, EventEnvelope, Subscription};

use crate::repository::CartRepository;
use crate::store::{KeyValueStore, StoreError};

/// What subscribers receive.
pub type StorefrontEnvelope = EventEnvelope<StorefrontEvent>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command was rejected; nothing changed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The change happened in memory but could not be saved.
    #[error("change could not be saved: {0}")]
    Store(#[from] StoreError),

    /// The change happened and was saved, but observers were not notified.
    #[error("event publication failed: {0}")]
    Publish(String),

    /// The order was placed and saved, but the stored cart is still present
    /// and will come back on the next start.
    #[error("order {} placed but the saved cart could not be cleared: {source}", .order.id())]
    CartNotCleared {
        order: Box<Order>,
        source: StoreError,
    },
}

impl DispatchError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            DispatchError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// The order that was placed despite this error, if any.
    pub fn placed_order(&self) -> Option<&Order> {
        match self {
            DispatchError::CartNotCleared { order, .. } => Some(order.as_ref()),
            _ => None,
        }
    }
}

/// Owns the storefront state and drives every mutation through one path.
#[derive(Debug)]
pub struct StorefrontDispatcher<S, B> {
    state: Storefront,
    repository: CartRepository<S>,
    bus: B,
}

impl<S, B> StorefrontDispatcher<S, B> {
    pub fn state(&self) -> &Storefront {
        &self.state
    }

    pub fn repository(&self) -> &CartRepository<S> {
        &self.repository
    }
}

impl<S, B> StorefrontDispatcher<S, B>
where
    S: KeyValueStore,
    B: EventBus<StorefrontEnvelope>,
{
    /// Start from `catalog` and whatever cart the store holds.
    pub fn open(catalog: Catalog, store: S, bus: B) -> Self {
        let repository = CartRepository::new(store);
        let stored = repository.load_cart();
        let (state, report) = Storefront::restore(catalog, stored);

        for entry in &report.dropped {
            tracing::warn!(
                item_id = %entry.id,
                quantity = entry.quantity,
                "stored cart entry could not be restored; dropped"
            );
        }
        for item_id in &report.orphaned {
            tracing::warn!(%item_id, "stored cart entry refers to an item not in the catalog");
        }
        if !report.dropped.is_empty() {
            if let Err(err) = repository.save_cart(state.cart()) {
                tracing::warn!(error = %err, "could not save reconciled cart");
            }
        }

        tracing::info!(
            items = state.catalog().len(),
            cart_entries = state.cart().len(),
            reconciled = !report.is_clean(),
            "storefront opened"
        );

        Self {
            state,
            repository,
            bus,
        }
    }

    pub fn subscribe(&self) -> Subscription<StorefrontEnvelope> {
        self.bus.subscribe()
    }

    /// Run one command through the full pipeline.
    ///
    /// Returns the applied events; an empty vector means the command was a
    /// no-op (e.g. removing an entry that is not in the cart).
    pub fn dispatch(
        &mut self,
        command: StorefrontCommand,
    ) -> Result<Vec<StorefrontEvent>, DispatchError> {
        let decided = match self.state.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                tracing::debug!(error = %err, ?command, "command rejected");
                return Err(err.into());
            }
        };
        if decided.is_empty() {
            return Ok(decided);
        }

        if let Some(order) = placed_order(&decided) {
            self.repository.save_order(order).map_err(|err| {
                tracing::error!(order_id = %order.id(), error = %err, "could not save order");
                err
            })?;
        }

        let mut envelopes = Vec::with_capacity(decided.len());
        for event in &decided {
            self.state.apply(event);
            envelopes.push(EventEnvelope::wrap(self.state.version(), event.clone()));
        }

        let persisted = self.persist(&decided);
        let published = self.publish(envelopes);
        persisted?;
        published?;

        Ok(decided)
    }

    /// Validate the form and cart and mark a checkout as in flight.
    pub fn begin_checkout(&mut self, customer: CustomerForm) -> Result<(), DispatchError> {
        self.dispatch(StorefrontCommand::begin_checkout(customer))?;
        tracing::info!(
            cart_entries = self.state.cart().len(),
            "checkout started"
        );
        Ok(())
    }

    /// Place the order for the checkout in flight.
    ///
    /// If the order could not be placed the checkout is abandoned, leaving the
    /// cart as it was. Once the order is saved it is always handed back: a
    /// failed announcement is only logged, and a stored cart that cannot be
    /// removed even on retry is reported as [`DispatchError::CartNotCleared`].
    pub fn complete_checkout(&mut self, order_id: OrderId) -> Result<Order, DispatchError> {
        let result = self.dispatch(StorefrontCommand::complete_checkout(order_id));

        let placed = self
            .state
            .last_order()
            .filter(|order| order.id() == order_id)
            .cloned();
        let Some(order) = placed else {
            self.abandon_in_flight();
            return Err(match result {
                Err(err) => err,
                Ok(_) => DispatchError::Domain(DomainError::NoCheckoutInProgress),
            });
        };

        match result {
            Ok(_) => {}
            Err(DispatchError::Store(err)) => {
                tracing::warn!(order_id = %order.id(), error = %err, "retrying removal of the saved cart");
                if let Err(source) = self.repository.clear_cart() {
                    tracing::error!(order_id = %order.id(), error = %source, "saved cart could not be cleared");
                    return Err(DispatchError::CartNotCleared {
                        order: Box::new(order),
                        source,
                    });
                }
            }
            Err(err) => {
                tracing::warn!(order_id = %order.id(), error = %err, "order placed but not announced");
            }
        }

        tracing::info!(order_id = %order.id(), total = %order.total(), "order placed");
        Ok(order)
    }

    /// Begin and complete a checkout with no delay in between.
    pub fn checkout(&mut self, customer: CustomerForm) -> Result<Order, DispatchError> {
        self.begin_checkout(customer)?;
        self.complete_checkout(OrderId::new())
    }

    /// Abandon the checkout in flight, if any. Failures are logged.
    pub fn abandon_in_flight(&mut self) {
        if !self.state.is_checkout_in_flight() {
            return;
        }
        if let Err(err) = self.dispatch(StorefrontCommand::abandon_checkout()) {
            tracing::warn!(error = %err, "could not abandon checkout");
        }
    }

    fn persist(&self, events: &[StorefrontEvent]) -> Result<(), StoreError> {
        if placed_order(events).is_some() {
            return self.repository.clear_cart();
        }
        if events.iter().any(StorefrontEvent::touches_cart) {
            return self.repository.save_cart(self.state.cart());
        }
        Ok(())
    }

    fn publish(&self, envelopes: Vec<StorefrontEnvelope>) -> Result<(), DispatchError> {
        for envelope in envelopes {
            self.bus
                .publish(envelope)
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}

fn placed_order(events: &[StorefrontEvent]) -> Option<&Order> {
    events.iter().find_map(|event| match event {
        StorefrontEvent::OrderPlaced(placed) => Some(&placed.order),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use rust_decimal::Decimal;

    use classcart_cart::{Cart, CartEntry};
    use classcart_catalog::CatalogItem;
    use classcart_core::{FormField, ItemId, ValidationFailure};
    use classcart_events::InMemoryEventBus;

    use super::*;
    use crate::store::{CART_KEY, InMemoryStore, LAST_ORDER_KEY};

    /// Store whose writes can be switched off, per key.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        /// Number of upcoming cart writes that fail.
        cart_failures: AtomicU32,
        fail_order: AtomicBool,
    }

    impl FlakyStore {
        fn failing(&self, key: &str) -> bool {
            match key {
                CART_KEY => self
                    .cart_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok(),
                LAST_ORDER_KEY => self.fail_order.load(Ordering::SeqCst),
                _ => false,
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
            if self.failing(key) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.put(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            if self.failing(key) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.remove(key)
        }
    }

    type TestDispatcher = StorefrontDispatcher<Arc<FlakyStore>, InMemoryEventBus<StorefrontEnvelope>>;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogItem::new(ItemId::new(1), "Creative Writing", "Oxford", "£88.99", 5),
            CatalogItem::new(
                ItemId::new(2),
                "Python Programming",
                "Liverpool",
                "£150",
                3,
            ),
        ])
        .unwrap()
    }

    fn form() -> CustomerForm {
        CustomerForm {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.org".to_string(),
            phone: "07700 900123".to_string(),
            address: "12 Analytical Row, London".to_string(),
        }
    }

    fn open(store: &Arc<FlakyStore>) -> TestDispatcher {
        StorefrontDispatcher::open(catalog(), Arc::clone(store), InMemoryEventBus::new())
    }

    fn stored_cart(store: &FlakyStore) -> Option<Cart> {
        store
            .get(CART_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn every_cart_mutation_is_written_through() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        let id = ItemId::new(1);

        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(id, 2))
            .unwrap();
        assert_eq!(stored_cart(&store).unwrap().quantity_of(id), 2);

        dispatcher
            .dispatch(StorefrontCommand::remove_from_cart(id))
            .unwrap();
        assert!(stored_cart(&store).unwrap().is_empty());
    }

    #[test]
    fn reopening_restores_cart_and_spaces() {
        let store = Arc::new(FlakyStore::default());
        let mut first = open(&store);
        first
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(2), 2))
            .unwrap();
        drop(first);

        let second = open(&store);
        let item = second.state().item(ItemId::new(2)).unwrap();
        assert_eq!(item.remaining(), 1);
        assert!(item.in_cart());
        assert_eq!(second.state().cart().quantity_of(ItemId::new(2)), 2);
    }

    #[test]
    fn reopening_drops_entries_beyond_capacity_and_saves_the_result() {
        let store = Arc::new(FlakyStore::default());
        let oversized = Cart::from_entries(vec![CartEntry {
            id: ItemId::new(2),
            name: "Python Programming".to_string(),
            price: "£150".to_string(),
            quantity: 9,
        }]);
        store
            .put(CART_KEY, serde_json::to_string(&oversized).unwrap())
            .unwrap();

        let dispatcher = open(&store);
        assert!(dispatcher.state().cart().is_empty());
        assert!(stored_cart(&store).unwrap().is_empty());
    }

    #[test]
    fn corrupt_stored_cart_opens_empty() {
        let store = Arc::new(FlakyStore::default());
        store.put(CART_KEY, "][".to_string()).unwrap();
        let dispatcher = open(&store);
        assert!(dispatcher.state().cart().is_empty());
    }

    #[test]
    fn rejected_command_writes_nothing() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);

        let err = dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(2), 4))
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(DomainError::InsufficientCapacity { .. })
        ));
        assert!(stored_cart(&store).is_none());
    }

    #[test]
    fn failed_cart_write_is_reported_but_change_stands() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        let sub = dispatcher.subscribe();
        store.cart_failures.store(u32::MAX, Ordering::SeqCst);

        let err = dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(1), 1))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Store(StoreError::Unavailable(_))));
        assert_eq!(dispatcher.state().cart().quantity_of(ItemId::new(1)), 1);
        assert_eq!(sub.drain().len(), 1);
    }

    #[test]
    fn checkout_saves_order_clears_cart_and_keeps_spaces_sold() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        let id = ItemId::new(1);
        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(id, 2))
            .unwrap();

        let order = dispatcher.checkout(form()).unwrap();

        assert_eq!(order.total(), Decimal::new(17798, 2));
        assert!(store.get(CART_KEY).unwrap().is_none());
        assert_eq!(
            dispatcher.repository().load_last_order().unwrap(),
            Some(order.clone())
        );
        assert!(dispatcher.state().cart().is_empty());
        assert_eq!(dispatcher.state().item(id).unwrap().remaining(), 3);
        assert_eq!(dispatcher.state().last_order(), Some(&order));
    }

    #[test]
    fn failed_order_write_abandons_checkout_with_cart_intact() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        let id = ItemId::new(1);
        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(id, 2))
            .unwrap();
        store.fail_order.store(true, Ordering::SeqCst);

        let err = dispatcher.checkout(form()).unwrap_err();

        assert!(matches!(err, DispatchError::Store(_)));
        assert!(!dispatcher.state().is_checkout_in_flight());
        assert_eq!(dispatcher.state().cart().quantity_of(id), 2);
        assert_eq!(stored_cart(&store).unwrap().quantity_of(id), 2);

        store.fail_order.store(false, Ordering::SeqCst);
        assert!(dispatcher.checkout(form()).is_ok());
    }

    #[test]
    fn transient_cart_removal_failure_is_retried() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(1), 1))
            .unwrap();
        store.cart_failures.store(1, Ordering::SeqCst);

        let order = dispatcher.checkout(form()).unwrap();

        assert!(store.get(CART_KEY).unwrap().is_none());
        assert_eq!(dispatcher.state().last_order(), Some(&order));
    }

    #[test]
    fn stuck_cart_removal_still_hands_back_the_order() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(1), 1))
            .unwrap();
        store.cart_failures.store(u32::MAX, Ordering::SeqCst);

        let err = dispatcher.checkout(form()).unwrap_err();

        let order = err.placed_order().cloned().unwrap();
        assert!(matches!(err, DispatchError::CartNotCleared { .. }));
        assert!(err.to_string().contains(&order.id().to_string()));
        assert_eq!(
            dispatcher.repository().load_last_order().unwrap(),
            Some(order)
        );
        assert!(dispatcher.state().cart().is_empty());
        assert!(!dispatcher.state().is_checkout_in_flight());
    }

    #[test]
    fn invalid_form_aborts_checkout() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(1), 1))
            .unwrap();

        let err = dispatcher
            .checkout(CustomerForm {
                email: String::new(),
                ..form()
            })
            .unwrap_err();

        assert_eq!(
            err.domain(),
            Some(&DomainError::Validation(
                vec![ValidationFailure::MissingField(FormField::Email)].into()
            ))
        );
        assert!(!dispatcher.state().is_checkout_in_flight());
        assert_eq!(dispatcher.state().cart().len(), 1);
        assert!(store.get(LAST_ORDER_KEY).unwrap().is_none());
    }

    #[test]
    fn subscribers_see_sequenced_envelopes() {
        let store = Arc::new(FlakyStore::default());
        let mut dispatcher = open(&store);
        let sub = dispatcher.subscribe();

        dispatcher
            .dispatch(StorefrontCommand::add_to_cart(ItemId::new(1), 1))
            .unwrap();
        dispatcher
            .dispatch(StorefrontCommand::remove_from_cart(ItemId::new(1)))
            .unwrap();
        dispatcher
            .dispatch(StorefrontCommand::remove_from_cart(ItemId::new(1)))
            .unwrap();

        let received = sub.drain();
        let seqs: Vec<u64> = received.iter().map(|e| e.sequence_number()).collect();
        let types: Vec<&str> = received.iter().map(|e| e.event_type()).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(types, vec!["cart.item_added", "cart.item_removed"]);
        assert!(received.iter().all(|e| e.schema_version() == 1));
        assert!(matches!(
            received[0].payload(),
            StorefrontEvent::ItemAddedToCart(added) if added.item_id == ItemId::new(1)
        ));
        assert!(received[0].occurred_at() <= received[1].occurred_at());
        assert_ne!(received[0].event_id(), received[1].event_id());
    }
}
