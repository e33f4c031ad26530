//! Shared, async handle over a [`StorefrontDispatcher`].
//!
//! Checkout simulates a slow payment round-trip. The dispatcher lock is only
//! held while a command runs, never across the delay, so other callers can
//! keep reading while a checkout is in flight. Cart-changing commands issued
//! during the delay are rejected with `CheckoutInProgress`.
//!
//! A checkout future dropped before it completes (a timeout, a cancelled UI
//! task) abandons its checkout, so the storefront never stays locked.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use classcart_cart::{CustomerForm, Order, Storefront, StorefrontCommand, StorefrontEvent};
use classcart_core::{ItemId, OrderId};
use classcart_events::{EventBus, Subscription};

use crate::dispatcher::{DispatchError, StorefrontDispatcher, StorefrontEnvelope};
use crate::store::KeyValueStore;

#[derive(Debug)]
pub struct StorefrontSession<S, B> {
    dispatcher: Arc<Mutex<StorefrontDispatcher<S, B>>>,
    checkout_delay: Duration,
}

impl<S, B> Clone for StorefrontSession<S, B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            checkout_delay: self.checkout_delay,
        }
    }
}

impl<S, B> StorefrontSession<S, B>
where
    S: KeyValueStore + 'static,
    B: EventBus<StorefrontEnvelope> + 'static,
{
    pub fn new(dispatcher: StorefrontDispatcher<S, B>, checkout_delay: Duration) -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            checkout_delay,
        }
    }

    pub async fn dispatch(
        &self,
        command: StorefrontCommand,
    ) -> Result<Vec<StorefrontEvent>, DispatchError> {
        self.dispatcher.lock().await.dispatch(command)
    }

    pub async fn set_requested_quantity(
        &self,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<(), DispatchError> {
        self.dispatch(StorefrontCommand::set_requested_quantity(item_id, quantity))
            .await
            .map(drop)
    }

    /// Add the item's currently requested quantity.
    pub async fn add_to_cart(&self, item_id: ItemId) -> Result<(), DispatchError> {
        self.dispatch(StorefrontCommand::add_requested(item_id))
            .await
            .map(drop)
    }

    pub async fn remove_from_cart(&self, item_id: ItemId) -> Result<(), DispatchError> {
        self.dispatch(StorefrontCommand::remove_from_cart(item_id))
            .await
            .map(drop)
    }

    /// Run `f` against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&Storefront) -> R) -> R {
        f(self.dispatcher.lock().await.state())
    }

    pub async fn snapshot(&self) -> Storefront {
        self.read(Storefront::clone).await
    }

    pub async fn subscribe(&self) -> Subscription<StorefrontEnvelope> {
        self.dispatcher.lock().await.subscribe()
    }

    /// Validate, wait out the payment delay, then place the order.
    pub async fn checkout(&self, customer: CustomerForm) -> Result<Order, DispatchError> {
        self.dispatcher.lock().await.begin_checkout(customer)?;
        let mut pending = AbandonOnDrop {
            dispatcher: Some(Arc::clone(&self.dispatcher)),
        };

        tracing::debug!(
            delay_ms = self.checkout_delay.as_millis() as u64,
            "waiting for payment"
        );
        tokio::time::sleep(self.checkout_delay).await;

        let mut dispatcher = self.dispatcher.lock().await;
        pending.disarm();
        dispatcher.complete_checkout(OrderId::new())
    }
}

/// Abandons the checkout in flight when dropped while still armed.
struct AbandonOnDrop<S, B>
where
    S: KeyValueStore + 'static,
    B: EventBus<StorefrontEnvelope> + 'static,
{
    dispatcher: Option<Arc<Mutex<StorefrontDispatcher<S, B>>>>,
}

impl<S, B> AbandonOnDrop<S, B>
where
    S: KeyValueStore + 'static,
    B: EventBus<StorefrontEnvelope> + 'static,
{
    fn disarm(&mut self) {
        self.dispatcher = None;
    }
}

impl<S, B> Drop for AbandonOnDrop<S, B>
where
    S: KeyValueStore + 'static,
    B: EventBus<StorefrontEnvelope> + 'static,
{
    fn drop(&mut self) {
        let Some(dispatcher) = self.dispatcher.take() else {
            return;
        };
        tracing::warn!("checkout cancelled before completion; abandoning it");

        if let Ok(mut locked) = dispatcher.try_lock() {
            locked.abandon_in_flight();
            return;
        }
        // Someone else holds the lock; finish the cleanup once they let go.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    dispatcher.lock().await.abandon_in_flight();
                });
            }
            Err(_) => tracing::error!("no async runtime left to abandon the checkout on"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use classcart_catalog::seed_catalog;
    use classcart_core::DomainError;
    use classcart_events::InMemoryEventBus;

    use super::*;
    use crate::store::InMemoryStore;

    type TestSession = StorefrontSession<InMemoryStore, InMemoryEventBus<StorefrontEnvelope>>;

    fn session(delay_ms: u64) -> TestSession {
        let dispatcher =
            StorefrontDispatcher::open(seed_catalog(), InMemoryStore::new(), InMemoryEventBus::new());
        StorefrontSession::new(dispatcher, Duration::from_millis(delay_ms))
    }

    fn form() -> CustomerForm {
        CustomerForm {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: "0117 496 0000".to_string(),
            address: "1 Compiler Way, Bristol".to_string(),
        }
    }

    #[tokio::test]
    async fn checkout_places_order_for_two_creative_writing_spaces() {
        let session = session(1);
        let id = ItemId::new(6);
        session.set_requested_quantity(id, 2).await.unwrap();
        session.add_to_cart(id).await.unwrap();

        let order = session.checkout(form()).await.unwrap();

        assert_eq!(order.total(), Decimal::new(17798, 2));
        let state = session.snapshot().await;
        assert!(state.cart().is_empty());
        assert_eq!(state.item(id).unwrap().remaining(), 3);
        assert!(!state.item(id).unwrap().in_cart());
    }

    #[tokio::test]
    async fn second_checkout_during_delay_is_rejected() {
        let session = session(50);
        session.add_to_cart(ItemId::new(1)).await.unwrap();

        let other = session.clone();
        let (first, second) = tokio::join!(session.checkout(form()), other.checkout(form()));

        assert!(first.is_ok());
        assert_eq!(
            second.unwrap_err().domain(),
            Some(&DomainError::CheckoutInProgress)
        );
    }

    #[tokio::test]
    async fn cart_changes_during_delay_are_rejected() {
        let session = session(50);
        session.add_to_cart(ItemId::new(2)).await.unwrap();

        let other = session.clone();
        let (order, removal) = tokio::join!(session.checkout(form()), async move {
            tokio::task::yield_now().await;
            other.remove_from_cart(ItemId::new(2)).await
        });

        assert_eq!(order.unwrap().lines().len(), 1);
        assert_eq!(
            removal.unwrap_err().domain(),
            Some(&DomainError::CheckoutInProgress)
        );
    }

    #[tokio::test]
    async fn reads_are_not_blocked_by_the_delay() {
        let session = session(50);
        session.add_to_cart(ItemId::new(1)).await.unwrap();

        let reader = session.clone();
        let (order, in_flight) = tokio::join!(session.checkout(form()), async move {
            tokio::task::yield_now().await;
            reader.read(Storefront::is_checkout_in_flight).await
        });

        assert!(order.is_ok());
        assert!(in_flight);
    }

    #[tokio::test]
    async fn cancelled_checkout_releases_the_cart() {
        let session = session(200);
        session.add_to_cart(ItemId::new(1)).await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), session.checkout(form())).await;
        assert!(timed_out.is_err());

        assert!(!session.read(Storefront::is_checkout_in_flight).await);
        session.add_to_cart(ItemId::new(2)).await.unwrap();
        assert_eq!(session.read(|state| state.cart().len()).await, 2);
        assert!(session.read(|state| state.last_order().is_none()).await);
    }

    #[tokio::test]
    async fn subscribers_hear_about_checkout() {
        let session = session(1);
        let sub = session.subscribe().await;
        session.add_to_cart(ItemId::new(3)).await.unwrap();
        session.checkout(form()).await.unwrap();

        let types: Vec<String> = sub
            .drain()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "cart.item_added",
                "checkout.started",
                "checkout.order_placed"
            ]
        );
    }
}
