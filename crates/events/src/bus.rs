//! Event publishing/subscription abstraction.
//!
//! The storefront has no implicit reactivity: a rendering layer that wants to
//! redraw after a change subscribes to the bus and re-reads whatever derived
//! views it shows (cart, total, filtered catalog) when a message arrives.
//!
//! Delivery is best-effort fan-out. A subscriber that falls behind still gets
//! every message in publish order; a dropped subscriber is forgotten on the
//! next publish.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics).
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(envelope) = subscription.try_recv() {
///     redraw(envelope.payload());
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Pub/sub abstraction between the dispatcher and its observers.
///
/// `publish()` failures are surfaced to the dispatcher, which reports them
/// after the state change and its persistence have already happened.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
