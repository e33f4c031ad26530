//! Cart/inventory consistency engine.
//!
//! Business rules for the cart, implemented purely as deterministic domain
//! logic (no IO, no storage). The [`Storefront`] aggregate owns the catalog
//! and the cart together so that every space taken from a class shows up as
//! cart quantity and vice versa.

pub mod cart;
pub mod checkout;
pub mod storefront;

pub use cart::{Cart, CartEntry, compute_total};
pub use checkout::{CustomerForm, Order, validate_checkout};
pub use storefront::{
    AbandonCheckout, AddToCart, BeginCheckout, CheckoutAbandoned, CheckoutStarted,
    CompleteCheckout, ItemAddedToCart, ItemRemovedFromCart, OrderPlaced, RemoveFromCart,
    RequestedQuantitySet, RestoreReport, SetRequestedQuantity, Storefront, StorefrontCommand,
    StorefrontEvent,
};
