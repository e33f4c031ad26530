//! `classcart-core`: shared domain building blocks (ids, money, errors, validation).
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod validation;

pub use aggregate::Aggregate;
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, OrderId};
pub use money::{CURRENCY_SYMBOL, Price};
pub use validation::{FormField, ValidationFailure, ValidationFailures};
