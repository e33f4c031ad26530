//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;
use crate::validation::ValidationFailures;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (quantities,
/// form validation, price data). Storage concerns belong to the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested quantity was zero.
    #[error("quantity must be at least 1 (got {requested})")]
    InvalidQuantity { requested: u32 },

    /// A requested quantity exceeds the spaces left on a catalog item.
    #[error("only {remaining} space(s) left for item {item_id}, cannot add {requested}")]
    InsufficientCapacity {
        item_id: ItemId,
        requested: u32,
        remaining: u32,
    },

    /// The catalog has no item with this identifier.
    #[error("catalog item {0} does not exist")]
    UnknownItem(ItemId),

    /// Two catalog items share an identifier.
    #[error("catalog item {0} is listed more than once")]
    DuplicateItem(ItemId),

    /// Checkout preconditions failed; every failing field is listed.
    #[error("checkout rejected: {0}")]
    Validation(ValidationFailures),

    /// A price string could not be parsed into an amount.
    #[error("malformed price {raw:?}: {reason}")]
    MalformedPrice { raw: String, reason: String },

    /// A line or cart total does not fit in a decimal.
    #[error("amount is too large to represent")]
    AmountOverflow,

    /// A checkout was started while another one is still in flight.
    #[error("a checkout is already in progress")]
    CheckoutInProgress,

    /// A checkout was completed or abandoned without being started.
    #[error("no checkout is in progress")]
    NoCheckoutInProgress,

    /// A sort key label the catalog does not know.
    #[error("cannot sort the catalog by {0:?}")]
    UnknownSortKey(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn malformed_price(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPrice {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FormField, ValidationFailure};

    #[test]
    fn every_variant_has_a_distinct_message() {
        let errors = vec![
            DomainError::InvalidQuantity { requested: 0 },
            DomainError::InsufficientCapacity {
                item_id: ItemId::new(3),
                requested: 4,
                remaining: 2,
            },
            DomainError::UnknownItem(ItemId::new(9)),
            DomainError::DuplicateItem(ItemId::new(9)),
            DomainError::Validation(ValidationFailures::from(vec![
                ValidationFailure::MissingField(FormField::Email),
            ])),
            DomainError::malformed_price("150", "missing currency symbol"),
            DomainError::AmountOverflow,
            DomainError::CheckoutInProgress,
            DomainError::NoCheckoutInProgress,
            DomainError::UnknownSortKey("colour".to_string()),
            DomainError::invalid_id("OrderId: nope"),
        ];

        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        for (i, a) in messages.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn insufficient_capacity_message_names_the_numbers() {
        let err = DomainError::InsufficientCapacity {
            item_id: ItemId::new(3),
            requested: 4,
            remaining: 2,
        };
        assert_eq!(
            err.to_string(),
            "only 2 space(s) left for item 3, cannot add 4"
        );
    }
}
