//! Checkout form validation and the order record a checkout produces.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use classcart_core::{
    DomainError, DomainResult, FormField, OrderId, ValidationFailure, ValidationFailures,
};

use crate::cart::{Cart, CartEntry};

/// Customer details collected on the checkout page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl CustomerForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Email => &self.email,
            FormField::Phone => &self.phone,
            FormField::Address => &self.address,
        }
    }

    /// Check every field, reporting each problem once, in form order.
    pub fn validate(&self) -> ValidationFailures {
        let mut failures = ValidationFailures::new();
        for field in FormField::ALL {
            let value = self.value(field).trim();
            if value.is_empty() {
                failures.push(ValidationFailure::MissingField(field));
            } else if !field_is_well_formed(field, value) {
                failures.push(ValidationFailure::InvalidField(field));
            }
        }
        failures
    }
}

fn field_is_well_formed(field: FormField, value: &str) -> bool {
    match field {
        FormField::Email => is_email(value),
        FormField::Phone => is_phone(value),
        FormField::Name | FormField::Address => true,
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_phone(value: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    let digits = value.chars().filter(char::is_ascii_digit).count();
    value.chars().all(allowed) && (7..=15).contains(&digits)
}

/// Everything that must hold before a checkout may start.
pub fn validate_checkout(form: &CustomerForm, cart: &Cart) -> DomainResult<()> {
    let mut failures = form.validate();
    if cart.is_empty() {
        failures.push(ValidationFailure::EmptyCart);
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(failures))
    }
}

/// Immutable record of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer: CustomerForm,
    lines: Vec<CartEntry>,
    total: Decimal,
    placed_at: DateTime<Utc>,
}

impl Order {
    /// Snapshot `cart` into an order. The total is rounded to pennies.
    pub fn place(
        id: OrderId,
        customer: CustomerForm,
        cart: &Cart,
        placed_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let total = cart.total()?.round_dp(2);
        Ok(Self {
            id,
            customer,
            lines: cart.entries().to_vec(),
            total,
            placed_at,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer(&self) -> &CustomerForm {
        &self.customer
    }

    pub fn lines(&self) -> &[CartEntry] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }
}
