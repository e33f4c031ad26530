//! Checkout validation vocabulary.

use serde::{Deserialize, Serialize};

/// Customer-facing checkout form fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormField {
    Name,
    Email,
    Phone,
    Address,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Name,
        FormField::Email,
        FormField::Phone,
        FormField::Address,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Email => "email",
            FormField::Phone => "phone",
            FormField::Address => "address",
        }
    }
}

impl core::fmt::Display for FormField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reason a checkout cannot proceed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationFailure {
    MissingField(FormField),
    InvalidField(FormField),
    EmptyCart,
}

impl core::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationFailure::MissingField(field) => write!(f, "{field} is required"),
            ValidationFailure::InvalidField(field) => write!(f, "{field} is not valid"),
            ValidationFailure::EmptyCart => f.write_str("the cart is empty"),
        }
    }
}

/// Every failure found in one validation pass, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationFailures(Vec<ValidationFailure>);

impl ValidationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ValidationFailure) {
        self.0.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationFailure> {
        self.0.iter()
    }

    pub fn contains(&self, failure: &ValidationFailure) -> bool {
        self.0.contains(failure)
    }

    pub fn as_slice(&self) -> &[ValidationFailure] {
        &self.0
    }
}

impl From<Vec<ValidationFailure>> for ValidationFailures {
    fn from(value: Vec<ValidationFailure>) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
