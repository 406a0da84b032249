//! Checkout form and its local validation.

use std::fmt;

use serde::Deserialize;
use smallvec::SmallVec;

use crate::{
    cart::CartLineItem,
    checkout::address::{AddressId, NewAddressForm, ShippingAddress, resolve_address},
    payments::PaymentMethod,
};

const MIN_PHONE_DIGITS: usize = 9;
const MAX_PHONE_DIGITS: usize = 15;

/// Form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Cart contents.
    Items,

    /// Shipping address.
    Address,

    /// Contact phone.
    Phone,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field.
    pub field: Field,

    /// Message to show next to the field.
    pub message: &'static str,
}

/// Local validation failures; no network call is made while any are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(SmallVec<[FieldError; 4]>);

impl ValidationErrors {
    fn push(&mut self, field: Field, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    /// Whether there are no failures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The failures in field order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// The failure for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }

            f.write_str(error.message)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// What the customer entered on the checkout page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    /// Addresses saved on the customer's profile.
    pub saved_addresses: Vec<ShippingAddress>,

    /// The saved address the customer picked.
    pub selected_address: Option<AddressId>,

    /// Address typed into the new-address sub-form.
    pub new_address: Option<NewAddressForm>,

    /// Contact phone; falls back to the address's phone when blank.
    pub phone: String,

    /// Chosen payment method.
    pub payment_method: PaymentMethod,

    /// Free-text delivery notes.
    pub notes: String,
}

/// A form that passed local validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedForm {
    /// Where to ship.
    pub address: ShippingAddress,

    /// Normalized contact phone.
    pub phone: String,

    /// Chosen payment method.
    pub payment_method: PaymentMethod,

    /// Trimmed delivery notes.
    pub notes: String,
}

impl CheckoutForm {
    /// Resolve the shipping address and check the form is complete.
    ///
    /// # Errors
    ///
    /// Returns every field-level failure found.
    pub fn validate(&self, items: &[CartLineItem]) -> Result<ValidatedForm, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if items.is_empty() {
            errors.push(Field::Items, "Your cart is empty");
        }

        let address = resolve_address(
            &self.saved_addresses,
            self.selected_address,
            self.new_address.as_ref(),
        );

        if address.is_none() {
            errors.push(Field::Address, "Please choose or enter a shipping address");
        }

        let raw_phone = match (self.phone.trim(), &address) {
            ("", Some(address)) => address.phone.as_str(),
            (phone, _) => phone,
        };

        let phone = if raw_phone.is_empty() {
            errors.push(Field::Phone, "Please enter a phone number");
            None
        } else {
            let normalized = normalize_phone(raw_phone);

            if normalized.is_none() {
                errors.push(Field::Phone, "Phone number is invalid");
            }

            normalized
        };

        match (address, phone) {
            (Some(address), Some(phone)) if errors.is_empty() => Ok(ValidatedForm {
                address,
                phone,
                payment_method: self.payment_method,
                notes: self.notes.trim().to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// Strip separators and check the phone shape: optional `+`, then 9 to 15 digits.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    let valid = (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit());

    valid.then_some(compact)
}
