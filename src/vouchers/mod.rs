//! Vouchers
//!
//! Voucher definitions as sourced from the remote catalog, and the pure rule
//! evaluator that turns a voucher and a subtotal into a discount.

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::AmountError;

mod code;
mod dates;
pub mod evaluate;

pub use code::{MAX_CODE_LEN, VoucherCode, VoucherCodeError};
pub use evaluate::{Evaluation, Ineligibility, evaluate};

/// How a voucher's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherKind {
    /// `value` is a percentage (0-100) of the subtotal.
    Percentage,

    /// `value` is a fixed amount off the subtotal.
    FixedAmount,

    /// Waives the shipping fee; no merchandise discount.
    FreeShipping,
}

impl VoucherKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
            Self::FreeShipping => "free_shipping",
        }
    }
}

/// Catalog status of a voucher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Redeemable.
    #[default]
    Active,

    /// Switched off by the back office.
    Inactive,
}

/// Errors raised by voucher definitions and evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoucherError {
    /// A percentage voucher outside 0-100.
    #[error("percentage voucher value {0} is outside 0-100")]
    PercentageOutOfRange(Decimal),

    /// Negative value, minimum or cap.
    #[error("voucher {0} must not be negative")]
    Negative(&'static str),

    /// A monetary field cannot be represented.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// A discount voucher. Immutable for the duration of a checkout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique code, upper-cased.
    pub code: VoucherCode,

    /// How `value` is interpreted.
    #[serde(rename = "type")]
    pub kind: VoucherKind,

    /// Percentage or amount, depending on `kind`.
    #[serde(default)]
    pub value: Decimal,

    /// Subtotal required before the voucher applies.
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,

    /// Upper bound on the discount.
    #[serde(default)]
    pub max_discount_amount: Option<Decimal>,

    /// Total redemptions allowed. Enforced by the server.
    #[serde(default)]
    pub usage_limit: Option<u32>,

    /// Redemptions so far, when the server reports it.
    #[serde(default)]
    pub used_count: Option<u32>,

    /// Start of the validity window.
    #[serde(default, deserialize_with = "dates::deserialize_start")]
    pub valid_from: Option<Timestamp>,

    /// End of the validity window (exclusive).
    #[serde(default, deserialize_with = "dates::deserialize_end")]
    pub valid_until: Option<Timestamp>,

    /// Catalog status.
    #[serde(default)]
    pub status: VoucherStatus,

    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Voucher {
    /// Create an active voucher with no constraints.
    #[must_use]
    pub fn new(code: VoucherCode, kind: VoucherKind, value: Decimal) -> Self {
        Self {
            code,
            kind,
            value,
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            used_count: None,
            valid_from: None,
            valid_until: None,
            status: VoucherStatus::Active,
            description: None,
        }
    }

    /// Set the minimum order amount.
    #[must_use]
    pub fn with_min_order(mut self, amount: Decimal) -> Self {
        self.min_order_amount = Some(amount);
        self
    }

    /// Set the discount cap.
    #[must_use]
    pub fn with_max_discount(mut self, amount: Decimal) -> Self {
        self.max_discount_amount = Some(amount);
        self
    }

    /// Set the validity window.
    #[must_use]
    pub fn with_validity(mut self, from: Option<Timestamp>, until: Option<Timestamp>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: VoucherStatus) -> Self {
        self.status = status;
        self
    }

    /// Check the definition's invariants.
    ///
    /// # Errors
    ///
    /// - [`VoucherError::PercentageOutOfRange`]: a percentage outside 0-100.
    /// - [`VoucherError::Negative`]: a negative value, minimum or cap.
    pub fn validate(&self) -> Result<(), VoucherError> {
        if self.value < Decimal::ZERO {
            return Err(VoucherError::Negative("value"));
        }

        if self.kind == VoucherKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(VoucherError::PercentageOutOfRange(self.value));
        }

        if self.min_order_amount.is_some_and(|m| m < Decimal::ZERO) {
            return Err(VoucherError::Negative("minimum order amount"));
        }

        if self.max_discount_amount.is_some_and(|m| m < Decimal::ZERO) {
            return Err(VoucherError::Negative("maximum discount amount"));
        }

        Ok(())
    }

    /// Whether redemptions have run out according to the last catalog read.
    ///
    /// Informational only: the server decides at submit time.
    #[must_use]
    pub fn usage_exhausted(&self) -> bool {
        matches!((self.usage_limit, self.used_count), (Some(limit), Some(used)) if used >= limit)
    }
}
