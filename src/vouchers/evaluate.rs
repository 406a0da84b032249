//! Voucher Rule Evaluation

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    money::{Amount, amount, minor_units, percent_of_minor, zero},
    vouchers::{Voucher, VoucherError, VoucherKind, VoucherStatus},
};

/// Why a voucher does not apply to a subtotal.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum Ineligibility {
    /// No voucher was supplied.
    #[error("no voucher applied")]
    NoVoucher,

    /// The subtotal is below the voucher's minimum order amount.
    #[error("order total is below the minimum of {minimum} for this voucher")]
    BelowMinimumOrder {
        /// The voucher's minimum order amount.
        minimum: Amount,
    },

    /// The validity window has closed.
    #[error("voucher has expired")]
    Expired,

    /// The validity window has not opened yet.
    #[error("voucher is not valid yet")]
    NotYetValid,

    /// The voucher has been switched off.
    #[error("voucher is inactive")]
    Inactive,
}

/// Outcome of evaluating a voucher against a subtotal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Merchandise discount, within `[0, subtotal]`.
    pub discount: Amount,

    /// Whether the voucher waives the shipping fee.
    pub free_shipping: bool,

    /// Set when the voucher does not apply.
    pub ineligibility: Option<Ineligibility>,
}

impl Evaluation {
    fn ineligible(reason: Ineligibility) -> Self {
        Self {
            discount: zero(),
            free_shipping: false,
            ineligibility: Some(reason),
        }
    }

    /// Whether the voucher applies.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.ineligibility.is_none()
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::ineligible(Ineligibility::NoVoucher)
    }
}

/// Evaluates a voucher against a subtotal at a point in time.
///
/// Pure: the same voucher, subtotal and instant always produce the same result.
/// The discount is capped at the voucher's maximum and clamped to
/// `[0, subtotal]`. Free-shipping vouchers never discount merchandise.
///
/// # Errors
///
/// Returns [`VoucherError::Amount`] if a voucher amount cannot be represented
/// in minor units.
pub fn evaluate(
    voucher: Option<&Voucher>,
    subtotal: &Amount,
    point_in_time: Timestamp,
) -> Result<Evaluation, VoucherError> {
    let Some(voucher) = voucher else {
        return Ok(Evaluation::default());
    };

    let subtotal = subtotal.to_minor_units().max(0);

    if let Some(minimum) = voucher.min_order_amount {
        let minimum = minor_units(minimum)?;

        if subtotal < minimum {
            return Ok(Evaluation::ineligible(Ineligibility::BelowMinimumOrder {
                minimum: amount(minimum),
            }));
        }
    }

    if voucher.status != VoucherStatus::Active {
        return Ok(Evaluation::ineligible(Ineligibility::Inactive));
    }

    if voucher.valid_until.is_some_and(|until| until <= point_in_time) {
        return Ok(Evaluation::ineligible(Ineligibility::Expired));
    }

    if voucher.valid_from.is_some_and(|from| from > point_in_time) {
        return Ok(Evaluation::ineligible(Ineligibility::NotYetValid));
    }

    let raw = match voucher.kind {
        VoucherKind::Percentage => percent_of_minor(voucher.value, subtotal)?,
        VoucherKind::FixedAmount => minor_units(voucher.value)?,
        VoucherKind::FreeShipping => 0,
    };

    let capped = match voucher.max_discount_amount {
        Some(cap) => raw.min(minor_units(cap)?),
        None => raw,
    };

    Ok(Evaluation {
        discount: amount(capped.clamp(0, subtotal)),
        free_shipping: voucher.kind == VoucherKind::FreeShipping,
        ineligibility: None,
    })
}
