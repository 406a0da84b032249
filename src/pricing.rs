//! Pricing
//!
//! Pure cart aggregation shared by every surface that displays a total.

use rusty_money::MoneyError;
use thiserror::Error;

use crate::{
    cart::CartLineItem,
    money::{Amount, amount, zero},
};

/// Errors that can occur while pricing a cart.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// A line total does not fit in minor units.
    #[error("line total overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculates the price of a line: effective unit price times quantity.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the product does not fit in minor units.
pub fn line_total(item: &CartLineItem) -> Result<Amount, PricingError> {
    item.effective_price()
        .to_minor_units()
        .checked_mul(i64::from(item.quantity()))
        .map(amount)
        .ok_or(PricingError::Overflow)
}

/// Calculates the subtotal of a list of line items. An empty list costs nothing.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: a line total did not fit in minor units.
/// - [`PricingError::Money`]: wrapped money arithmetic or currency mismatch error.
pub fn subtotal(items: &[CartLineItem]) -> Result<Amount, PricingError> {
    items
        .iter()
        .try_fold(zero(), |acc, item| -> Result<Amount, PricingError> {
            Ok(acc.add(line_total(item)?)?)
        })
}

/// Total number of units across all lines.
pub fn item_count(items: &[CartLineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity())).sum()
}

/// Subtotal minus discount, floored at zero.
#[must_use]
pub fn payable_total(subtotal: &Amount, discount: &Amount) -> Amount {
    let remaining = subtotal
        .to_minor_units()
        .saturating_sub(discount.to_minor_units().max(0));

    amount(remaining.max(0))
}

/// Shipping fee for an order.
///
/// Shipping is waived on every order in the current business model, whether
/// or not a free-shipping voucher is applied.
#[must_use]
pub fn shipping_fee(_free_shipping: bool) -> Amount {
    zero()
}

/// Derived totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals {
    /// Number of units in the cart.
    pub item_count: u64,

    /// Sum of line totals at effective price.
    pub subtotal: Amount,

    /// Discount from the applied voucher.
    pub discount: Amount,

    /// Shipping fee charged.
    pub shipping_fee: Amount,

    /// Amount payable.
    pub total: Amount,

    /// Whether the applied voucher waives shipping.
    pub free_shipping: bool,
}

/// Calculates the totals for a list of line items and a discount.
///
/// # Errors
///
/// Returns a [`PricingError`] if the subtotal cannot be computed.
pub fn totals(
    items: &[CartLineItem],
    discount: &Amount,
    free_shipping: bool,
) -> Result<CartTotals, PricingError> {
    let subtotal = subtotal(items)?;
    let shipping_fee = shipping_fee(free_shipping);
    let total = payable_total(&subtotal, discount).add(shipping_fee)?;

    Ok(CartTotals {
        item_count: item_count(items),
        subtotal,
        discount: *discount,
        shipping_fee,
        total,
        free_shipping,
    })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::cart::{CartError, ProductId};

    use super::*;

    fn lines() -> Result<Vec<CartLineItem>, CartError> {
        Ok(vec![
            CartLineItem::new(ProductId(1), "Salmon kibble", amount(250_000), 1)?
                .with_sale_price(amount(200_000)),
            CartLineItem::new(ProductId(2), "Chew toy", amount(50_000), 3)?,
        ])
    }

    #[test]
    fn subtotal_uses_effective_price_and_quantity() -> TestResult {
        assert_eq!(subtotal(&lines()?)?, amount(350_000));

        Ok(())
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() -> TestResult {
        assert_eq!(subtotal(&[])?, zero());

        Ok(())
    }

    #[test]
    fn line_total_overflow_returns_error() -> TestResult {
        let line = CartLineItem::new(ProductId(1), "Gold collar", amount(i64::MAX), 2)?;

        assert_eq!(line_total(&line), Err(PricingError::Overflow));

        Ok(())
    }

    #[test]
    fn item_count_sums_quantities() -> TestResult {
        assert_eq!(item_count(&lines()?), 4);

        Ok(())
    }

    #[test]
    fn payable_total_is_never_negative() {
        assert_eq!(payable_total(&amount(100), &amount(250)), zero());
        assert_eq!(payable_total(&amount(100), &amount(-50)), amount(100));
        assert_eq!(payable_total(&amount(100), &amount(40)), amount(60));
    }

    #[test]
    fn totals_waive_shipping() -> TestResult {
        let totals = totals(&lines()?, &amount(35_000), false)?;

        assert_eq!(totals.item_count, 4);
        assert_eq!(totals.subtotal, amount(350_000));
        assert_eq!(totals.discount, amount(35_000));
        assert_eq!(totals.shipping_fee, zero());
        assert_eq!(totals.total, amount(315_000));
        assert!(!totals.free_shipping);

        Ok(())
    }
}
