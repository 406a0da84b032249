//! Cart Fixtures

use rust_decimal::Decimal;
use rusty_money::iso;
use serde::Deserialize;

use crate::{
    cart::{CartLineItem, ProductId},
    fixtures::FixtureError,
    money::{Amount, CURRENCY, amount, minor_units},
};

/// Wrapper for cart lines in YAML
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Cart lines in display order
    pub items: Vec<CartItemFixture>,
}

/// Cart Line Fixture
#[derive(Debug, Deserialize)]
pub struct CartItemFixture {
    /// Product id
    pub product_id: u64,

    /// Product name
    pub name: String,

    /// List price (e.g., "150000 VND")
    pub price: String,

    /// Sale price, when on sale
    #[serde(default)]
    pub sale_price: Option<String>,

    /// Units in the cart
    pub quantity: u32,
}

impl TryFrom<CartItemFixture> for CartLineItem {
    type Error = FixtureError;

    fn try_from(fixture: CartItemFixture) -> Result<Self, Self::Error> {
        let item = CartLineItem::new(
            ProductId(fixture.product_id),
            fixture.name,
            parse_price(&fixture.price)?,
            fixture.quantity,
        )?;

        Ok(match fixture.sale_price {
            Some(sale_price) => item.with_sale_price(parse_price(&sale_price)?),
            None => item,
        })
    }
}

/// Parse price string (e.g., "150000 VND") into an amount
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if
/// the amount is not a decimal, or if the currency is unknown or not the
/// storefront currency.
pub fn parse_price(s: &str) -> Result<Amount, FixtureError> {
    let mut parts = s.split_whitespace();

    let (Some(value), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let value = value
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = iso::find(code).ok_or_else(|| FixtureError::UnknownCurrency(code.to_string()))?;

    if currency != CURRENCY {
        return Err(FixtureError::CurrencyMismatch(
            CURRENCY.iso_alpha_code.to_string(),
            currency.iso_alpha_code.to_string(),
        ));
    }

    let minor = minor_units(value).map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    Ok(amount(minor))
}
