//! Cart

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{Amount, CURRENCY};

/// Catalog product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors related to cart mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Line items always carry at least one unit.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// A line item was priced in a currency other than the storefront's.
    #[error("product {0} is priced in {1}, but the cart uses {2}")]
    CurrencyMismatch(ProductId, &'static str, &'static str),

    /// The product has no line in the cart.
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}

/// A single product line in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineItem {
    product_id: ProductId,
    name: String,
    unit_price: Amount,
    sale_price: Option<Amount>,
    quantity: u32,
}

impl CartLineItem {
    /// Create a line item at list price.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when `quantity` is zero.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Amount,
        quantity: u32,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        Ok(Self {
            product_id,
            name: name.into(),
            unit_price,
            sale_price: None,
            quantity,
        })
    }

    /// Attach a sale price to the line.
    #[must_use]
    pub fn with_sale_price(mut self, sale_price: Amount) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    /// Returns the product of the line.
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Returns the display name of the product.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the list price.
    pub fn unit_price(&self) -> &Amount {
        &self.unit_price
    }

    /// Returns the sale price, if any.
    pub fn sale_price(&self) -> Option<&Amount> {
        self.sale_price.as_ref()
    }

    /// The price charged per unit: the sale price when present, otherwise list price.
    pub fn effective_price(&self) -> &Amount {
        self.sale_price.as_ref().unwrap_or(&self.unit_price)
    }

    /// Returns the number of units.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    fn ensure_currency(&self) -> Result<(), CartError> {
        [Some(&self.unit_price), self.sale_price.as_ref()]
            .into_iter()
            .flatten()
            .try_for_each(|price| {
                if price.currency() == CURRENCY {
                    Ok(())
                } else {
                    Err(CartError::CurrencyMismatch(
                        self.product_id,
                        price.currency().iso_alpha_code,
                        CURRENCY.iso_alpha_code,
                    ))
                }
            })
    }
}

/// The customer's cart. Owns its line items exclusively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cart from existing line items, merging duplicate products.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if any line is priced in a foreign currency.
    pub fn with_items(items: impl IntoIterator<Item = CartLineItem>) -> Result<Self, CartError> {
        let mut cart = Self::new();

        items.into_iter().try_for_each(|item| cart.add(item))?;

        Ok(cart)
    }

    /// Add a line; a product already in the cart has its quantity increased.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the line is priced in a foreign currency.
    pub fn add(&mut self, item: CartLineItem) -> Result<(), CartError> {
        item.ensure_currency()?;

        match self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(item.quantity);
                line.unit_price = item.unit_price;
                line.sale_price = item.sale_price;
            }
            None => self.items.push(item),
        }

        Ok(())
    }

    /// Set the quantity of a line. A quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the product has no line.
    pub fn update_quantity(&mut self, product: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product);
        }

        let line = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product)
            .ok_or(CartError::ItemNotFound(product))?;

        line.quantity = quantity;

        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if the product has no line.
    pub fn remove(&mut self, product: ProductId) -> Result<(), CartError> {
        let before = self.items.len();

        self.items.retain(|line| line.product_id != product);

        if self.items.len() == before {
            return Err(CartError::ItemNotFound(product));
        }

        Ok(())
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Get the line for a product.
    pub fn get(&self, product: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|line| line.product_id == product)
    }

    /// The line items, in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Get the number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
