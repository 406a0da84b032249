//! Cart Session
//!
//! The single owner of cart contents and discount state. Every mutation is
//! followed by a discount recompute, so the displayed discount is never stale
//! relative to the subtotal.

use std::sync::Arc;

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    cart::{Cart, CartError, CartLineItem, ProductId},
    discount::{DiscountState, StateStore},
    money::Amount,
    pricing::{self, CartTotals, PricingError},
    vouchers::{Evaluation, Voucher, VoucherError},
};

/// Errors raised by cart session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Cart mutation rejected.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Voucher could not be evaluated.
    #[error(transparent)]
    Voucher(#[from] VoucherError),
}

/// Cart contents plus the applied voucher.
#[derive(Debug)]
pub struct CartSession {
    cart: Cart,
    discount: DiscountState,
}

impl CartSession {
    /// Create an empty session. Any persisted voucher is left alone.
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            cart: Cart::new(),
            discount: DiscountState::new(store),
        }
    }

    /// Rebuild a session from known cart lines and the persisted voucher.
    ///
    /// The restored voucher is re-evaluated against `items`; with no items
    /// it is dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the items are invalid or cannot be priced.
    pub fn restore(
        items: impl IntoIterator<Item = CartLineItem>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            cart: Cart::with_items(items)?,
            discount: DiscountState::restore(store),
        };

        session.reprice()?;

        Ok(session)
    }

    /// Add a line (merging with an existing line for the same product).
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the line is rejected or cannot be priced.
    pub fn add_item(&mut self, item: CartLineItem) -> Result<CartTotals, SessionError> {
        self.cart.add(item)?;
        self.reprice()
    }

    /// Change the quantity of a line; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the product is not in the cart.
    pub fn update_quantity(
        &mut self,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartTotals, SessionError> {
        self.cart.update_quantity(product, quantity)?;
        self.reprice()
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the product is not in the cart.
    pub fn remove_item(&mut self, product: ProductId) -> Result<CartTotals, SessionError> {
        self.cart.remove(product)?;
        self.reprice()
    }

    /// Empty the cart, dropping the applied voucher with it.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.discount.remove();
    }

    /// Apply a voucher against the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be priced or the voucher
    /// evaluated.
    pub fn apply_voucher(&mut self, voucher: Voucher) -> Result<Evaluation, SessionError> {
        let subtotal = self.subtotal()?;

        self.discount.apply(voucher, &subtotal, Timestamp::now())?;

        Ok(self.discount.evaluation().copied().unwrap_or_default())
    }

    /// Drop the applied voucher.
    pub fn remove_voucher(&mut self) {
        self.discount.remove();
    }

    /// The cart lines.
    pub fn items(&self) -> &[CartLineItem] {
        self.cart.items()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// The applied voucher, if any.
    pub fn applied_voucher(&self) -> Option<&Voucher> {
        self.discount.voucher()
    }

    /// The discount state.
    pub fn discount(&self) -> &DiscountState {
        &self.discount
    }

    /// Calculate the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow or currency mismatch.
    pub fn subtotal(&self) -> Result<Amount, PricingError> {
        pricing::subtotal(self.cart.items())
    }

    /// Calculate the current totals.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow or currency mismatch.
    pub fn totals(&self) -> Result<CartTotals, PricingError> {
        pricing::totals(
            self.cart.items(),
            &self.discount.discount(),
            self.discount.is_free_shipping(),
        )
    }

    fn reprice(&mut self) -> Result<CartTotals, SessionError> {
        if self.cart.is_empty() {
            self.discount.remove();
        } else {
            let subtotal = self.subtotal()?;

            self.discount.recompute(&subtotal, Timestamp::now())?;
        }

        Ok(self.totals()?)
    }
}
