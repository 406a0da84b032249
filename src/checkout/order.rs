//! Order payload assembly.

use serde::Serialize;

use crate::{
    cart::{CartLineItem, ProductId},
    checkout::form::ValidatedForm,
    money::{Amount, amount, zero},
    payments::PaymentMethod,
    pricing::{self, PricingError},
    vouchers::VoucherCode,
};

/// A voucher confirmed by the server at submit time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVoucher {
    /// Code to send with the order.
    pub code: VoucherCode,

    /// Merchandise discount.
    pub discount: Amount,

    /// Whether shipping is waived.
    pub free_shipping: bool,
}

/// One order line, priced at the effective unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    /// Product.
    pub product_id: ProductId,

    /// Units ordered.
    pub quantity: u32,

    /// Unit price in minor units.
    pub price: i64,
}

/// The order payload sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOrder {
    /// Order lines.
    pub items: Vec<OrderLine>,

    /// Who receives the parcel.
    pub recipient_name: String,

    /// `line, ward, district, city`.
    pub shipping_address: String,

    /// Contact phone.
    pub phone: String,

    /// Chosen payment method.
    pub payment_method: PaymentMethod,

    /// Delivery notes.
    pub notes: String,

    /// Amount payable in minor units.
    pub total_amount: i64,

    /// Applied voucher code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<VoucherCode>,

    /// Merchandise discount in minor units.
    pub discount: i64,

    /// Shipping fee in minor units.
    pub shipping_fee: i64,

    /// Whether the voucher waives shipping.
    pub free_shipping: bool,
}

impl CheckoutOrder {
    /// Build the payload from cart lines, a validated form and the resolved voucher.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the lines cannot be priced.
    pub fn assemble(
        items: &[CartLineItem],
        form: &ValidatedForm,
        voucher: Option<&ResolvedVoucher>,
    ) -> Result<Self, PricingError> {
        let subtotal = pricing::subtotal(items)?;
        let free_shipping = voucher.is_some_and(|voucher| voucher.free_shipping);

        let discount = voucher
            .map_or_else(zero, |voucher| voucher.discount)
            .to_minor_units()
            .clamp(0, subtotal.to_minor_units().max(0));

        let shipping_fee = pricing::shipping_fee(free_shipping);
        let total = pricing::payable_total(&subtotal, &amount(discount)).add(shipping_fee)?;

        Ok(Self {
            items: items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id(),
                    quantity: item.quantity(),
                    price: item.effective_price().to_minor_units(),
                })
                .collect(),
            recipient_name: form.address.recipient_name.trim().to_string(),
            shipping_address: form.address.formatted(),
            phone: form.phone.clone(),
            payment_method: form.payment_method,
            notes: form.notes.clone(),
            total_amount: total.to_minor_units(),
            coupon_code: voucher.map(|voucher| voucher.code.clone()),
            discount,
            shipping_fee: shipping_fee.to_minor_units(),
            free_shipping,
        })
    }
}
