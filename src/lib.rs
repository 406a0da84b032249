//! Tailwag
//!
//! Tailwag is the order pricing, voucher discount and checkout dispatch engine
//! behind a pet-care storefront: it prices carts, keeps an applied voucher
//! consistent with the subtotal, and submits orders down cash, bank transfer,
//! redirect or QR payment paths. A booking slot advisor rounds out the crate.

pub mod api;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod discount;
pub mod fixtures;
pub mod money;
pub mod observability;
pub mod payments;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod session;
pub mod vouchers;
