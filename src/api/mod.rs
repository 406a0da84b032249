//! Storefront API
//!
//! Service traits for the remote collaborators, and their `reqwest`
//! implementation.

mod appointments;
mod client;
mod errors;
mod locations;
pub mod models;
mod orders;
mod vouchers;

pub use appointments::{AvailabilityService, MockAvailabilityService};
pub use client::{ApiClient, ApiConfig};
pub use errors::ApiError;
pub use locations::{AddressLookup, MockAddressLookup};
pub use models::{GatewaySession, GatewaySessionRequest, Order, OrderId, Region, VoucherValidation};
pub use orders::{MockOrderService, OrderService};
pub use vouchers::{MockVoucherService, VoucherService};
