//! Wire models exchanged with the storefront API.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{checkout::CheckoutOrder, vouchers::Voucher};

/// Result of asking the server whether a code applies to an order amount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoucherValidation {
    /// Whether the server accepts the code.
    #[serde(default)]
    pub valid: bool,

    /// The voucher definition, when valid.
    #[serde(default)]
    pub voucher: Option<Voucher>,

    /// Human readable explanation, surfaced verbatim.
    #[serde(default)]
    pub message: Option<String>,

    /// Discount the server computed for the order amount.
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateVoucherRequest<'a> {
    pub code: &'a str,
    pub order_amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum VoucherList {
    Bare(Vec<Voucher>),
    Wrapped {
        #[serde(alias = "data")]
        vouchers: Vec<Voucher>,
    },
}

impl From<VoucherList> for Vec<Voucher> {
    fn from(list: VoucherList) -> Self {
        match list {
            VoucherList::Bare(vouchers) | VoucherList::Wrapped { vouchers } => vouchers,
        }
    }
}

/// Server-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    /// Numeric database id.
    Numeric(u64),

    /// Opaque textual id.
    Text(String),
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// An order as recorded by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order id.
    pub id: OrderId,

    /// Fulfilment status, e.g. `"pending"`.
    #[serde(default)]
    pub status: Option<String>,

    /// Total the server charged.
    #[serde(default)]
    pub total_amount: Option<Decimal>,

    /// Payment method recorded on the order.
    #[serde(default)]
    pub payment_method: Option<String>,

    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderEnvelope {
    Wrapped { order: Order },
    Bare(Order),
}

impl From<OrderEnvelope> for Order {
    fn from(envelope: OrderEnvelope) -> Self {
        match envelope {
            OrderEnvelope::Wrapped { order } | OrderEnvelope::Bare(order) => order,
        }
    }
}

/// Request for a payment gateway session.
///
/// Redirect gateways get the full order since no local order exists yet; QR
/// gateways reference the order created beforehand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewaySessionRequest {
    /// Order the session pays for, when already created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,

    /// Amount to charge in minor units.
    pub amount: i64,

    /// Short description shown by the gateway.
    pub order_info: String,

    /// The order to create once the gateway confirms payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<CheckoutOrder>,
}

/// Payment session handed back by a gateway.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GatewaySession {
    /// Where to send the customer to pay.
    #[serde(default, alias = "pay_url", alias = "payUrl")]
    pub payment_url: Option<String>,

    /// QR payload or image URL to render.
    #[serde(default, alias = "qr_code_url", alias = "qrCodeUrl")]
    pub qr_code: Option<String>,

    /// Seconds until the gateway discards the session.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// An administrative region (province, district or ward).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region code.
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,

    /// Display name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RegionList {
    Bare(Vec<Region>),
    Wrapped {
        #[serde(alias = "provinces", alias = "districts", alias = "wards")]
        data: Vec<Region>,
    },
}

impl From<RegionList> for Vec<Region> {
    fn from(list: RegionList) -> Self {
        match list {
            RegionList::Bare(regions) | RegionList::Wrapped { data: regions } => regions,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BookedTimes {
    Bare(Vec<String>),
    Wrapped {
        #[serde(alias = "booked_times", alias = "data")]
        times: Vec<String>,
    },
}

impl From<BookedTimes> for Vec<String> {
    fn from(list: BookedTimes) -> Self {
        match list {
            BookedTimes::Bare(times) | BookedTimes::Wrapped { times } => times,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(u64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value,
        StringOrNumber::Number(value) => value.to_string(),
    })
}
