//! Payment Dispatch
//!
//! Each payment method maps to one dispatch strategy: capture the order
//! directly, hand the customer to a redirect gateway, or present a QR code for
//! an order created up front. Callers match on [`DispatchResult`].

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::{ApiError, GatewaySession, GatewaySessionRequest, Order, OrderService},
    checkout::CheckoutOrder,
};

mod countdown;

pub use countdown::{QrCountdown, format_remaining};

/// Nominal lifetime of a QR session when the gateway does not say.
pub const DEFAULT_QR_EXPIRY: Duration = Duration::from_secs(600);

/// How the customer pays.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,

    /// Manual bank transfer.
    BankTransfer,

    /// VNPay redirect gateway.
    #[serde(rename = "vnpay")]
    #[value(name = "vnpay")]
    VnPay,

    /// MoMo QR gateway.
    Momo,
}

impl PaymentMethod {
    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::VnPay => "vnpay",
            Self::Momo => "momo",
        }
    }

    /// The dispatch strategy for this method.
    #[must_use]
    pub const fn strategy(&self) -> PaymentStrategy {
        match self {
            Self::Cash | Self::BankTransfer => PaymentStrategy::DirectCapture,
            Self::VnPay => PaymentStrategy::Redirect(Gateway::VnPay),
            Self::Momo => PaymentStrategy::Qr(Gateway::Momo),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gateway {
    /// VNPay.
    VnPay,

    /// MoMo.
    Momo,
}

impl Gateway {
    /// Route segment of the gateway.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VnPay => "vnpay",
            Self::Momo => "momo",
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStrategy {
    /// Create the order immediately; payment happens offline.
    DirectCapture,

    /// Open a gateway session and redirect; the order is created on callback.
    Redirect(Gateway),

    /// Create the order, then open a gateway session rendered as a QR code.
    Qr(Gateway),
}

/// A QR payment waiting for the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct QrSession {
    /// The order being paid for.
    pub order: Order,

    /// Gateway that issued the session.
    pub gateway: Gateway,

    /// Fallback link to the gateway's payment page.
    pub payment_url: Option<String>,

    /// QR payload to render.
    pub qr_code: Option<String>,

    /// Nominal lifetime of the session.
    pub expires_in: Duration,
}

impl QrSession {
    /// Start a countdown over the session's nominal lifetime.
    #[must_use]
    pub fn countdown(&self) -> QrCountdown {
        QrCountdown::start(self.expires_in)
    }
}

/// Why dispatching an order failed.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A redirect gateway answered without a URL.
    #[error("{0} did not return a payment URL")]
    MissingPaymentUrl(Gateway),

    /// A QR gateway answered with neither a QR payload nor a URL.
    #[error("{gateway} returned no QR code for order {}", order.id)]
    MissingQrCode {
        /// Gateway that answered.
        gateway: Gateway,

        /// The order already created for the session.
        order: Order,
    },

    /// The order was created but its QR session could not be opened.
    #[error("{gateway} session for order {} failed", order.id)]
    QrSessionFailed {
        /// Gateway that was asked.
        gateway: Gateway,

        /// The order already created for the session.
        order: Order,

        /// Why the session request failed.
        #[source]
        source: ApiError,
    },
}

impl DispatchFailure {
    /// The order that exists on the server despite the failure, if any.
    #[must_use]
    pub fn created_order(&self) -> Option<&Order> {
        match self {
            Self::MissingQrCode { order, .. } | Self::QrSessionFailed { order, .. } => Some(order),
            Self::Api(_) | Self::MissingPaymentUrl(_) => None,
        }
    }
}

/// Outcome of dispatching an order.
#[derive(Debug)]
pub enum DispatchResult {
    /// The order exists; nothing more to do.
    Created(Order),

    /// Send the customer to the gateway.
    Redirect {
        /// Gateway payment page.
        url: String,
    },

    /// Show a QR code until the customer pays out of band.
    QrSession(QrSession),

    /// Nothing usable came back.
    Failed(DispatchFailure),
}

/// Runs the strategy for a payment method against the order service.
#[derive(Clone)]
pub struct PaymentDispatcher {
    orders: Arc<dyn OrderService>,
    qr_expiry: Duration,
}

impl fmt::Debug for PaymentDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDispatcher")
            .field("qr_expiry", &self.qr_expiry)
            .finish_non_exhaustive()
    }
}

impl PaymentDispatcher {
    /// Create a dispatcher with the default QR expiry.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderService>) -> Self {
        Self {
            orders,
            qr_expiry: DEFAULT_QR_EXPIRY,
        }
    }

    /// Override the QR expiry used when the gateway does not send one.
    #[must_use]
    pub fn with_qr_expiry(mut self, qr_expiry: Duration) -> Self {
        self.qr_expiry = qr_expiry;
        self
    }

    /// Dispatch `order` down the strategy for `method`.
    #[tracing::instrument(
        name = "payments.dispatch",
        skip(self, order),
        fields(payment_method = %method, total_amount = order.total_amount),
    )]
    pub async fn dispatch(&self, method: PaymentMethod, order: &CheckoutOrder) -> DispatchResult {
        let result = match method.strategy() {
            PaymentStrategy::DirectCapture => self.capture(order).await,
            PaymentStrategy::Redirect(gateway) => self.redirect(gateway, order).await,
            PaymentStrategy::Qr(gateway) => self.qr(gateway, order).await,
        };

        result.unwrap_or_else(|failure| {
            warn!(error = %failure, "payment dispatch failed");

            DispatchResult::Failed(failure)
        })
    }

    async fn capture(&self, order: &CheckoutOrder) -> Result<DispatchResult, DispatchFailure> {
        let created = self.orders.create(order).await?;

        info!(order_id = %created.id, "order created");

        Ok(DispatchResult::Created(created))
    }

    async fn redirect(
        &self,
        gateway: Gateway,
        order: &CheckoutOrder,
    ) -> Result<DispatchResult, DispatchFailure> {
        let request = GatewaySessionRequest {
            order_id: None,
            amount: order.total_amount,
            order_info: "Payment for storefront order".to_string(),
            order: Some(order.clone()),
        };

        let session = self.orders.create_gateway_session(gateway, &request).await?;

        match session.payment_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(DispatchResult::Redirect { url }),
            None => Err(DispatchFailure::MissingPaymentUrl(gateway)),
        }
    }

    async fn qr(
        &self,
        gateway: Gateway,
        order: &CheckoutOrder,
    ) -> Result<DispatchResult, DispatchFailure> {
        let created = self.orders.create(order).await?;

        info!(order_id = %created.id, %gateway, "order created, opening qr session");

        self.open_qr_session(gateway, created, order).await
    }

    /// Open a QR session for an order that already exists, without creating
    /// another one.
    #[tracing::instrument(
        name = "payments.resume_qr",
        skip(self, gateway, created, order),
        fields(gateway = gateway.as_str(), order_id = %created.id),
    )]
    pub async fn resume_qr(
        &self,
        gateway: Gateway,
        created: Order,
        order: &CheckoutOrder,
    ) -> DispatchResult {
        self.open_qr_session(gateway, created, order)
            .await
            .unwrap_or_else(|failure| {
                warn!(error = %failure, "qr session retry failed");

                DispatchResult::Failed(failure)
            })
    }

    async fn open_qr_session(
        &self,
        gateway: Gateway,
        created: Order,
        order: &CheckoutOrder,
    ) -> Result<DispatchResult, DispatchFailure> {
        let request = GatewaySessionRequest {
            order_id: Some(created.id.clone()),
            amount: order.total_amount,
            order_info: format!("Payment for order {}", created.id),
            order: None,
        };

        let GatewaySession {
            payment_url,
            qr_code,
            expires_in,
        } = match self.orders.create_gateway_session(gateway, &request).await {
            Ok(session) => session,
            Err(source) => {
                return Err(DispatchFailure::QrSessionFailed {
                    gateway,
                    order: created,
                    source,
                });
            }
        };

        if payment_url.is_none() && qr_code.is_none() {
            return Err(DispatchFailure::MissingQrCode {
                gateway,
                order: created,
            });
        }

        Ok(DispatchResult::QrSession(QrSession {
            order: created,
            gateway,
            payment_url,
            qr_code,
            expires_in: expires_in.map_or(self.qr_expiry, Duration::from_secs),
        }))
    }
}
