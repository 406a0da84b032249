//! Order creation and payment gateway sessions.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;

use crate::{
    api::{
        ApiClient, ApiError,
        models::{GatewaySession, GatewaySessionRequest, Order, OrderEnvelope},
    },
    checkout::CheckoutOrder,
    payments::Gateway,
};

#[async_trait]
impl OrderService for ApiClient {
    #[tracing::instrument(
        name = "orders.service.create",
        skip(self, order),
        fields(
            payment_method = %order.payment_method,
            total_amount = order.total_amount,
            order_id = tracing::field::Empty
        ),
        err
    )]
    async fn create(&self, order: &CheckoutOrder) -> Result<Order, ApiError> {
        let response = self.request(Method::POST, "orders").json(order).send().await?;

        let order: Order = Self::read::<OrderEnvelope>(response).await?.into();

        tracing::Span::current().record("order_id", tracing::field::display(&order.id));

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.create_gateway_session",
        skip(self, gateway, request),
        fields(gateway = gateway.as_str(), amount = request.amount),
        err
    )]
    async fn create_gateway_session(
        &self,
        gateway: Gateway,
        request: &GatewaySessionRequest,
    ) -> Result<GatewaySession, ApiError> {
        let path = format!("payments/{}/create", gateway.as_str());

        let response = self.request(Method::POST, &path).json(request).send().await?;

        Self::read(response).await
    }
}

/// Remote order and payment endpoints.
#[automock]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order.
    async fn create(&self, order: &CheckoutOrder) -> Result<Order, ApiError>;

    /// Open a payment session with an external gateway.
    async fn create_gateway_session(
        &self,
        gateway: Gateway,
        request: &GatewaySessionRequest,
    ) -> Result<GatewaySession, ApiError>;
}
