//! Voucher lookup service.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;

use crate::{
    api::{
        ApiClient, ApiError,
        models::{ValidateVoucherRequest, VoucherList, VoucherValidation},
    },
    money::Amount,
    vouchers::{Voucher, VoucherCode},
};

#[async_trait]
impl VoucherService for ApiClient {
    #[tracing::instrument(
        name = "vouchers.service.validate",
        skip(self, code, order_amount),
        fields(code = %code, order_amount = order_amount.to_minor_units()),
        err
    )]
    async fn validate(
        &self,
        code: &VoucherCode,
        order_amount: Amount,
    ) -> Result<VoucherValidation, ApiError> {
        let response = self
            .request(Method::POST, "vouchers/validate")
            .json(&ValidateVoucherRequest {
                code: code.as_str(),
                order_amount: order_amount.to_minor_units(),
            })
            .send()
            .await?;

        Self::read(response).await
    }

    #[tracing::instrument(
        name = "vouchers.service.list_available",
        skip(self, order_amount),
        fields(order_amount = order_amount.to_minor_units(), voucher_count = tracing::field::Empty),
        err
    )]
    async fn list_available(&self, order_amount: Amount) -> Result<Vec<Voucher>, ApiError> {
        let response = self
            .request(Method::GET, "vouchers/available")
            .query(&[("order_amount", order_amount.to_minor_units())])
            .send()
            .await?;

        let vouchers: Vec<Voucher> = Self::read::<VoucherList>(response).await?.into();

        tracing::Span::current().record("voucher_count", vouchers.len());

        Ok(vouchers)
    }
}

/// Remote voucher catalog.
#[automock]
#[async_trait]
pub trait VoucherService: Send + Sync {
    /// Ask the server whether `code` applies to an order of `order_amount`.
    async fn validate(
        &self,
        code: &VoucherCode,
        order_amount: Amount,
    ) -> Result<VoucherValidation, ApiError>;

    /// Vouchers the customer may pick from for an order of `order_amount`.
    async fn list_available(&self, order_amount: Amount) -> Result<Vec<Voucher>, ApiError>;
}
