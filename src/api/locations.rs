//! Administrative region lookup for the new-address form.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;

use crate::api::{
    ApiClient, ApiError,
    models::{Region, RegionList},
};

impl ApiClient {
    async fn regions(&self, path: &str) -> Result<Vec<Region>, ApiError> {
        let response = self.request(Method::GET, path).send().await?;

        Ok(Self::read::<RegionList>(response).await?.into())
    }
}

#[async_trait]
impl AddressLookup for ApiClient {
    #[tracing::instrument(name = "locations.service.provinces", skip(self), err)]
    async fn provinces(&self) -> Result<Vec<Region>, ApiError> {
        self.regions("locations/provinces").await
    }

    #[tracing::instrument(name = "locations.service.districts", skip(self), err)]
    async fn districts(&self, province_code: &str) -> Result<Vec<Region>, ApiError> {
        self.regions(&format!("locations/provinces/{province_code}/districts"))
            .await
    }

    #[tracing::instrument(name = "locations.service.wards", skip(self), err)]
    async fn wards(&self, district_code: &str) -> Result<Vec<Region>, ApiError> {
        self.regions(&format!("locations/districts/{district_code}/wards"))
            .await
    }
}

/// Province, district and ward lookup.
#[automock]
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// All provinces.
    async fn provinces(&self) -> Result<Vec<Region>, ApiError>;

    /// Districts of a province.
    async fn districts(&self, province_code: &str) -> Result<Vec<Region>, ApiError>;

    /// Wards of a district.
    async fn wards(&self, district_code: &str) -> Result<Vec<Region>, ApiError>;
}
