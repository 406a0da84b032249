//! Appointment availability.

use async_trait::async_trait;
use jiff::civil::Date;
use mockall::automock;
use reqwest::Method;

use crate::{
    api::{ApiClient, ApiError, models::BookedTimes},
    booking::ServiceId,
};

#[async_trait]
impl AvailabilityService for ApiClient {
    #[tracing::instrument(
        name = "appointments.service.booked_times",
        skip(self, service, date),
        fields(service_id = %service, date = %date, booked_count = tracing::field::Empty),
        err
    )]
    async fn booked_times(&self, service: ServiceId, date: Date) -> Result<Vec<String>, ApiError> {
        let response = self
            .request(Method::GET, "appointments/booked-times")
            .query(&[
                ("service_id", service.to_string()),
                ("date", date.to_string()),
            ])
            .send()
            .await?;

        let times: Vec<String> = Self::read::<BookedTimes>(response).await?.into();

        tracing::Span::current().record("booked_count", times.len());

        Ok(times)
    }
}

/// Remote appointment availability.
#[automock]
#[async_trait]
pub trait AvailabilityService: Send + Sync {
    /// Times of day already booked for `service` on `date`, as sent by the server.
    async fn booked_times(&self, service: ServiceId, date: Date) -> Result<Vec<String>, ApiError>;
}
