use std::sync::Arc;

use clap::Args;
use jiff::{Zoned, civil::Date};
use tailwag::{
    api::ApiClient,
    booking::{BookingSlotAdvisor, ServiceId},
    config::ApiSettings,
};

use super::{say, table};

#[derive(Debug, Args)]
pub(crate) struct SlotsArgs {
    #[command(flatten)]
    api: ApiSettings,

    /// Service to book
    #[arg(long)]
    service_id: u64,

    /// Appointment date (YYYY-MM-DD)
    #[arg(long)]
    date: Date,
}

pub(crate) async fn run(args: SlotsArgs) -> Result<(), String> {
    let SlotsArgs { api, service_id, date } = args;

    let client = ApiClient::new(api.client_config())
        .map_err(|error| format!("failed to build API client: {error}"))?;

    let mut advisor = BookingSlotAdvisor::new(Arc::new(client), ServiceId(service_id));

    advisor
        .select_date(date)
        .await
        .map_err(|error| format!("failed to load booked times: {error}"))?;

    let rows = advisor
        .slots(Zoned::now().datetime())
        .iter()
        .map(|slot| {
            let status = if slot.available { "available" } else { "unavailable" };

            [slot.label(), status.to_string()]
        })
        .collect();

    say(&table(["Time", "Status"], rows))
}
