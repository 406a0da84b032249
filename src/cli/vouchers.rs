use clap::Args;
use tailwag::{
    api::{ApiClient, VoucherService},
    config::ApiSettings,
    money::amount,
    vouchers::Voucher,
};

use super::{say, table};

#[derive(Debug, Args)]
pub(crate) struct VouchersArgs {
    #[command(flatten)]
    api: ApiSettings,

    /// Order amount in dong
    #[arg(long)]
    amount: i64,
}

pub(crate) async fn run(args: VouchersArgs) -> Result<(), String> {
    let VouchersArgs { api, amount: order_amount } = args;

    let client = ApiClient::new(api.client_config())
        .map_err(|error| format!("failed to build API client: {error}"))?;

    let vouchers = client
        .list_available(amount(order_amount))
        .await
        .map_err(|error| format!("failed to list vouchers: {error}"))?;

    if vouchers.is_empty() {
        return say(&format!("no vouchers available for an order of {}", amount(order_amount)));
    }

    let rows = vouchers
        .iter()
        .map(|voucher| {
            [
                voucher.code.to_string(),
                voucher.kind.as_str().to_string(),
                voucher.value.to_string(),
                or_dash(voucher.min_order_amount),
                or_dash(voucher.max_discount_amount),
                or_dash(voucher.valid_until),
                usage(voucher),
            ]
        })
        .collect();

    say(&table(
        ["Code", "Type", "Value", "Min Order", "Max Discount", "Valid Until", "Uses"],
        rows,
    ))
}

fn or_dash(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn usage(voucher: &Voucher) -> String {
    if voucher.usage_exhausted() {
        return "used up".to_string();
    }

    match (voucher.used_count, voucher.usage_limit) {
        (used, Some(limit)) => format!("{}/{limit}", used.unwrap_or(0)),
        _ => "-".to_string(),
    }
}
