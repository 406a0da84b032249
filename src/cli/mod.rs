use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tabled::{
    builder::Builder,
    settings::{Color, Style, object::Rows},
};
use tailwag::{config::LoggingConfig, observability};

mod checkout;
mod quote;
mod slots;
mod vouchers;

#[derive(Debug, Parser)]
#[command(name = "tailwag", about = "Storefront pricing and checkout", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price a cart file, optionally with a voucher file
    Quote(quote::QuoteArgs),

    /// List vouchers available for an order amount
    Vouchers(vouchers::VouchersArgs),

    /// Show bookable slots for a service on a date
    Slots(slots::SlotsArgs),

    /// Place an order for a cart file
    Checkout(checkout::CheckoutArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_subscriber(&self.logging)
            .map_err(|error| format!("failed to initialise logging: {error}"))?;

        match self.command {
            Commands::Quote(args) => quote::run(args),
            Commands::Vouchers(args) => vouchers::run(args).await,
            Commands::Slots(args) => slots::run(args).await,
            Commands::Checkout(args) => checkout::run(args).await,
        }
    }
}

/// Write an error to stderr.
pub(crate) fn report(error: &str) {
    let mut stderr = io::stderr().lock();

    _ = writeln!(stderr, "{error}");
}

/// Write a line to stdout.
pub(crate) fn say(line: &str) -> Result<(), String> {
    writeln!(io::stdout().lock(), "{line}").map_err(|error| format!("failed to write output: {error}"))
}

/// Render rows under a bold header in the receipt's table style.
pub(crate) fn table<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) -> String {
    let mut builder = Builder::default();

    builder.push_record(header);

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);

    table.to_string()
}
