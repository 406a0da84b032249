use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::Args;
use tailwag::{
    api::ApiClient,
    checkout::{CheckoutOrchestrator, CheckoutOutcome},
    config::{ApiSettings, CheckoutConfig, StorageConfig},
    fixtures,
    payments::{PaymentDispatcher, QrCountdown, format_remaining},
    receipt::Receipt,
    session::CartSession,
};
use tracing::debug;

use super::say;

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    #[command(flatten)]
    api: ApiSettings,

    #[command(flatten)]
    storage: StorageConfig,

    #[command(flatten)]
    checkout: CheckoutConfig,

    /// Cart fixture (YAML)
    #[arg(long)]
    cart: PathBuf,

    /// Checkout form fixture (YAML)
    #[arg(long)]
    form: PathBuf,

    /// Voucher code to validate and apply before submitting
    #[arg(long)]
    voucher: Option<String>,

    /// Stay attached to a QR session until its countdown runs out
    #[arg(long)]
    wait: bool,
}

pub(crate) async fn run(args: CheckoutArgs) -> Result<(), String> {
    let CheckoutArgs {
        api,
        storage,
        checkout,
        cart,
        form,
        voucher,
        wait,
    } = args;

    let items = fixtures::read_cart(&cart).map_err(|error| format!("failed to load cart: {error}"))?;
    let form = fixtures::read_form(&form).map_err(|error| format!("failed to load form: {error}"))?;

    let store = storage.store();

    debug!(state_dir = %store.dir().display(), "restoring cart session");

    let session = CartSession::restore(items, Arc::new(store))
        .map_err(|error| format!("failed to restore cart: {error}"))?;

    let client = Arc::new(
        ApiClient::new(api.client_config())
            .map_err(|error| format!("failed to build API client: {error}"))?,
    );

    let dispatcher = PaymentDispatcher::new(client.clone()).with_qr_expiry(checkout.qr_expiry());
    let orchestrator = CheckoutOrchestrator::new(Arc::new(Mutex::new(session)), client, dispatcher);

    if let Some(code) = &voucher
        && let Err(error) = orchestrator.apply_voucher_code(code).await
    {
        say(&format!("voucher not applied: {}", error.user_message()))?;
    }

    print_receipt(&orchestrator)?;

    let outcome = orchestrator
        .submit(&form)
        .await
        .map_err(|error| error.user_message())?;

    match outcome {
        CheckoutOutcome::OrderCreated(order) => say(&format!("order {} placed", order.id)),
        CheckoutOutcome::Redirect { url } => say(&format!("continue payment at {url}")),
        CheckoutOutcome::QrPresented(session) => {
            say(&format!("order {} placed, pay with {}", session.order.id, session.gateway))?;

            if let Some(qr_code) = &session.qr_code {
                say(&format!("qr code: {qr_code}"))?;
            }

            if let Some(url) = &session.payment_url {
                say(&format!("payment link: {url}"))?;
            }

            let countdown = session.countdown();

            say(&format!("code expires in {}", countdown.display()))?;

            if wait {
                watch_countdown(&countdown).await?;
            }

            Ok(())
        }
    }
}

/// Print the remaining time each minute and through the final ten seconds.
async fn watch_countdown(countdown: &QrCountdown) -> Result<(), String> {
    let mut ticks = countdown.subscribe();

    while ticks.changed().await.is_ok() {
        let left = *ticks.borrow_and_update();

        if left == 0 {
            return say("qr code expired; the order stays open until payment is confirmed");
        }

        if left % 60 == 0 || left <= 10 {
            say(&format!("code expires in {}", format_remaining(left)))?;
        }
    }

    Ok(())
}

fn print_receipt(orchestrator: &CheckoutOrchestrator) -> Result<(), String> {
    let session = orchestrator
        .session()
        .lock()
        .map_err(|_poisoned| "cart session lock poisoned".to_string())?;

    let totals = session
        .totals()
        .map_err(|error| format!("failed to price cart: {error}"))?;

    let mut receipt = Receipt::new(session.items(), totals);

    if let Some(applied) = session.discount().applied() {
        receipt = receipt.with_voucher(applied.voucher.code.clone(), applied.evaluation);
    }

    receipt
        .write_to(io::stdout().lock())
        .map_err(|error| format!("failed to write receipt: {error}"))
}
