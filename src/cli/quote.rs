use std::{io, path::PathBuf, sync::Arc};

use clap::Args;
use tailwag::{
    discount::MemoryStore, fixtures, receipt::Receipt, session::CartSession,
};

#[derive(Debug, Args)]
pub(crate) struct QuoteArgs {
    /// Cart fixture (YAML)
    #[arg(long)]
    cart: PathBuf,

    /// Voucher fixture (YAML) to apply
    #[arg(long)]
    voucher: Option<PathBuf>,
}

pub(crate) fn run(args: QuoteArgs) -> Result<(), String> {
    let QuoteArgs { cart, voucher } = args;

    let items = fixtures::read_cart(&cart).map_err(|error| format!("failed to load cart: {error}"))?;

    let mut session = CartSession::restore(items, Arc::new(MemoryStore::new()))
        .map_err(|error| format!("failed to price cart: {error}"))?;

    let applied = match voucher {
        Some(path) => {
            let voucher = fixtures::read_voucher(&path)
                .map_err(|error| format!("failed to load voucher: {error}"))?;
            let code = voucher.code.clone();

            let evaluation = session
                .apply_voucher(voucher)
                .map_err(|error| format!("failed to apply voucher: {error}"))?;

            Some((code, evaluation))
        }
        None => None,
    };

    let totals = session
        .totals()
        .map_err(|error| format!("failed to price cart: {error}"))?;

    let mut receipt = Receipt::new(session.items(), totals);

    if let Some((code, evaluation)) = applied {
        receipt = receipt.with_voucher(code, evaluation);
    }

    receipt
        .write_to(io::stdout().lock())
        .map_err(|error| format!("failed to write receipt: {error}"))
}
