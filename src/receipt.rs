//! Receipt
//!
//! Terminal rendering of a priced cart.

use std::{fmt::Write as _, io};

use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::CartLineItem,
    pricing::{self, CartTotals, PricingError},
    vouchers::{Evaluation, VoucherCode},
};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// A line could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// A priced cart ready for display.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    items: &'a [CartLineItem],
    totals: CartTotals,
    voucher: Option<(VoucherCode, Evaluation)>,
}

impl<'a> Receipt<'a> {
    /// Create a receipt for `items` with the given totals.
    #[must_use]
    pub fn new(items: &'a [CartLineItem], totals: CartTotals) -> Self {
        Self {
            items,
            totals,
            voucher: None,
        }
    }

    /// Show the applied voucher and how it evaluated.
    #[must_use]
    pub fn with_voucher(mut self, code: VoucherCode, evaluation: Evaluation) -> Self {
        self.voucher = Some((code, evaluation));
        self
    }

    /// The totals shown.
    #[must_use]
    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Writes the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be priced or the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Unit Price", "Qty", "Line Total"]);

        for (index, item) in self.items.iter().enumerate() {
            let unit_price = match item.sale_price() {
                Some(sale_price) => format!("{sale_price} (was {})", item.unit_price()),
                None => item.unit_price().to_string(),
            };

            builder.push_record([
                format!("#{:<3}", index + 1),
                item.name().to_string(),
                unit_price,
                item.quantity().to_string(),
                pricing::line_total(item)?.to_string(),
            ]);
        }

        write_table(&mut out, builder)?;
        write_summary(&mut out, self)
    }
}

fn write_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_summary(out: &mut impl io::Write, receipt: &Receipt<'_>) -> Result<(), ReceiptError> {
    let totals = &receipt.totals;

    let discount_label = match &receipt.voucher {
        Some((code, _)) => format!("Discount ({code}):"),
        None => "Discount:".to_string(),
    };

    let shipping = if totals.shipping_fee.is_zero() {
        "Free".to_string()
    } else {
        totals.shipping_fee.to_string()
    };

    let lines = [
        ("Items:".to_string(), totals.item_count.to_string()),
        ("Subtotal:".to_string(), totals.subtotal.to_string()),
        (discount_label, format!("-{}", totals.discount)),
        ("Shipping:".to_string(), shipping),
        ("Total:".to_string(), totals.total.to_string()),
    ];

    let label_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = lines.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

    for (label, value) in &lines {
        writeln!(out, " {label:>label_width$}  {value:>value_width$}")
            .map_err(|_err| ReceiptError::IO)?;
    }

    if let Some((code, evaluation)) = &receipt.voucher {
        if let Some(reason) = evaluation.ineligibility {
            writeln!(out, "\n Voucher {code} not applied: {reason}").map_err(|_err| ReceiptError::IO)?;
        } else if evaluation.free_shipping {
            writeln!(out, "\n Voucher {code}: free shipping").map_err(|_err| ReceiptError::IO)?;
        }
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        cart::ProductId,
        money::{amount, zero},
        vouchers::{Voucher, VoucherKind, evaluate},
    };

    use super::*;

    fn render(receipt: &Receipt<'_>) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();

        receipt.write_to(&mut out)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn renders_lines_and_totals() -> TestResult {
        let items = [
            CartLineItem::new(ProductId(1), "Salmon kibble", amount(200_000), 2)?
                .with_sale_price(amount(180_000)),
            CartLineItem::new(ProductId(2), "Rope toy", amount(140_000), 1)?,
        ];

        let voucher = Voucher::new(VoucherCode::parse("PET10")?, VoucherKind::Percentage, Decimal::TEN)
            .with_max_discount(Decimal::from(40_000));
        let subtotal = pricing::subtotal(&items)?;
        let evaluation = evaluate(Some(&voucher), &subtotal, Timestamp::now())?;
        let totals = pricing::totals(&items, &evaluation.discount, evaluation.free_shipping)?;

        let output = render(&Receipt::new(&items, totals).with_voucher(voucher.code, evaluation))?;

        assert!(output.contains("Salmon kibble"), "missing item name:\n{output}");
        assert!(output.contains("Discount (PET10):"), "missing voucher label:\n{output}");
        assert!(output.contains(&amount(460_000).to_string()), "missing total:\n{output}");
        assert!(output.contains("Free"), "shipping should be waived:\n{output}");

        Ok(())
    }

    #[test]
    fn notes_ineligible_voucher() -> TestResult {
        let items = [CartLineItem::new(ProductId(3), "Shampoo", amount(150_000), 1)?];

        let voucher = Voucher::new(VoucherCode::parse("BIG50K")?, VoucherKind::FixedAmount, Decimal::from(50_000))
            .with_min_order(Decimal::from(200_000));
        let evaluation = evaluate(Some(&voucher), &amount(150_000), Timestamp::now())?;
        let totals = pricing::totals(&items, &zero(), false)?;

        let output = render(&Receipt::new(&items, totals).with_voucher(voucher.code, evaluation))?;

        assert!(output.contains("Voucher BIG50K not applied"), "missing note:\n{output}");

        Ok(())
    }
}
