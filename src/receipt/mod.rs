//! Receipt

use std::{fmt::Write, io, ops::Range};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
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
    draft::{ApartmentLine, ItemLine},
    guests::Guest,
    orders::Order,
    records::codec::format_date_time,
};

pub mod reports;

/// Errors that can occur when rendering a receipt or report.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The output could not be written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Booking receipt for a confirmed order.
#[derive(Debug, Clone)]
pub struct Receipt<'o, 'a> {
    order: &'o Order<'a>,
    guest_name: Option<String>,
}

impl<'o, 'a> Receipt<'o, 'a> {
    /// Receipt for `order`, naming the guest when known.
    #[must_use]
    pub fn new(order: &'o Order<'a>, guest: Option<&Guest>) -> Self {
        Self {
            order,
            guest_name: guest.map(Guest::full_name),
        }
    }

    /// Order the receipt is for.
    #[must_use]
    pub fn order(&self) -> &'o Order<'a> {
        self.order
    }

    /// Total before the redemption discount.
    #[must_use]
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.order.subtotal()
    }

    /// Amount paid.
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.order.total()
    }

    /// Amount saved by redeeming points.
    #[must_use]
    pub fn savings(&self) -> Money<'a, Currency> {
        self.order.discount()
    }

    /// Savings as a fraction of the subtotal.
    #[must_use]
    pub fn savings_percent(&self) -> Percentage {
        let savings_minor = self.savings().to_minor_units();
        let subtotal_minor = self.subtotal().to_minor_units();

        if subtotal_minor == 0 {
            return Percentage::from(0.0);
        }

        Percentage::from(Decimal::from(savings_minor) / Decimal::from(subtotal_minor))
    }

    /// Writes the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        write_receipt_header(&mut out, self)?;

        let mut builder = Builder::default();
        let mut grey_rows = Vec::new();

        builder.push_record(["", "Product", "Qty", "Unit Price", "Total"]);

        let mut row = 1;
        let mut line_no = 1;

        if let Some(bundle) = self.order.bundle() {
            builder.push_record([
                format!("#{line_no:<3}"),
                format!("{} ({})", bundle.name, bundle.bundle_id),
                "1 booking".to_string(),
                bundle.price.to_string(),
                bundle.price.to_string(),
            ]);
            row += 1;
            line_no += 1;

            builder.push_record(expansion_row(
                &bundle.apartment.name,
                &format!("{} nights", bundle.apartment.nights),
            ));
            grey_rows.push(row);
            row += 1;

            for item in &bundle.items {
                builder.push_record(expansion_row(&item.name, &format!("{} units", item.quantity)));
                grey_rows.push(row);
                row += 1;
            }
        }

        if let Some(apartment) = self.order.apartment() {
            builder.push_record(apartment_row(line_no, apartment));
            line_no += 1;
        }

        for item in self.order.items() {
            builder.push_record(item_row(line_no, item));
            line_no += 1;
        }

        let mut table = build_table(builder, 3..5);

        for row in grey_rows {
            table.modify(Rows::new(row..=row), color_dark_grey());
        }

        let table_str = colorize_borders(&table.to_string());

        writeln!(out, "\n{table_str}")?;

        write_receipt_summary(&mut out, self)
    }
}

fn apartment_row(line_no: usize, line: &ApartmentLine<'_>) -> [String; 5] {
    [
        format!("#{line_no:<3}"),
        format!("{} ({})", line.name, line.apartment_id),
        format!("{} nights", line.nights),
        line.rate.to_string(),
        line.total.to_string(),
    ]
}

fn item_row(line_no: usize, line: &ItemLine<'_>) -> [String; 5] {
    [
        format!("#{line_no:<3}"),
        format!("{} ({})", line.name, line.item_id),
        format!("{} units", line.quantity),
        line.unit_price.to_string(),
        line.total.to_string(),
    ]
}

fn expansion_row(name: &str, quantity: &str) -> [String; 5] {
    [
        String::new(),
        format!("  incl. {name}"),
        quantity.to_string(),
        String::new(),
        String::new(),
    ]
}

fn write_receipt_header(out: &mut impl io::Write, receipt: &Receipt<'_, '_>) -> Result<(), ReceiptError> {
    let order = receipt.order;
    let stay = order.stay();
    let guest = receipt
        .guest_name
        .as_deref()
        .map_or_else(|| order.guest_id().to_string(), |name| format!("{name} ({})", order.guest_id()));

    writeln!(out, "\n \x1b[1mBooking {}\x1b[0m", order.id())?;
    writeln!(out, " Guest:  {guest}")?;
    writeln!(
        out,
        " Stay:   {} to {} ({} nights, party of {})",
        format_date_time(stay.check_in),
        format_date_time(stay.check_out),
        order.nights(),
        order.party_size()
    )
    ?;
    writeln!(out, " Booked: {}", format_date_time(order.booked_at())).map_err(ReceiptError::from)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt<'_, '_>,
) -> Result<(), ReceiptError> {
    let savings = receipt.savings();
    let savings_percent_points = percent_points_from_fractional_percentage(receipt.savings_percent());

    let subtotal_label = " Subtotal:";
    let discount_label = " Discount:";
    let total_label = " \x1b[1mTotal:\x1b[0m";
    let points_label = " Reward points:";

    let subtotal_val = format!("{}  ", receipt.subtotal());
    let discount_val = if receipt.order.points_redeemed() > 0 || savings.to_minor_units() > 0 {
        format!("({savings_percent_points:.2}%) -{savings}  ")
    } else {
        format!("{savings}  ")
    };
    let total_val = format!("{}  ", receipt.total());
    let points_val = format!("{}  ", receipt.order.reward_points());

    let label_width = [subtotal_label, discount_label, total_label, points_label]
        .into_iter()
        .map(visible_width)
        .max()
        .unwrap_or_default();

    let value_width = [&subtotal_val, &discount_val, &total_val, &points_val]
        .into_iter()
        .map(String::len)
        .max()
        .unwrap_or_default();

    write_summary_line(out, subtotal_label, &subtotal_val, label_width, value_width)?;
    write_summary_line(out, discount_label, &discount_val, label_width, value_width)?;

    write_summary_line(
        out,
        total_label,
        &format!("\x1b[1m{total_val}\x1b[0m"),
        label_width,
        value_width,
    )?;

    write_summary_line(out, points_label, &points_val, label_width, value_width)?;

    if receipt.order.points_redeemed() > 0 {
        writeln!(out, " Points redeemed: {}", receipt.order.points_redeemed())
            ?;
    }

    writeln!(out).map_err(ReceiptError::from)
}

/// Build a table with a separator under the header row and the given columns
/// right-aligned.
pub(crate) fn build_table(builder: Builder, right_aligned: Range<usize>) -> tabled::Table {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(right_aligned), Alignment::right());

    table
}

/// Converts a fractional percentage to percent points for display.
fn percent_points_from_fractional_percentage(percentage: Percentage) -> Decimal {
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
pub(crate) fn colorize_borders(table: &str) -> String {
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

/// Removes ANSI escape sequences, for output written to files.
pub(crate) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            out.push(ch);
        }
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(ReceiptError::from)
}

/// ANSI dark grey foreground.
pub(crate) fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}
