//! Reports
//!
//! Tabular listings for the shell: catalog, guests, guest order history,
//! booking statistics and bundle performance.

use std::io;

use tabled::builder::Builder;

use crate::{
    catalog::Catalog,
    guests::{Guest, GuestLedger},
    orders::{BookingPeriod, BundleReport, Order, Statistics},
    products::Product,
    receipt::{ReceiptError, build_table, colorize_borders},
    records::codec::{format_date, format_date_time},
};

fn write_table(
    out: &mut impl io::Write,
    title: &str,
    builder: Builder,
    right_aligned: std::ops::Range<usize>,
) -> Result<(), ReceiptError> {
    let table = build_table(builder, right_aligned);
    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n \x1b[1m{title}\x1b[0m\n{table_str}").map_err(ReceiptError::from)
}

/// Writes every product in catalog order.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_catalog(mut out: impl io::Write, catalog: &Catalog<'_>) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Kind", "Name", "Price", "Details"]);

    for product in catalog.iter() {
        let details = match product {
            Product::Apartment(apartment) => format!("sleeps {}", apartment.capacity),
            Product::Item(item) => item.description.clone(),
            Product::Bundle(bundle) => bundle.components.to_string(),
        };

        builder.push_record([
            product.id().to_string(),
            product.kind().label().to_string(),
            product.name().to_string(),
            product.price().to_string(),
            details,
        ]);
    }

    write_table(&mut out, "Products", builder, 3..4)
}

/// Writes every guest in registration order.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_guests(mut out: impl io::Write, ledger: &GuestLedger) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Name", "Date of Birth", "Points", "Reward Rate", "Redeem Rate"]);

    for guest in ledger.iter() {
        builder.push_record([
            guest.id().to_string(),
            guest.full_name(),
            format_date(guest.date_of_birth()),
            guest.reward_points().to_string(),
            format!("{}%", guest.reward_rate().normalize()),
            guest.redeem_rate().normalize().to_string(),
        ]);
    }

    write_table(&mut out, "Guests", builder, 3..6)
}

/// Writes a guest's orders, oldest booking first.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_history(
    mut out: impl io::Write,
    guest: &Guest,
    orders: &[&Order<'_>],
) -> Result<(), ReceiptError> {
    if orders.is_empty() {
        return writeln!(out, "\n {} has no orders", guest.full_name())
            .map_err(ReceiptError::from);
    }

    let mut builder = Builder::default();

    builder.push_record(["Order", "Booked", "Check-in", "Nights", "Products", "Total", "Points"]);

    for order in orders {
        builder.push_record([
            order.id().to_string(),
            format_date_time(order.booked_at()),
            format_date_time(order.stay().check_in),
            order.nights().to_string(),
            order_products(order),
            order.total().to_string(),
            order.reward_points().to_string(),
        ]);
    }

    let title = format!("Order history for {} ({})", guest.full_name(), guest.id());

    write_table(&mut out, &title, builder, 5..7)
}

fn order_products(order: &Order<'_>) -> String {
    order
        .product_quantities()
        .into_iter()
        .map(|(id, quantity)| format!("{quantity} x {id}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the top guests by spend and top products by booked quantity,
/// resolving names through the catalog and ledger.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_statistics(
    mut out: impl io::Write,
    statistics: &Statistics<'_>,
    catalog: &Catalog<'_>,
    ledger: &GuestLedger,
) -> Result<(), ReceiptError> {
    let mut guests = Builder::default();

    guests.push_record(["", "Guest", "ID", "Spend"]);

    for (rank, spend) in statistics.top_guests.iter().enumerate() {
        let name = ledger
            .get(&spend.guest_id)
            .map_or_else(|| "<unknown>".to_string(), Guest::full_name);

        guests.push_record([
            format!("#{}", rank + 1),
            name,
            spend.guest_id.clone(),
            spend.total.to_string(),
        ]);
    }

    write_table(&mut out, "Top guests", guests, 3..4)?;

    let mut products = Builder::default();

    products.push_record(["", "Product", "ID", "Kind", "Booked"]);

    for (rank, usage) in statistics.top_products.iter().enumerate() {
        let name = catalog
            .get(&usage.product_id)
            .map_or("<removed>", Product::name);
        let (kind, unit) = usage
            .kind
            .map_or(("", ""), |kind| (kind.label(), kind.quantity_unit()));

        products.push_record([
            format!("#{}", rank + 1),
            name.to_string(),
            usage.product_id.clone(),
            kind.to_string(),
            format!("{} {unit}", usage.quantity),
        ]);
    }

    write_table(&mut out, "Top products", products, 4..5)
}

/// Writes per-bundle bookings, revenue, points, distinct guests and monthly
/// booking counts, highest revenue first, followed by the totals.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_bundle_report(
    mut out: impl io::Write,
    report: &BundleReport<'_>,
) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record([
        "Bundle", "ID", "Bookings", "Revenue", "Average", "Points", "Guests", "Monthly",
    ]);

    for bundle in &report.bundles {
        let monthly = bundle
            .monthly
            .iter()
            .map(|(month, count)| format!("{}: {count}", month.strftime("%B %Y")))
            .collect::<Vec<_>>()
            .join("\n");

        builder.push_record([
            bundle.name.clone(),
            bundle.bundle_id.clone(),
            bundle.bookings.to_string(),
            bundle.revenue.to_string(),
            bundle.average_revenue.to_string(),
            bundle.reward_points.to_string(),
            bundle.unique_guests.to_string(),
            monthly,
        ]);
    }

    let title = format!("Bundle performance, {}", period_label(&report.period));

    write_table(&mut out, &title, builder, 2..7)?;

    writeln!(
        out,
        " Bundles: {}  Bookings: {}  Revenue: {}  Average: {}  Points: {}",
        report.bundles.len(),
        report.bookings,
        report.revenue,
        report.average_revenue,
        report.reward_points
    )?;

    Ok(())
}

fn period_label(period: &BookingPeriod) -> String {
    match (period.from, period.to) {
        (None, None) => "all bookings".to_string(),
        (Some(from), None) => format!("booked from {}", format_date(from)),
        (None, Some(to)) => format!("booked up to {}", format_date(to)),
        (Some(from), Some(to)) => {
            format!("booked {} to {}", format_date(from), format_date(to))
        }
    }
}
