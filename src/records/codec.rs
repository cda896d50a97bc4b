//! Record codecs
//!
//! Comma-separated line formats for products, guests and orders.

use jiff::civil::{Date, DateTime};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    guests::{Guest, GuestError},
    orders::Order,
    pricing::{format_amount, parse_minor_units},
    products::{
        ApartmentUnit, Bundle, BundleComponents, Product, ProductError, ProductKind,
        SupplementaryItem,
    },
};

/// Day-first date format used in every record.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Day-first date and time format used for stays and bookings.
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Errors raised while parsing a single record line.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// Wrong number of fields for the record shape.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Shape description
        expected: &'static str,
        /// Fields present
        found: usize,
    },

    /// First field is not a product id.
    #[error("unrecognised product id {0:?}")]
    UnknownKind(String),

    /// Malformed amount.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    /// Malformed whole number.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// Malformed date or date-time.
    #[error("invalid date {0:?}, expected dd/mm/yyyy [HH:MM]")]
    InvalidDate(String),

    /// Malformed `<quantity> x <product id> [@ <unit price>]` line.
    #[error("invalid order line {0:?}, expected <quantity> x <product id> [@ <unit price>]")]
    InvalidLine(String),

    /// Product validation failed.
    #[error(transparent)]
    Product(#[from] ProductError),

    /// Guest validation failed.
    #[error(transparent)]
    Guest(#[from] GuestError),
}

/// One `<quantity> x <product id> @ <unit price>` line of an order record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRecord {
    /// Nights for an apartment, units for an item, always 1 for a bundle
    pub quantity: u32,

    /// Product id
    pub product_id: String,

    /// Unit price at booking time, in minor units. Lines written without one
    /// take the current catalog price.
    pub unit_price_minor: Option<i64>,
}

/// An order record as persisted, before its lines are rebuilt against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    /// When the order was confirmed
    pub booked_at: DateTime,

    /// Guest id
    pub guest_id: String,

    /// Check-in
    pub check_in: DateTime,

    /// Check-out
    pub check_out: DateTime,

    /// Nights stayed
    pub nights: u32,

    /// Guests staying
    pub party_size: u32,

    /// Booked lines
    pub lines: Vec<OrderLineRecord>,

    /// Final total in minor units
    pub total_minor: i64,

    /// Points awarded
    pub reward_points: u64,
}

/// Split a record line into trimmed fields.
pub fn fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn parse_amount<'a>(s: &str, currency: &'a Currency) -> Result<Money<'a, Currency>, RecordError> {
    parse_minor_units(s)
        .map(|minor| Money::from_minor(minor, currency))
        .ok_or_else(|| RecordError::InvalidAmount(s.to_string()))
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, RecordError> {
    s.trim()
        .parse()
        .map_err(|_err| RecordError::InvalidNumber(s.to_string()))
}

/// Parse a `dd/mm/yyyy` date.
///
/// # Errors
///
/// Returns [`RecordError::InvalidDate`] for anything else.
pub fn parse_date(s: &str) -> Result<Date, RecordError> {
    Date::strptime(DATE_FORMAT, s.trim()).map_err(|_err| RecordError::InvalidDate(s.to_string()))
}

/// Parse `dd/mm/yyyy HH:MM`, or a bare `dd/mm/yyyy` meaning midnight.
///
/// # Errors
///
/// Returns [`RecordError::InvalidDate`] for anything else.
pub fn parse_date_time(s: &str) -> Result<DateTime, RecordError> {
    let s = s.trim();

    if let Ok(date_time) = DateTime::strptime(DATE_TIME_FORMAT, s) {
        return Ok(date_time);
    }

    parse_date(s).map(|date| date.at(0, 0, 0, 0))
}

/// Format a date as `dd/mm/yyyy`.
pub fn format_date(date: Date) -> String {
    date.strftime(DATE_FORMAT).to_string()
}

/// Format a date-time as `dd/mm/yyyy HH:MM`.
pub fn format_date_time(date_time: DateTime) -> String {
    date_time.strftime(DATE_TIME_FORMAT).to_string()
}

/// Parse a catalog record. Bundle prices are placeholders until the catalog
/// prices the components.
///
/// # Errors
///
/// Returns a [`RecordError`] if the line has the wrong shape or fails validation.
pub fn parse_product<'a>(line: &str, currency: &'a Currency) -> Result<Product<'a>, RecordError> {
    let fields = fields(line);
    let id = fields.first().copied().unwrap_or_default();

    match ProductKind::from_id(id) {
        Some(ProductKind::Apartment) => match fields.as_slice() {
            [id, name, rate, capacity] => Ok(Product::Apartment(ApartmentUnit::new(
                *id,
                *name,
                parse_amount(rate, currency)?,
                parse_number(capacity)?,
            )?)),
            _ => Err(RecordError::FieldCount {
                expected: "4 (ID, Name, RatePerNight, Capacity)",
                found: fields.len(),
            }),
        },
        Some(ProductKind::Item) => match fields.as_slice() {
            [id, name, price, description @ ..] if !description.is_empty() => {
                Ok(Product::Item(SupplementaryItem::new(
                    *id,
                    *name,
                    parse_amount(price, currency)?,
                    description.join(", "),
                )?))
            }
            _ => Err(RecordError::FieldCount {
                expected: "4 (ID, Name, Price, Description)",
                found: fields.len(),
            }),
        },
        Some(ProductKind::Bundle) => match fields.as_slice() {
            [id, name, apartment_id, item_ids @ .., price] => {
                let components = BundleComponents::from_ids(id, apartment_id, item_ids)?;

                Ok(Product::Bundle(Bundle::new(
                    *id,
                    *name,
                    components,
                    parse_amount(price, currency)?,
                )?))
            }
            _ => Err(RecordError::FieldCount {
                expected: "at least 4 (ID, Name, ApartmentID, ..., Price)",
                found: fields.len(),
            }),
        },
        None => Err(RecordError::UnknownKind(id.to_string())),
    }
}

/// Format a catalog record.
pub fn format_product(product: &Product<'_>) -> String {
    match product {
        Product::Apartment(apartment) => format!(
            "{}, {}, {}, {}",
            apartment.id,
            apartment.name,
            format_amount(&apartment.rate),
            apartment.capacity
        ),
        Product::Item(item) => format!(
            "{}, {}, {}, {}",
            item.id,
            item.name,
            format_amount(&item.price),
            item.description
        ),
        Product::Bundle(bundle) => {
            let price = format_amount(&bundle.price);
            let mut fields = vec![
                bundle.id.as_str(),
                bundle.name.as_str(),
                bundle.components.apartment_id.as_str(),
            ];

            fields.extend(bundle.components.flat_item_ids());
            fields.push(&price);

            fields.join(", ")
        }
    }
}

/// Parse a guest record: `FirstName, LastName, DateOfBirth, Points, RewardRate, RedeemRate`.
///
/// # Errors
///
/// Returns a [`RecordError`] if the line has the wrong shape or fails validation.
pub fn parse_guest(line: &str) -> Result<Guest, RecordError> {
    match fields(line).as_slice() {
        [first_name, last_name, date_of_birth, points, reward_rate, redeem_rate] => {
            let guest = Guest::new(*first_name, *last_name, parse_date(date_of_birth)?)?
                .with_rewards(
                    parse_number(points)?,
                    parse_number::<Decimal>(reward_rate)?,
                    parse_number::<Decimal>(redeem_rate)?,
                )?;

            Ok(guest)
        }
        other => Err(RecordError::FieldCount {
            expected: "6 (FirstName, LastName, DateOfBirth, RewardPoints, RewardRate, RedeemRate)",
            found: other.len(),
        }),
    }
}

/// Format a guest record.
pub fn format_guest(guest: &Guest) -> String {
    format!(
        "{}, {}, {}, {}, {}, {}",
        guest.first_name(),
        guest.last_name(),
        format_date(guest.date_of_birth()),
        guest.reward_points(),
        guest.reward_rate().normalize(),
        guest.redeem_rate().normalize()
    )
}

/// Parse `<quantity> x <product id>`, optionally followed by `@ <unit price>`.
///
/// # Errors
///
/// Returns [`RecordError::InvalidLine`] if the line is malformed.
pub fn parse_order_line(s: &str) -> Result<OrderLineRecord, RecordError> {
    let invalid = || RecordError::InvalidLine(s.to_string());

    let (quantity, rest) = s.trim().split_once(" x ").ok_or_else(invalid)?;
    let quantity: u32 = quantity.trim().parse().map_err(|_err| invalid())?;

    let (product_id, unit_price_minor) = match rest.split_once('@') {
        Some((product_id, price)) => {
            let price = parse_minor_units(price.trim())
                .filter(|minor| *minor > 0)
                .ok_or_else(invalid)?;

            (product_id.trim(), Some(price))
        }
        None => (rest.trim(), None),
    };

    if quantity == 0 || product_id.is_empty() {
        return Err(invalid());
    }

    Ok(OrderLineRecord {
        quantity,
        product_id: product_id.to_string(),
        unit_price_minor,
    })
}

/// Parse an order record:
/// `BookingDate, GuestID, CheckIn, CheckOut, Nights, PartySize, <q> x <id> @ <price>..., TotalCost, RewardPoints`.
///
/// # Errors
///
/// Returns a [`RecordError`] if the line has the wrong shape.
pub fn parse_order(line: &str) -> Result<OrderRecord, RecordError> {
    match fields(line).as_slice() {
        [
            booked_at,
            guest_id,
            check_in,
            check_out,
            nights,
            party_size,
            lines @ ..,
            total,
            reward_points,
        ] if !lines.is_empty() => Ok(OrderRecord {
            booked_at: parse_date_time(booked_at)?,
            guest_id: (*guest_id).to_string(),
            check_in: parse_date_time(check_in)?,
            check_out: parse_date_time(check_out)?,
            nights: parse_number(nights)?,
            party_size: parse_number(party_size)?,
            lines: lines
                .iter()
                .map(|line| parse_order_line(line))
                .collect::<Result<_, _>>()?,
            total_minor: parse_minor_units(total)
                .ok_or_else(|| RecordError::InvalidAmount((*total).to_string()))?,
            reward_points: parse_number(reward_points)?,
        }),
        other => Err(RecordError::FieldCount {
            expected: "at least 9 (BookingDate, GuestID, CheckIn, CheckOut, Nights, PartySize, lines..., TotalCost, RewardPoints)",
            found: other.len(),
        }),
    }
}

/// Format an order record. Bundle orders list only the bundle; apartments
/// are listed in nights at their nightly rate.
pub fn format_order(order: &Order<'_>) -> String {
    let stay = order.stay();
    let mut fields = vec![
        format_date_time(order.booked_at()),
        order.guest_id().to_string(),
        format_date_time(stay.check_in),
        format_date_time(stay.check_out),
        order.nights().to_string(),
        order.party_size().to_string(),
    ];

    if let Some(bundle) = order.bundle() {
        fields.push(format!(
            "1 x {} @ {}",
            bundle.bundle_id,
            format_amount(&bundle.price)
        ));
    }

    if let Some(apartment) = order.apartment() {
        fields.push(format!(
            "{} x {} @ {}",
            apartment.nights,
            apartment.apartment_id,
            format_amount(&apartment.rate)
        ));
    }

    for item in order.items() {
        fields.push(format!(
            "{} x {} @ {}",
            item.quantity,
            item.item_id,
            format_amount(&item.unit_price)
        ));
    }

    fields.push(format_amount(&order.total()));
    fields.push(order.reward_points().to_string());

    fields.join(", ")
}
