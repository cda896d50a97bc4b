//! Orders
//!
//! Confirmed bookings and the store that keeps them. An [`Order`] holds
//! priced line snapshots, so later catalog edits never change history.

use std::collections::BTreeMap;

use jiff::civil::{Date, DateTime};
use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    catalog::{Catalog, ProductReferences},
    draft::{ApartmentLine, BundleLine, DraftOrder, ItemLine, StayWindow},
    pricing::{TotalPriceError, average},
    products::ProductKind,
    records::codec,
};

/// Errors raised by the order store.
#[derive(Debug, Error, PartialEq)]
pub enum OrderStoreError {
    /// An order with this id is already stored.
    #[error("order {0} already exists")]
    DuplicateOrderId(String),

    /// Report period ends before it starts.
    #[error("booking period starts {from}, after it ends {to}")]
    InvalidPeriod {
        /// Start date
        from: String,
        /// End date
        to: String,
    },

    /// Spend totals overflowed.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// An immutable confirmed booking.
#[derive(Debug, Clone, PartialEq)]
pub struct Order<'a> {
    id: String,
    guest_id: String,
    stay: StayWindow,
    party_size: u32,
    nights: u32,
    booked_at: DateTime,
    apartment: Option<ApartmentLine<'a>>,
    items: Vec<ItemLine<'a>>,
    bundle: Option<BundleLine<'a>>,
    subtotal: Money<'a, Currency>,
    discount: Money<'a, Currency>,
    total: Money<'a, Currency>,
    reward_points: u64,
    points_redeemed: u64,
}

impl<'a> Order<'a> {
    /// Freeze a draft's lines into an order.
    pub(crate) fn from_draft(
        id: String,
        draft: &DraftOrder<'a>,
        booked_at: DateTime,
        subtotal: Money<'a, Currency>,
        total: Money<'a, Currency>,
        reward_points: u64,
    ) -> Self {
        Self {
            id,
            guest_id: draft.guest_id.clone(),
            stay: draft.stay,
            party_size: draft.party_size,
            nights: draft.nights,
            booked_at,
            apartment: draft.apartment.clone(),
            items: draft.items.clone(),
            bundle: draft.bundle.clone(),
            subtotal,
            discount: draft.discount,
            total,
            reward_points,
            points_redeemed: draft.points_redeemed,
        }
    }

    /// Override the discount, for orders read back from records where only
    /// the final total was kept.
    pub(crate) fn with_discount(mut self, discount: Money<'a, Currency>) -> Self {
        self.discount = discount;
        self
    }

    /// Order id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Guest the order belongs to.
    pub fn guest_id(&self) -> &str {
        &self.guest_id
    }

    /// Stay window.
    pub fn stay(&self) -> StayWindow {
        self.stay
    }

    /// Number of guests.
    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    /// Length of stay in nights.
    pub fn nights(&self) -> u32 {
        self.nights
    }

    /// When the order was confirmed.
    pub fn booked_at(&self) -> DateTime {
        self.booked_at
    }

    /// Apartment line, for component orders.
    pub fn apartment(&self) -> Option<&ApartmentLine<'a>> {
        self.apartment.as_ref()
    }

    /// Item lines, for component orders.
    pub fn items(&self) -> &[ItemLine<'a>] {
        &self.items
    }

    /// Bundle line, for bundle orders.
    pub fn bundle(&self) -> Option<&BundleLine<'a>> {
        self.bundle.as_ref()
    }

    /// Total before the redemption discount.
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Redemption discount.
    pub fn discount(&self) -> Money<'a, Currency> {
        self.discount
    }

    /// Amount paid.
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Points earned by this order.
    pub fn reward_points(&self) -> u64 {
        self.reward_points
    }

    /// Points spent on the discount.
    pub fn points_redeemed(&self) -> u64 {
        self.points_redeemed
    }

    /// Products this order counts towards in statistics, with quantities:
    /// the bundle alone for bundle orders, otherwise the apartment in nights
    /// and each item in units.
    pub fn product_quantities(&self) -> Vec<(&str, u64)> {
        if let Some(bundle) = &self.bundle {
            return vec![(bundle.bundle_id.as_str(), 1)];
        }

        let apartment = self
            .apartment
            .iter()
            .map(|line| (line.apartment_id.as_str(), u64::from(line.nights)));

        let items = self
            .items
            .iter()
            .map(|line| (line.item_id.as_str(), u64::from(line.quantity)));

        apartment.chain(items).collect()
    }

    /// Whether any line, including a bundle's expansion, is for `product_id`.
    pub fn mentions(&self, product_id: &str) -> bool {
        let apartment = self
            .apartment
            .iter()
            .chain(self.bundle.iter().map(|bundle| &bundle.apartment))
            .any(|line| line.apartment_id == product_id);

        let item = self
            .items
            .iter()
            .chain(self.bundle.iter().flat_map(|bundle| bundle.items.iter()))
            .any(|line| line.item_id == product_id);

        let bundle = self
            .bundle
            .as_ref()
            .is_some_and(|bundle| bundle.bundle_id == product_id);

        apartment || item || bundle
    }
}

/// Aggregated spend for one guest.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestSpend<'a> {
    /// Guest id
    pub guest_id: String,

    /// Sum of order totals
    pub total: Money<'a, Currency>,
}

/// Aggregated quantity for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUsage {
    /// Product id
    pub product_id: String,

    /// Product kind, from the id prefix
    pub kind: Option<ProductKind>,

    /// Nights, units or bookings depending on the kind
    pub quantity: u64,
}

/// Top guests by spend and top products by quantity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics<'a> {
    /// Highest-spending guests, descending
    pub top_guests: Vec<GuestSpend<'a>>,

    /// Most booked products, descending
    pub top_products: Vec<ProductUsage>,
}

/// Booking dates a report covers, both ends inclusive. An open end is
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookingPeriod {
    /// First booking date counted
    pub from: Option<Date>,

    /// Last booking date counted
    pub to: Option<Date>,
}

impl BookingPeriod {
    /// Bookings made from `from` through `to`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::InvalidPeriod`] if `from` is after `to`.
    pub fn new(from: Option<Date>, to: Option<Date>) -> Result<Self, OrderStoreError> {
        match (from, to) {
            (Some(from), Some(to)) if from > to => Err(OrderStoreError::InvalidPeriod {
                from: codec::format_date(from),
                to: codec::format_date(to),
            }),
            _ => Ok(Self { from, to }),
        }
    }

    /// Whether an order booked at `booked_at` falls in the period.
    pub fn contains(&self, booked_at: DateTime) -> bool {
        let day = booked_at.date();

        self.from.is_none_or(|from| from <= day) && self.to.is_none_or(|to| day <= to)
    }

    /// Whether both ends are open.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// How one bundle sold over a booking period.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleStatistics<'a> {
    /// Bundle id
    pub bundle_id: String,

    /// Bundle name, from the catalog or the latest order
    pub name: String,

    /// Orders booking the bundle
    pub bookings: u64,

    /// Sum of those orders' totals
    pub revenue: Money<'a, Currency>,

    /// Revenue per booking
    pub average_revenue: Money<'a, Currency>,

    /// Points awarded on those orders
    pub reward_points: u64,

    /// Distinct guests booking the bundle
    pub unique_guests: usize,

    /// Bookings per month of the booking date, oldest first, keyed by the
    /// first day of the month
    pub monthly: Vec<(Date, u64)>,
}

/// Every bundle's performance over a booking period, highest revenue first,
/// with totals across all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleReport<'a> {
    /// Booking dates covered
    pub period: BookingPeriod,

    /// Per-bundle figures
    pub bundles: Vec<BundleStatistics<'a>>,

    /// Bundle orders in the period
    pub bookings: u64,

    /// Revenue from bundle orders
    pub revenue: Money<'a, Currency>,

    /// Revenue per bundle order
    pub average_revenue: Money<'a, Currency>,

    /// Points awarded on bundle orders
    pub reward_points: u64,
}

#[derive(Debug, Default)]
struct BundleTally<'s> {
    bundle_id: &'s str,
    name: &'s str,
    bookings: u64,
    revenue: i64,
    reward_points: u64,
    guests: FxHashSet<&'s str>,
    monthly: BTreeMap<Date, u64>,
}

impl<'s> BundleTally<'s> {
    fn new(bundle_id: &'s str, name: &'s str) -> Self {
        Self {
            bundle_id,
            name,
            ..Self::default()
        }
    }

    fn add(&mut self, order: &'s Order<'_>) -> Result<(), TotalPriceError> {
        self.bookings += 1;
        self.revenue = self
            .revenue
            .checked_add(order.total.to_minor_units())
            .ok_or(TotalPriceError::Overflow)?;
        self.reward_points = self.reward_points.saturating_add(order.reward_points);
        self.guests.insert(&order.guest_id);
        *self
            .monthly
            .entry(order.booked_at.date().first_of_month())
            .or_default() += 1;

        Ok(())
    }

    fn finish<'a>(self, currency: &'a Currency) -> BundleStatistics<'a> {
        let revenue = Money::from_minor(self.revenue, currency);

        BundleStatistics {
            bundle_id: self.bundle_id.to_string(),
            name: self.name.to_string(),
            bookings: self.bookings,
            revenue,
            average_revenue: average(&revenue, self.bookings),
            reward_points: self.reward_points,
            unique_guests: self.guests.len(),
            monthly: self.monthly.into_iter().collect(),
        }
    }
}

/// Accumulates values per key while remembering first-seen order.
#[derive(Debug, Default)]
struct Tally<'s> {
    index: FxHashMap<&'s str, usize>,
    entries: Vec<(&'s str, i64)>,
}

impl<'s> Tally<'s> {
    fn add(&mut self, key: &'s str, value: i64) -> Result<(), TotalPriceError> {
        if let Some(&idx) = self.index.get(key) {
            if let Some((_, sum)) = self.entries.get_mut(idx) {
                *sum = sum.checked_add(value).ok_or(TotalPriceError::Overflow)?;
            }
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push((key, value));
        }

        Ok(())
    }

    /// Top `n` by value; ties keep first-seen order.
    fn top(mut self, n: usize) -> Vec<(&'s str, i64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(n);
        self.entries
    }
}

/// Confirmed orders in insertion order, indexed by id.
#[derive(Debug, Default)]
pub struct OrderStore<'a> {
    orders: Vec<Order<'a>>,
    index: FxHashMap<String, usize>,
}

impl<'a> OrderStore<'a> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::DuplicateOrderId`] if the id is taken.
    pub fn save(&mut self, order: Order<'a>) -> Result<(), OrderStoreError> {
        if self.index.contains_key(&order.id) {
            return Err(OrderStoreError::DuplicateOrderId(order.id));
        }

        info!(order = %order.id, guest = %order.guest_id, total = %order.total, "saved order");

        self.index.insert(order.id.clone(), self.orders.len());
        self.orders.push(order);

        Ok(())
    }

    /// Whether an order id is taken.
    pub fn contains(&self, order_id: &str) -> bool {
        self.index.contains_key(order_id)
    }

    /// Look up an order by id.
    pub fn get(&self, order_id: &str) -> Option<&Order<'a>> {
        self.index
            .get(order_id)
            .and_then(|idx| self.orders.get(*idx))
    }

    /// Iterate orders in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Order<'a>> {
        self.orders.iter()
    }

    /// Number of orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// A guest's orders, oldest booking first.
    pub fn find_by_guest(&self, guest_id: &str) -> Vec<&Order<'a>> {
        let mut orders: Vec<_> = self
            .orders
            .iter()
            .filter(|order| order.guest_id == guest_id)
            .collect();

        orders.sort_by_key(|order| order.booked_at);

        orders
    }

    /// Top `top_n` guests by spend and products by booked quantity, derived
    /// from the stored orders alone.
    ///
    /// # Errors
    ///
    /// Returns an error if a running total overflows.
    pub fn aggregate_statistics(&self, top_n: usize) -> Result<Statistics<'a>, OrderStoreError> {
        let mut guests = Tally::default();
        let mut products = Tally::default();
        let mut currency = None;

        for order in &self.orders {
            currency.get_or_insert(order.total.currency());

            guests.add(&order.guest_id, order.total.to_minor_units())?;

            for (product_id, quantity) in order.product_quantities() {
                let quantity = i64::try_from(quantity).map_err(|_err| TotalPriceError::Overflow)?;

                products.add(product_id, quantity)?;
            }
        }

        let Some(currency) = currency else {
            return Ok(Statistics::default());
        };

        let top_guests = guests
            .top(top_n)
            .into_iter()
            .map(|(guest_id, minor)| GuestSpend {
                guest_id: guest_id.to_string(),
                total: Money::from_minor(minor, currency),
            })
            .collect();

        let top_products = products
            .top(top_n)
            .into_iter()
            .map(|(product_id, quantity)| ProductUsage {
                product_id: product_id.to_string(),
                kind: ProductKind::from_id(product_id),
                quantity: quantity.unsigned_abs(),
            })
            .collect();

        Ok(Statistics {
            top_guests,
            top_products,
        })
    }

    /// Bookings, revenue, reward points, distinct guests and monthly
    /// distribution for every catalog bundle, counting orders booked within
    /// `period`. Bundles nobody booked report zeros; bundles missing from the
    /// catalog but present in orders are reported under their booked name.
    ///
    /// # Errors
    ///
    /// Returns an error if a revenue total overflows.
    pub fn bundle_statistics(
        &self,
        catalog: &Catalog<'a>,
        period: BookingPeriod,
    ) -> Result<BundleReport<'a>, OrderStoreError> {
        let currency = catalog.currency();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut tallies = Vec::new();

        for bundle in catalog.bundles() {
            index.insert(&bundle.id, tallies.len());
            tallies.push(BundleTally::new(&bundle.id, &bundle.name));
        }

        for order in self.orders.iter().filter(|order| period.contains(order.booked_at)) {
            let Some(bundle) = &order.bundle else {
                continue;
            };

            let idx = *index.entry(&bundle.bundle_id).or_insert_with(|| {
                tallies.push(BundleTally::new(&bundle.bundle_id, &bundle.name));
                tallies.len().saturating_sub(1)
            });

            if let Some(tally) = tallies.get_mut(idx) {
                tally.add(order)?;
            }
        }

        let mut bundles: Vec<_> = tallies
            .into_iter()
            .map(|tally| tally.finish(currency))
            .collect();

        bundles.sort_by(|a, b| b.revenue.to_minor_units().cmp(&a.revenue.to_minor_units()));

        let bookings: u64 = bundles.iter().map(|bundle| bundle.bookings).sum();
        let revenue = Money::from_minor(
            bundles
                .iter()
                .try_fold(0i64, |acc, bundle| acc.checked_add(bundle.revenue.to_minor_units()))
                .ok_or(TotalPriceError::Overflow)?,
            currency,
        );
        let reward_points: u64 = bundles.iter().map(|bundle| bundle.reward_points).sum();

        debug!(bundles = bundles.len(), bookings, %revenue, "computed bundle statistics");

        Ok(BundleReport {
            period,
            bundles,
            bookings,
            revenue,
            average_revenue: average(&revenue, bookings),
            reward_points,
        })
    }

    /// Order records in insertion order.
    pub fn serialize_all(&self) -> Vec<String> {
        self.orders.iter().map(codec::format_order).collect()
    }
}

impl ProductReferences for OrderStore<'_> {
    fn orders_referencing(&self, product_id: &str) -> usize {
        self.orders
            .iter()
            .filter(|order| order.mentions(product_id))
            .count()
    }
}
