//! Draft orders
//!
//! A booking under construction. Drafts are built up by the
//! [`PricingEngine`](crate::engine::PricingEngine) and frozen into an
//! [`Order`](crate::orders::Order) on confirmation.

use std::fmt;

use jiff::civil::DateTime;
use rusty_money::{Money, iso::Currency};

use crate::pricing::{TotalPriceError, line_total, total_price};

/// Lifecycle of a draft order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// No apartment or bundle yet.
    Open,

    /// Holds an apartment or bundle line and can be confirmed.
    Priced,

    /// Confirmed into an order. Terminal.
    Confirmed,

    /// Cancelled before confirmation. Terminal.
    Abandoned,
}

impl DraftState {
    /// Whether lines, discounts and state may still change.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Open | Self::Priced)
    }
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "open",
            Self::Priced => "priced",
            Self::Confirmed => "confirmed",
            Self::Abandoned => "abandoned",
        };

        f.write_str(label)
    }
}

/// Check-in and check-out, both with an optional time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayWindow {
    /// Arrival
    pub check_in: DateTime,

    /// Departure
    pub check_out: DateTime,
}

impl StayWindow {
    /// Create a stay window. Ordering is validated by the engine.
    pub fn new(check_in: DateTime, check_out: DateTime) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    /// Whole days between the check-in and check-out dates, ignoring time of day.
    pub fn nights(&self) -> Option<i32> {
        self.check_in
            .date()
            .until(self.check_out.date())
            .ok()
            .map(|span| span.get_days())
    }
}

/// An apartment occupancy line: nightly rate times nights.
#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentLine<'a> {
    /// Apartment id
    pub apartment_id: String,

    /// Apartment name at booking time
    pub name: String,

    /// Nightly rate at booking time
    pub rate: Money<'a, Currency>,

    /// Nights booked
    pub nights: u32,

    /// `rate * nights`
    pub total: Money<'a, Currency>,
}

/// A supplementary item line: unit price times quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLine<'a> {
    /// Item id
    pub item_id: String,

    /// Item name at booking time
    pub name: String,

    /// Unit price at booking time
    pub unit_price: Money<'a, Currency>,

    /// Units booked
    pub quantity: u32,

    /// `unit_price * quantity`
    pub total: Money<'a, Currency>,
}

/// A bundle line. Only `price` counts towards the total; the expansion is
/// kept for receipts and statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleLine<'a> {
    /// Bundle id
    pub bundle_id: String,

    /// Bundle name at booking time
    pub name: String,

    /// Catalog package price
    pub price: Money<'a, Currency>,

    /// Apartment part of the package
    pub apartment: ApartmentLine<'a>,

    /// Item part of the package, quantities scaled by nights
    pub items: Vec<ItemLine<'a>>,
}

/// An order being assembled.
#[derive(Debug, Clone)]
pub struct DraftOrder<'a> {
    pub(crate) guest_id: String,
    pub(crate) stay: StayWindow,
    pub(crate) party_size: u32,
    pub(crate) nights: u32,
    pub(crate) apartment: Option<ApartmentLine<'a>>,
    pub(crate) items: Vec<ItemLine<'a>>,
    /// Extra-bed units the last capacity check put on the item lines.
    pub(crate) extra_bed_units: u32,
    pub(crate) bundle: Option<BundleLine<'a>>,
    pub(crate) discount: Money<'a, Currency>,
    pub(crate) points_redeemed: u64,
    pub(crate) state: DraftState,
    pub(crate) currency: &'a Currency,
}

impl<'a> DraftOrder<'a> {
    pub(crate) fn new(
        guest_id: String,
        stay: StayWindow,
        party_size: u32,
        nights: u32,
        currency: &'a Currency,
    ) -> Self {
        Self {
            guest_id,
            stay,
            party_size,
            nights,
            apartment: None,
            items: Vec::new(),
            extra_bed_units: 0,
            bundle: None,
            discount: Money::from_minor(0, currency),
            points_redeemed: 0,
            state: DraftState::Open,
            currency,
        }
    }

    /// Guest the order is for.
    pub fn guest_id(&self) -> &str {
        &self.guest_id
    }

    /// Stay window.
    pub fn stay(&self) -> StayWindow {
        self.stay
    }

    /// Number of guests staying.
    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    /// Length of stay in nights.
    pub fn nights(&self) -> u32 {
        self.nights
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

    /// Redemption discount applied so far.
    pub fn discount(&self) -> Money<'a, Currency> {
        self.discount
    }

    /// Points deducted from the guest for the discount.
    pub fn points_redeemed(&self) -> u64 {
        self.points_redeemed
    }

    /// Lifecycle state.
    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Currency of every line.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    /// Apartment id the order is for: the apartment line, or the bundle's apartment.
    pub fn apartment_id(&self) -> Option<&str> {
        self.apartment
            .as_ref()
            .or_else(|| self.bundle.as_ref().map(|bundle| &bundle.apartment))
            .map(|line| line.apartment_id.as_str())
    }

    /// Whether the order has lines it can be confirmed with.
    pub fn has_stay(&self) -> bool {
        self.apartment.is_some() || self.bundle.is_some()
    }

    /// Whether any component line has been added.
    pub fn has_components(&self) -> bool {
        self.apartment.is_some() || !self.items.is_empty()
    }

    /// Order total before the redemption discount: apartment and item lines
    /// for component orders, or the bundle price for bundle orders.
    ///
    /// # Errors
    ///
    /// Returns a [`TotalPriceError`] if the sum overflows.
    pub fn compute_total(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        if let Some(bundle) = &self.bundle {
            return Ok(bundle.price);
        }

        let apartment = self.apartment.iter().map(|line| line.total);
        let items = self.items.iter().map(|line| line.total);

        total_price(apartment.chain(items), self.currency)
    }

    /// Reprice the line for `product_id` at the price it was booked at: the
    /// nightly rate of the apartment, the unit price of an item or the package
    /// price of a bundle. Returns `false` when no line matches.
    pub(crate) fn set_recorded_price(
        &mut self,
        product_id: &str,
        price: Money<'a, Currency>,
    ) -> Result<bool, TotalPriceError> {
        if let Some(line) = self
            .apartment
            .as_mut()
            .filter(|line| line.apartment_id == product_id)
        {
            line.total = line_total(&price, line.nights)?;
            line.rate = price;

            return Ok(true);
        }

        if let Some(line) = self.items.iter_mut().find(|line| line.item_id == product_id) {
            line.total = line_total(&price, line.quantity)?;
            line.unit_price = price;

            return Ok(true);
        }

        if let Some(line) = self
            .bundle
            .as_mut()
            .filter(|line| line.bundle_id == product_id)
        {
            line.price = price;

            return Ok(true);
        }

        Ok(false)
    }

    pub(crate) fn refresh_state(&mut self) {
        if self.state.is_editable() {
            self.state = if self.has_stay() {
                DraftState::Priced
            } else {
                DraftState::Open
            };
        }
    }
}
