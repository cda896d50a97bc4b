//! Pricing engine
//!
//! Builds draft orders against the catalog, applies reward-point
//! redemptions, and confirms drafts into the order store.

use jiff::civil::DateTime;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    catalog::{Catalog, CatalogError},
    discounts::{DiscountError, reward_points_for},
    draft::{ApartmentLine, BundleLine, DraftOrder, DraftState, ItemLine, StayWindow},
    guests::{Guest, GuestError, GuestLedger},
    orders::{Order, OrderStore, OrderStoreError},
    pricing::{TotalPriceError, line_total},
};

/// Longest bookable stay, in nights.
pub const MAX_NIGHTS: u32 = 7;

/// Guests that can be added beyond an apartment's capacity using extra beds.
pub const MAX_EXTRA_GUESTS: u32 = 4;

/// Guests sleeping in one extra bed.
pub const GUESTS_PER_EXTRA_BED: u32 = 2;

/// Item used for extra beds unless configured otherwise.
pub const DEFAULT_EXTRA_BED_ITEM: &str = "SI6";

/// Broad failure classes, for deciding how a caller recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,

    /// Unknown id.
    NotFound,

    /// Blocked by dependents.
    ReferentialIntegrity,

    /// Reward redemption rule violated.
    Redemption,

    /// Identity collision.
    Duplicate,

    /// Confirmation attempted without an apartment or bundle.
    EmptyOrder,
}

/// Errors raised while building or confirming an order.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Check-out must follow check-in, for a stay of 1 to 7 nights.
    #[error("stay from {check_in} to {check_out} must be 1 to {MAX_NIGHTS} nights")]
    InvalidDateRange {
        /// Requested check-in
        check_in: DateTime,
        /// Requested check-out
        check_out: DateTime,
    },

    /// At least one guest must stay.
    #[error("party size must be at least 1, got {0}")]
    InvalidPartySize(u32),

    /// Unknown apartment.
    #[error("apartment {0} not found")]
    ApartmentNotFound(String),

    /// Unknown supplementary item.
    #[error("supplementary item {0} not found")]
    ItemNotFound(String),

    /// Unknown bundle.
    #[error("bundle {0} not found")]
    BundleNotFound(String),

    /// The draft already has this kind of line.
    #[error("order already contains {0}")]
    DuplicateLine(String),

    /// No line for this product on the draft.
    #[error("order has no line for {0}")]
    LineNotFound(String),

    /// Bundle and component lines cannot be mixed.
    #[error("an order holds either a bundle or an apartment with items, not both")]
    MixedOrder,

    /// Item quantities must be positive.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    /// The party does not fit even with extra beds.
    #[error("apartment {apartment} sleeps at most {max} guests with extra beds, party has {party_size}")]
    CapacityExceeded {
        /// Apartment id
        apartment: String,
        /// Requested party size
        party_size: u32,
        /// Capacity plus extra-bed allowance
        max: u32,
    },

    /// The discount would make the total negative.
    #[error("discount {discount} exceeds order total {total}")]
    ExcessiveDiscount {
        /// Discount amount
        discount: String,
        /// Order total
        total: String,
    },

    /// A restored order's recorded total is more than its lines add up to.
    #[error("recorded total {total} exceeds the line subtotal {subtotal}")]
    TotalMismatch {
        /// Sum of the restored lines
        subtotal: String,
        /// Recorded total
        total: String,
    },

    /// A draft takes one redemption at most.
    #[error("points have already been redeemed on this order")]
    RedemptionAlreadyApplied,

    /// Confirmation needs an apartment or a bundle.
    #[error("order must contain an apartment or a bundle")]
    EmptyOrder,

    /// The draft is confirmed or abandoned.
    #[error("order is {0} and can no longer change")]
    DraftNotEditable(DraftState),

    /// Guest ledger failure.
    #[error(transparent)]
    Guest(#[from] GuestError),

    /// Catalog failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Order store failure.
    #[error(transparent)]
    Store(#[from] OrderStoreError),

    /// Price arithmetic failure.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// Reward arithmetic failure.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

impl PricingError {
    /// Classify the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ApartmentNotFound(_)
            | Self::ItemNotFound(_)
            | Self::BundleNotFound(_)
            | Self::LineNotFound(_)
            | Self::Guest(GuestError::NotFound(_))
            | Self::Catalog(CatalogError::NotFound(_) | CatalogError::ComponentNotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Catalog(CatalogError::ReferentialIntegrity { .. }) => {
                ErrorKind::ReferentialIntegrity
            }
            Self::ExcessiveDiscount { .. }
            | Self::RedemptionAlreadyApplied
            | Self::Guest(GuestError::InvalidRedemption(_) | GuestError::InsufficientPoints { .. }) => {
                ErrorKind::Redemption
            }
            Self::DuplicateLine(_)
            | Self::Guest(GuestError::DuplicateGuest(_))
            | Self::Store(OrderStoreError::DuplicateOrderId(_)) => ErrorKind::Duplicate,
            Self::EmptyOrder => ErrorKind::EmptyOrder,
            _ => ErrorKind::Validation,
        }
    }
}

/// Extra beds needed to fit a party into an apartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    /// Guests beyond the apartment's capacity
    pub extra_guests: u32,

    /// Extra beds per night
    pub extra_beds_per_night: u32,

    /// Extra-bed units for the whole stay
    pub total_extra_bed_units: u32,
}

/// Work out extra beds for `party_size` guests in an apartment sleeping
/// `capacity`, over `nights` nights.
///
/// # Errors
///
/// Returns [`PricingError::CapacityExceeded`] above `capacity + 4` guests.
pub fn capacity_plan(
    apartment_id: &str,
    capacity: u8,
    party_size: u32,
    nights: u32,
) -> Result<CapacityPlan, PricingError> {
    let capacity = u32::from(capacity);
    let max = capacity + MAX_EXTRA_GUESTS;

    if party_size > max {
        return Err(PricingError::CapacityExceeded {
            apartment: apartment_id.to_string(),
            party_size,
            max,
        });
    }

    let extra_guests = party_size.saturating_sub(capacity);
    let extra_beds_per_night = extra_guests.div_ceil(GUESTS_PER_EXTRA_BED);

    Ok(CapacityPlan {
        extra_guests,
        extra_beds_per_night,
        total_extra_bed_units: extra_beds_per_night * nights,
    })
}

/// Compose an order id:
/// `BK{apartment prefix}{check-in month}{party}{nights}{check-in day}{booking day}{sequence}`.
///
/// Only the trailing sequence guarantees uniqueness.
pub fn order_id(
    apartment_id: &str,
    stay: &StayWindow,
    party_size: u32,
    nights: u32,
    booked_at: DateTime,
    sequence: u32,
) -> String {
    let prefix: String = apartment_id.chars().take(3).collect();

    format!(
        "BK{prefix}{:02}{party_size:02}{nights:02}{:02}{:02}{sequence:04}",
        stay.check_in.month(),
        stay.check_in.day(),
        booked_at.day(),
    )
}

fn ensure_editable(draft: &DraftOrder<'_>) -> Result<(), PricingError> {
    if draft.state.is_editable() {
        Ok(())
    } else {
        Err(PricingError::DraftNotEditable(draft.state))
    }
}

fn excessive_discount(discount: Money<'_, Currency>, total: Money<'_, Currency>) -> PricingError {
    PricingError::ExcessiveDiscount {
        discount: discount.to_string(),
        total: total.to_string(),
    }
}

/// Pricing engine
///
/// Owns the order sequence counter and the extra-bed item id. The catalog,
/// guest ledger and order store are passed in by the caller.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    sequence: u32,
    extra_bed_item: String,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EXTRA_BED_ITEM)
    }
}

impl PricingEngine {
    /// Create an engine that books extra beds as `extra_bed_item`.
    pub fn new(extra_bed_item: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            extra_bed_item: extra_bed_item.into(),
        }
    }

    /// Last sequence number issued.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Item id used for extra beds.
    pub fn extra_bed_item(&self) -> &str {
        &self.extra_bed_item
    }

    /// Start a draft for `guest`.
    ///
    /// # Errors
    ///
    /// - [`PricingError::InvalidPartySize`]: no guests.
    /// - [`PricingError::InvalidDateRange`]: check-out not after check-in, or
    ///   a stay outside 1 to 7 nights.
    pub fn open_order<'a>(
        &self,
        catalog: &Catalog<'a>,
        guest: &Guest,
        check_in: DateTime,
        check_out: DateTime,
        party_size: u32,
    ) -> Result<DraftOrder<'a>, PricingError> {
        if party_size == 0 {
            return Err(PricingError::InvalidPartySize(party_size));
        }

        let stay = StayWindow::new(check_in, check_out);
        let invalid = || PricingError::InvalidDateRange {
            check_in,
            check_out,
        };

        if check_in >= check_out {
            return Err(invalid());
        }

        let nights = stay
            .nights()
            .and_then(|nights| u32::try_from(nights).ok())
            .filter(|nights| (1..=MAX_NIGHTS).contains(nights))
            .ok_or_else(invalid)?;

        debug!(guest = %guest.id(), %check_in, %check_out, nights, party_size, "opened draft");

        Ok(DraftOrder::new(
            guest.id().to_string(),
            stay,
            party_size,
            nights,
            catalog.currency(),
        ))
    }

    /// Add an apartment for the whole stay. Returns the line total.
    ///
    /// # Errors
    ///
    /// - [`PricingError::ApartmentNotFound`]: unknown apartment.
    /// - [`PricingError::DuplicateLine`]: the draft already has an apartment.
    /// - [`PricingError::MixedOrder`]: the draft holds a bundle.
    pub fn add_apartment<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        catalog: &Catalog<'a>,
        apartment_id: &str,
    ) -> Result<Money<'a, Currency>, PricingError> {
        ensure_editable(draft)?;

        if draft.bundle.is_some() {
            return Err(PricingError::MixedOrder);
        }

        if draft.apartment.is_some() {
            return Err(PricingError::DuplicateLine(apartment_id.to_string()));
        }

        let apartment = catalog
            .apartment(apartment_id)
            .ok_or_else(|| PricingError::ApartmentNotFound(apartment_id.to_string()))?;

        let total = line_total(&apartment.rate, draft.nights)?;

        draft.apartment = Some(ApartmentLine {
            apartment_id: apartment.id.clone(),
            name: apartment.name.clone(),
            rate: apartment.rate,
            nights: draft.nights,
            total,
        });
        draft.refresh_state();

        debug!(apartment = %apartment_id, %total, "added apartment line");

        Ok(total)
    }

    /// Check whether `party_size` fits the apartment and add extra beds when
    /// it does not. A repeated check replaces the beds the previous one planned.
    ///
    /// # Errors
    ///
    /// - [`PricingError::ApartmentNotFound`]: unknown apartment.
    /// - [`PricingError::CapacityExceeded`]: more than `capacity + 4` guests.
    /// - [`PricingError::ItemNotFound`]: the extra-bed item is missing from the catalog.
    pub fn guest_capacity_check<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        catalog: &Catalog<'a>,
        apartment_id: &str,
        party_size: u32,
    ) -> Result<CapacityPlan, PricingError> {
        ensure_editable(draft)?;

        let apartment = catalog
            .apartment(apartment_id)
            .ok_or_else(|| PricingError::ApartmentNotFound(apartment_id.to_string()))?;

        let plan = capacity_plan(apartment_id, apartment.capacity, party_size, draft.nights)?;

        let planned = plan.total_extra_bed_units;

        if !self.resize_extra_beds(draft, planned)? && planned > 0 {
            self.add_item(draft, catalog, &self.extra_bed_item, planned)?;
        }

        Ok(plan)
    }

    /// Swaps the extra-bed units added by the last capacity check for
    /// `planned`, keeping units added by hand. Returns `false` when the draft
    /// has no extra-bed line to resize.
    fn resize_extra_beds<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        planned: u32,
    ) -> Result<bool, PricingError> {
        let previous = draft.extra_bed_units;

        let Some(line) = draft
            .items
            .iter_mut()
            .find(|line| line.item_id == self.extra_bed_item)
        else {
            draft.extra_bed_units = planned;
            return Ok(false);
        };

        let quantity = line
            .quantity
            .saturating_sub(previous)
            .checked_add(planned)
            .ok_or(TotalPriceError::Overflow)?;

        if quantity == 0 {
            draft.items.retain(|line| line.item_id != self.extra_bed_item);
        } else {
            line.total = line_total(&line.unit_price, quantity)?;
            line.quantity = quantity;
        }

        draft.extra_bed_units = planned;

        debug!(item = %self.extra_bed_item, previous, planned, quantity, "resized extra beds");

        Ok(true)
    }

    /// Add `quantity` units of an item, merging with an existing line for the
    /// same item. Returns the line total.
    ///
    /// # Errors
    ///
    /// - [`PricingError::ItemNotFound`]: unknown item.
    /// - [`PricingError::InvalidQuantity`]: zero quantity.
    /// - [`PricingError::MixedOrder`]: the draft holds a bundle.
    pub fn add_item<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        catalog: &Catalog<'a>,
        item_id: &str,
        quantity: u32,
    ) -> Result<Money<'a, Currency>, PricingError> {
        ensure_editable(draft)?;

        if draft.bundle.is_some() {
            return Err(PricingError::MixedOrder);
        }

        if quantity == 0 {
            return Err(PricingError::InvalidQuantity(quantity));
        }

        let item = catalog
            .item(item_id)
            .ok_or_else(|| PricingError::ItemNotFound(item_id.to_string()))?;

        if let Some(line) = draft.items.iter_mut().find(|line| line.item_id == item_id) {
            let quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(TotalPriceError::Overflow)?;
            let total = line_total(&line.unit_price, quantity)?;

            line.quantity = quantity;
            line.total = total;

            debug!(item = %item_id, quantity, %total, "updated item line");

            return Ok(total);
        }

        let total = line_total(&item.price, quantity)?;

        draft.items.push(ItemLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
            total,
        });

        debug!(item = %item_id, quantity, %total, "added item line");

        Ok(total)
    }

    /// Remove an item line.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::LineNotFound`] if the draft has no such line.
    pub fn remove_item<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        item_id: &str,
    ) -> Result<ItemLine<'a>, PricingError> {
        ensure_editable(draft)?;

        let idx = draft
            .items
            .iter()
            .position(|line| line.item_id == item_id)
            .ok_or_else(|| PricingError::LineNotFound(item_id.to_string()))?;

        let line = draft.items.remove(idx);

        if line.item_id == self.extra_bed_item {
            draft.extra_bed_units = 0;
        }

        debug!(item = %item_id, "removed item line");

        Ok(line)
    }

    /// Remove the apartment line, along with the extra beds its capacity check
    /// added.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::LineNotFound`] if the draft's apartment is not `apartment_id`.
    pub fn remove_apartment<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        apartment_id: &str,
    ) -> Result<ApartmentLine<'a>, PricingError> {
        ensure_editable(draft)?;

        let line = draft
            .apartment
            .take_if(|line| line.apartment_id == apartment_id)
            .ok_or_else(|| PricingError::LineNotFound(apartment_id.to_string()))?;

        self.resize_extra_beds(draft, 0)?;
        draft.refresh_state();

        debug!(apartment = %apartment_id, "removed apartment line");

        Ok(line)
    }

    /// Book a bundle. The line total is the bundle's catalog price; the
    /// apartment and items are expanded for display, with every item
    /// quantity multiplied by the number of nights.
    ///
    /// # Errors
    ///
    /// - [`PricingError::BundleNotFound`]: unknown bundle.
    /// - [`PricingError::MixedOrder`]: the draft holds component lines.
    /// - [`PricingError::DuplicateLine`]: the draft already holds a bundle.
    /// - [`PricingError::CapacityExceeded`]: the party does not fit the bundle's apartment.
    pub fn price_bundle<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        catalog: &Catalog<'a>,
        bundle_id: &str,
    ) -> Result<Money<'a, Currency>, PricingError> {
        ensure_editable(draft)?;

        if draft.has_components() {
            return Err(PricingError::MixedOrder);
        }

        if draft.bundle.is_some() {
            return Err(PricingError::DuplicateLine(bundle_id.to_string()));
        }

        let bundle = catalog
            .bundle(bundle_id)
            .ok_or_else(|| PricingError::BundleNotFound(bundle_id.to_string()))?;

        let missing = |component: &str| CatalogError::ComponentNotFound {
            bundle: bundle_id.to_string(),
            component: component.to_string(),
        };

        let apartment_id = bundle.components.apartment_id.as_str();
        let apartment = catalog
            .apartment(apartment_id)
            .ok_or_else(|| missing(apartment_id))?;

        capacity_plan(apartment_id, apartment.capacity, draft.party_size, draft.nights)?;

        let apartment_line = ApartmentLine {
            apartment_id: apartment.id.clone(),
            name: apartment.name.clone(),
            rate: apartment.rate,
            nights: draft.nights,
            total: line_total(&apartment.rate, draft.nights)?,
        };

        let mut items = Vec::with_capacity(bundle.components.items.len());

        for (item_id, per_night) in &bundle.components.items {
            let item = catalog
                .item(item_id)
                .ok_or_else(|| missing(item_id.as_str()))?;
            let quantity = per_night
                .checked_mul(draft.nights)
                .ok_or(TotalPriceError::Overflow)?;

            items.push(ItemLine {
                item_id: item.id.clone(),
                name: item.name.clone(),
                unit_price: item.price,
                quantity,
                total: line_total(&item.price, quantity)?,
            });
        }

        draft.bundle = Some(BundleLine {
            bundle_id: bundle.id.clone(),
            name: bundle.name.clone(),
            price: bundle.price,
            apartment: apartment_line,
            items,
        });
        draft.refresh_state();

        debug!(bundle = %bundle_id, price = %bundle.price, "added bundle line");

        Ok(bundle.price)
    }

    /// Order total before redemption. Pure.
    ///
    /// # Errors
    ///
    /// Returns an error if the sum overflows.
    pub fn compute_total<'a>(
        &self,
        draft: &DraftOrder<'a>,
    ) -> Result<Money<'a, Currency>, PricingError> {
        Ok(draft.compute_total()?)
    }

    /// Redeem guest points against the draft. Returns the discount.
    ///
    /// # Errors
    ///
    /// - Guest ledger redemption errors, unchanged.
    /// - [`PricingError::ExcessiveDiscount`]: the discount exceeds the total.
    /// - [`PricingError::RedemptionAlreadyApplied`]: points were already redeemed.
    pub fn apply_redemption<'a>(
        &self,
        draft: &mut DraftOrder<'a>,
        ledger: &mut GuestLedger,
        points: u64,
    ) -> Result<Money<'a, Currency>, PricingError> {
        ensure_editable(draft)?;

        if draft.points_redeemed > 0 {
            return Err(PricingError::RedemptionAlreadyApplied);
        }

        let total = draft.compute_total()?;
        let quoted = ledger.quote_redemption(&draft.guest_id, points)?;
        let discount = Money::from_minor(quoted, draft.currency);

        if quoted > total.to_minor_units() {
            return Err(excessive_discount(discount, total));
        }

        ledger.redeem(&draft.guest_id, points)?;

        draft.discount = discount;
        draft.points_redeemed = points;

        debug!(guest = %draft.guest_id, points, %discount, "applied redemption");

        Ok(discount)
    }

    /// Confirm the draft: award reward points, assign an order id and store the order.
    ///
    /// # Errors
    ///
    /// - [`PricingError::EmptyOrder`]: no apartment or bundle line.
    /// - [`PricingError::ExcessiveDiscount`]: lines removed after the redemption.
    /// - [`PricingError::Store`]: the generated id is already taken.
    pub fn finalize<'a>(
        &mut self,
        draft: &mut DraftOrder<'a>,
        ledger: &mut GuestLedger,
        store: &mut OrderStore<'a>,
        booked_at: DateTime,
    ) -> Result<Order<'a>, PricingError> {
        ensure_editable(draft)?;

        let Some(apartment_id) = draft.apartment_id() else {
            return Err(PricingError::EmptyOrder);
        };

        let subtotal = draft.compute_total()?;
        let discount = draft.discount;

        let final_minor = subtotal
            .to_minor_units()
            .checked_sub(discount.to_minor_units())
            .filter(|minor| *minor >= 0)
            .ok_or_else(|| excessive_discount(discount, subtotal))?;
        let total = Money::from_minor(final_minor, draft.currency);

        let guest = ledger
            .get(&draft.guest_id)
            .ok_or_else(|| GuestError::NotFound(draft.guest_id.clone()))?;
        let reward_points = reward_points_for(final_minor, guest.reward_rate())?;

        let sequence = self.sequence + 1;
        let id = order_id(
            apartment_id,
            &draft.stay,
            draft.party_size,
            draft.nights,
            booked_at,
            sequence,
        );

        if store.contains(&id) {
            return Err(OrderStoreError::DuplicateOrderId(id).into());
        }

        let order = Order::from_draft(id, draft, booked_at, subtotal, total, reward_points);

        ledger.accrue(&draft.guest_id, reward_points)?;
        store.save(order.clone())?;

        self.sequence = sequence;
        draft.state = DraftState::Confirmed;

        info!(
            order = %order.id(),
            guest = %order.guest_id(),
            total = %total,
            reward_points,
            "confirmed order"
        );

        Ok(order)
    }

    /// Abandon the draft, refunding any redeemed points.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::DraftNotEditable`] if the draft is already terminal.
    pub fn cancel(
        &self,
        draft: &mut DraftOrder<'_>,
        ledger: &mut GuestLedger,
    ) -> Result<(), PricingError> {
        ensure_editable(draft)?;

        if draft.points_redeemed > 0 {
            ledger.refund(&draft.guest_id, draft.points_redeemed)?;
        }

        draft.points_redeemed = 0;
        draft.discount = Money::from_minor(0, draft.currency);
        draft.state = DraftState::Abandoned;

        debug!(guest = %draft.guest_id, "abandoned draft");

        Ok(())
    }

    /// Rebuild a historical order from a draft carrying the prices it was
    /// booked at, keeping the persisted total and reward points. The discount
    /// is whatever the total falls short of the line subtotal.
    ///
    /// Consumes a sequence number, so later orders never reuse the id.
    ///
    /// # Errors
    ///
    /// - [`PricingError::EmptyOrder`]: the draft has no apartment or bundle.
    /// - [`PricingError::TotalMismatch`]: the total is more than the lines add up to.
    pub fn restore<'a>(
        &mut self,
        draft: &DraftOrder<'a>,
        booked_at: DateTime,
        total: Money<'a, Currency>,
        reward_points: u64,
    ) -> Result<Order<'a>, PricingError> {
        let Some(apartment_id) = draft.apartment_id() else {
            return Err(PricingError::EmptyOrder);
        };

        let subtotal = draft.compute_total()?;
        let discount_minor = subtotal
            .to_minor_units()
            .checked_sub(total.to_minor_units())
            .filter(|discount| *discount >= 0)
            .ok_or_else(|| PricingError::TotalMismatch {
                subtotal: subtotal.to_string(),
                total: total.to_string(),
            })?;

        self.sequence += 1;

        let id = order_id(
            apartment_id,
            &draft.stay,
            draft.party_size,
            draft.nights,
            booked_at,
            self.sequence,
        );

        Ok(
            Order::from_draft(id, draft, booked_at, subtotal, total, reward_points)
                .with_discount(Money::from_minor(discount_minor, draft.currency)),
        )
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{Date, date};
    use rust_decimal::Decimal;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;
    use crate::products::{
        ApartmentUnit, Bundle, BundleComponents, Product, SupplementaryItem,
    };

    fn usd(minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, USD)
    }

    fn catalog() -> TestResult<Catalog<'static>> {
        let mut catalog = Catalog::new(USD);

        catalog.add_or_update(Product::Apartment(ApartmentUnit::new(
            "U12swan",
            "Unit 12 Swan Building",
            usd(20_000),
            3,
        )?))?;
        catalog.add_or_update(Product::Apartment(ApartmentUnit::new(
            "U13swan",
            "Unit 13 Swan Building",
            usd(19_070),
            2,
        )?))?;

        for (id, name, price) in [
            ("SI1", "Car Park", 2_500),
            ("SI2", "Breakfast", 2_530),
            ("SI6", "Double Extra Bed", 5_000),
        ] {
            catalog.add_or_update(Product::Item(SupplementaryItem::new(
                id, name, usd(price), name,
            )?))?;
        }

        let components = BundleComponents::from_ids("B1", "U12swan", &["SI2", "SI2", "SI1"])?;
        catalog.add_or_update(Product::Bundle(Bundle::new(
            "B1",
            "Bed and breakfast for two",
            components,
            usd(0),
        )?))?;

        Ok(catalog)
    }

    fn guests() -> TestResult<(GuestLedger, Guest)> {
        let mut ledger = GuestLedger::new();
        let guest = ledger.register("Alice", "Smith", date(1990, 3, 7))?.clone();

        Ok((ledger, guest))
    }

    fn stay(check_in: Date, check_out: Date) -> (DateTime, DateTime) {
        (check_in.at(14, 0, 0, 0), check_out.at(10, 0, 0, 0))
    }

    fn booked_at() -> DateTime {
        date(2024, 9, 20).at(9, 30, 0, 0)
    }

    #[test]
    fn apartment_with_car_park_totals_625() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        assert_eq!(engine.add_apartment(&mut draft, &catalog, "U12swan")?, usd(60_000));
        assert_eq!(engine.add_item(&mut draft, &catalog, "SI1", 1)?, usd(2_500));
        assert_eq!(engine.compute_total(&draft)?, usd(62_500));

        let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

        assert_eq!(order.total(), usd(62_500));
        assert_eq!(order.discount(), usd(0));
        assert_eq!(order.reward_points(), 625);
        assert_eq!(order.id(), "BKU1210020301200001");
        assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(625));
        assert_eq!(draft.state(), DraftState::Confirmed);
        assert_eq!(store.len(), 1);

        Ok(())
    }

    #[test]
    fn open_order_validates_stay() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 9));
        assert!(matches!(
            engine.open_order(&catalog, &guest, check_in, check_out, 2),
            Err(PricingError::InvalidDateRange { .. })
        ));

        let same_day = date(2024, 10, 1);
        assert!(matches!(
            engine.open_order(&catalog, &guest, same_day.at(8, 0, 0, 0), same_day.at(20, 0, 0, 0), 2),
            Err(PricingError::InvalidDateRange { .. })
        ));

        let (check_in, check_out) = stay(date(2024, 10, 4), date(2024, 10, 1));
        assert!(engine.open_order(&catalog, &guest, check_in, check_out, 2).is_err());

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 8));
        assert_eq!(
            engine
                .open_order(&catalog, &guest, check_in, check_out, 2)?
                .nights(),
            7
        );

        assert_eq!(
            engine.open_order(&catalog, &guest, check_in, check_out, 0).err(),
            Some(PricingError::InvalidPartySize(0))
        );

        Ok(())
    }

    #[test]
    fn add_item_accumulates_quantities() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_item(&mut draft, &catalog, "SI2", 2)?;
        engine.add_item(&mut draft, &catalog, "SI2", 3)?;

        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.items().first().map(|line| line.quantity), Some(5));
        assert_eq!(draft.items().first().map(|line| line.total), Some(usd(12_650)));

        Ok(())
    }

    #[test]
    fn rejected_item_leaves_draft_unchanged() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        let before = draft.items().to_vec();

        assert_eq!(
            engine.add_item(&mut draft, &catalog, "SI99", 1),
            Err(PricingError::ItemNotFound("SI99".to_string()))
        );
        assert_eq!(
            engine.add_item(&mut draft, &catalog, "SI1", 0),
            Err(PricingError::InvalidQuantity(0))
        );
        assert_eq!(draft.items(), before.as_slice());

        Ok(())
    }

    #[test]
    fn one_apartment_per_order() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;

        assert_eq!(
            engine.add_apartment(&mut draft, &catalog, "U12swan"),
            Err(PricingError::DuplicateLine("U12swan".to_string()))
        );
        assert_eq!(
            engine.add_apartment(&mut draft, &catalog, "U99"),
            Err(PricingError::DuplicateLine("U99".to_string()))
        );

        Ok(())
    }

    #[test]
    fn remove_lines_reports_missing_lines() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        assert_eq!(draft.state(), DraftState::Priced);
        assert_eq!(engine.remove_item(&mut draft, "SI1")?.quantity, 1);
        assert_eq!(
            engine.remove_item(&mut draft, "SI1"),
            Err(PricingError::LineNotFound("SI1".to_string()))
        );
        assert_eq!(
            engine.remove_apartment(&mut draft, "U13swan"),
            Err(PricingError::LineNotFound("U13swan".to_string()))
        );

        engine.remove_apartment(&mut draft, "U12swan")?;

        assert_eq!(draft.state(), DraftState::Open);
        assert_eq!(engine.compute_total(&draft)?, usd(0));

        Ok(())
    }

    #[test]
    fn capacity_plan_counts_extra_beds() -> TestResult {
        let plan = capacity_plan("U13swan", 2, 5, 3)?;

        assert_eq!(
            plan,
            CapacityPlan {
                extra_guests: 3,
                extra_beds_per_night: 2,
                total_extra_bed_units: 6,
            }
        );

        assert_eq!(capacity_plan("U13swan", 2, 2, 3)?.total_extra_bed_units, 0);
        assert_eq!(capacity_plan("U13swan", 2, 6, 3)?.extra_beds_per_night, 2);
        assert_eq!(
            capacity_plan("U13swan", 2, 7, 3),
            Err(PricingError::CapacityExceeded {
                apartment: "U13swan".to_string(),
                party_size: 7,
                max: 6
            })
        );

        Ok(())
    }

    #[test]
    fn capacity_check_adds_extra_bed_line() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 5)?;

        engine.add_apartment(&mut draft, &catalog, "U13swan")?;
        let plan = engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 5)?;

        assert_eq!(plan.total_extra_bed_units, 6);

        let bed = draft.items().iter().find(|line| line.item_id == "SI6");

        assert_eq!(bed.map(|line| line.quantity), Some(6));
        assert_eq!(bed.map(|line| line.total), Some(usd(30_000)));

        Ok(())
    }

    #[test]
    fn repeated_capacity_checks_replace_planned_beds() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 5)?;

        engine.add_apartment(&mut draft, &catalog, "U13swan")?;
        engine.add_item(&mut draft, &catalog, "SI6", 1)?;
        engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 5)?;
        engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 5)?;

        let beds = |draft: &DraftOrder<'static>| {
            draft
                .items()
                .iter()
                .find(|line| line.item_id == "SI6")
                .map(|line| (line.quantity, line.total))
        };

        // one bed by hand, six planned
        assert_eq!(beds(&draft), Some((7, usd(35_000))));

        // three guests need one bed a night
        engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 3)?;

        assert_eq!(beds(&draft), Some((4, usd(20_000))));

        engine.remove_apartment(&mut draft, "U13swan")?;

        assert_eq!(beds(&draft), Some((1, usd(5_000))));

        Ok(())
    }

    #[test]
    fn removing_the_apartment_drops_planned_beds() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 5)?;

        engine.add_apartment(&mut draft, &catalog, "U13swan")?;
        engine.add_item(&mut draft, &catalog, "SI1", 1)?;
        engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 5)?;
        engine.remove_apartment(&mut draft, "U13swan")?;

        let items: Vec<_> = draft.items().iter().map(|line| line.item_id.as_str()).collect();

        assert_eq!(items, vec!["SI1"]);
        assert_eq!(draft.state(), DraftState::Open);

        // a later check on a new apartment starts from zero
        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.guest_capacity_check(&mut draft, &catalog, "U12swan", 5)?;

        let beds = draft.items().iter().find(|line| line.item_id == "SI6");

        assert_eq!(beds.map(|line| line.quantity), Some(3));

        Ok(())
    }

    #[test]
    fn bundle_line_uses_catalog_price() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 3));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        assert_eq!(engine.price_bundle(&mut draft, &catalog, "B1")?, usd(22_048));
        assert_eq!(engine.compute_total(&draft)?, usd(22_048));

        let bundle = draft.bundle().map(|line| {
            let quantities: Vec<_> = line
                .items
                .iter()
                .map(|item| (item.item_id.as_str(), item.quantity))
                .collect();

            (line.apartment.total, quantities)
        });

        assert_eq!(
            bundle,
            Some((usd(40_000), vec![("SI2", 4), ("SI1", 2)]))
        );

        let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

        assert_eq!(order.total(), usd(22_048));
        assert_eq!(order.reward_points(), 220);

        Ok(())
    }

    #[test]
    fn bundle_and_components_do_not_mix() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 3));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        assert_eq!(
            engine.price_bundle(&mut draft, &catalog, "B1"),
            Err(PricingError::MixedOrder)
        );

        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.price_bundle(&mut draft, &catalog, "B1")?;

        assert_eq!(
            engine.add_apartment(&mut draft, &catalog, "U12swan"),
            Err(PricingError::MixedOrder)
        );
        assert_eq!(
            engine.price_bundle(&mut draft, &catalog, "B1"),
            Err(PricingError::DuplicateLine("B1".to_string()))
        );

        Ok(())
    }

    #[test]
    fn bundle_party_must_fit_apartment() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 3));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 8)?;

        assert!(matches!(
            engine.price_bundle(&mut draft, &catalog, "B1"),
            Err(PricingError::CapacityExceeded { max: 7, .. })
        ));
        assert!(draft.bundle().is_none());

        Ok(())
    }

    #[test]
    fn empty_order_cannot_be_confirmed() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 3));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_item(&mut draft, &catalog, "SI1", 2)?;

        let result = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at());

        assert_eq!(result.as_ref().map_err(PricingError::kind).err(), Some(ErrorKind::EmptyOrder));
        assert!(store.is_empty());
        assert_eq!(engine.sequence(), 0);

        Ok(())
    }

    #[test]
    fn redemption_discounts_final_total() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        ledger.accrue(guest.id(), 650)?;

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        assert_eq!(engine.apply_redemption(&mut draft, &mut ledger, 300)?, usd(300));
        assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(350));
        assert_eq!(
            engine.apply_redemption(&mut draft, &mut ledger, 100),
            Err(PricingError::RedemptionAlreadyApplied)
        );

        let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

        assert_eq!(order.subtotal(), usd(62_500));
        assert_eq!(order.discount(), usd(300));
        assert_eq!(order.total(), usd(62_200));
        assert_eq!(order.reward_points(), 622);
        assert_eq!(order.points_redeemed(), 300);
        assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(972));

        Ok(())
    }

    #[test]
    fn redemption_cannot_exceed_total() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let engine = PricingEngine::default();

        ledger.accrue(guest.id(), 5_000)?;
        ledger.set_redeem_rate(guest.id(), Decimal::from(10))?;

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        let result = engine.apply_redemption(&mut draft, &mut ledger, 500);

        assert!(matches!(result, Err(PricingError::ExcessiveDiscount { .. })));
        assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(5_000));
        assert_eq!(draft.discount(), usd(0));

        Ok(())
    }

    #[test]
    fn redemption_errors_propagate_unchanged() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let engine = PricingEngine::default();

        ledger.accrue(guest.id(), 200)?;

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;

        let result = engine.apply_redemption(&mut draft, &mut ledger, 300);

        assert_eq!(
            result,
            Err(PricingError::Guest(GuestError::InsufficientPoints {
                requested: 300,
                balance: 200
            }))
        );
        assert_eq!(result.map_err(|err| err.kind()).err(), Some(ErrorKind::Redemption));

        Ok(())
    }

    #[test]
    fn finalize_rechecks_discount_after_line_removal() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        ledger.accrue(guest.id(), 5_000)?;
        ledger.set_redeem_rate(guest.id(), Decimal::from(5))?;

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

        // 190.70 + 4 * 25.00, less a 250.00 discount
        engine.add_apartment(&mut draft, &catalog, "U13swan")?;
        engine.add_item(&mut draft, &catalog, "SI1", 4)?;
        engine.apply_redemption(&mut draft, &mut ledger, 5_000)?;
        engine.remove_item(&mut draft, "SI1")?;

        let result = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at());

        assert!(matches!(result, Err(PricingError::ExcessiveDiscount { .. })));
        assert!(store.is_empty());

        Ok(())
    }

    #[test]
    fn cancel_refunds_points_and_locks_draft() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let engine = PricingEngine::default();

        ledger.accrue(guest.id(), 400)?;

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.apply_redemption(&mut draft, &mut ledger, 200)?;
        engine.cancel(&mut draft, &mut ledger)?;

        assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(400));
        assert_eq!(draft.state(), DraftState::Abandoned);
        assert_eq!(
            engine.add_item(&mut draft, &catalog, "SI1", 1),
            Err(PricingError::DraftNotEditable(DraftState::Abandoned))
        );

        Ok(())
    }

    #[test]
    fn confirmed_draft_is_frozen() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

        assert_eq!(
            engine.finalize(&mut draft, &mut ledger, &mut store, booked_at()).err(),
            Some(PricingError::DraftNotEditable(DraftState::Confirmed))
        );
        assert_eq!(
            engine.cancel(&mut draft, &mut ledger),
            Err(PricingError::DraftNotEditable(DraftState::Confirmed))
        );

        Ok(())
    }

    #[test]
    fn order_ids_are_unique_per_sequence() -> TestResult {
        let catalog = catalog()?;
        let (mut ledger, guest) = guests()?;
        let mut store = OrderStore::new();
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 2));
        let mut ids = Vec::new();

        for _ in 0..3 {
            let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 1)?;

            engine.add_apartment(&mut draft, &catalog, "U12swan")?;
            ids.push(
                engine
                    .finalize(&mut draft, &mut ledger, &mut store, booked_at())?
                    .id()
                    .to_string(),
            );
        }

        assert_eq!(
            ids,
            vec![
                "BKU1210010101200001",
                "BKU1210010101200002",
                "BKU1210010101200003"
            ]
        );

        Ok(())
    }

    #[test]
    fn order_id_is_reproducible() {
        let stay = StayWindow::new(
            date(2024, 3, 9).at(0, 0, 0, 0),
            date(2024, 3, 12).at(0, 0, 0, 0),
        );
        let booked_at = date(2024, 2, 28).at(17, 45, 0, 0);

        assert_eq!(
            order_id("U20goose", &stay, 4, 3, booked_at, 42),
            order_id("U20goose", &stay, 4, 3, booked_at, 42)
        );
        assert_eq!(
            order_id("U20goose", &stay, 4, 3, booked_at, 42),
            "BKU2003040309280042"
        );
    }

    #[test]
    fn restore_derives_discount_and_advances_sequence() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;
        engine.add_item(&mut draft, &catalog, "SI1", 1)?;

        let order = engine.restore(&draft, booked_at(), usd(62_200), 622)?;

        assert_eq!(order.subtotal(), usd(62_500));
        assert_eq!(order.discount(), usd(300));
        assert_eq!(order.total(), usd(62_200));
        assert_eq!(engine.sequence(), 1);

        Ok(())
    }

    #[test]
    fn restore_rejects_total_above_subtotal() -> TestResult {
        let catalog = catalog()?;
        let (_, guest) = guests()?;
        let mut engine = PricingEngine::default();

        let (check_in, check_out) = stay(date(2024, 10, 1), date(2024, 10, 4));
        let mut draft = engine.open_order(&catalog, &guest, check_in, check_out, 2)?;

        engine.add_apartment(&mut draft, &catalog, "U12swan")?;

        let result = engine.restore(&draft, booked_at(), usd(60_001), 600);

        assert_eq!(
            result.err(),
            Some(PricingError::TotalMismatch {
                subtotal: usd(60_000).to_string(),
                total: usd(60_001).to_string(),
            })
        );
        assert_eq!(engine.sequence(), 0);

        Ok(())
    }

    #[test]
    fn error_kinds_follow_taxonomy() {
        assert_eq!(PricingError::MixedOrder.kind(), ErrorKind::Validation);
        assert_eq!(
            PricingError::ApartmentNotFound("U1".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PricingError::Guest(GuestError::DuplicateGuest("G".to_string())).kind(),
            ErrorKind::Duplicate
        );
        assert_eq!(
            PricingError::Store(OrderStoreError::DuplicateOrderId("BK".to_string())).kind(),
            ErrorKind::Duplicate
        );
        assert_eq!(
            PricingError::Catalog(CatalogError::ReferentialIntegrity {
                id: "SI1".to_string(),
                bundles: 1,
                orders: 0
            })
            .kind(),
            ErrorKind::ReferentialIntegrity
        );
    }
}
