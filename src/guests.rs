//! Guests
//!
//! The guest ledger: registered guests, their reward-point balances and the
//! rates at which they earn and redeem points.

use jiff::civil::Date;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    discounts::{DiscountError, REDEMPTION_BLOCK, redemption_discount_minor},
    records::codec,
};

/// Default reward rate: one point per dollar.
pub const DEFAULT_REWARD_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Default redeem rate: one dollar per 100 points.
pub const DEFAULT_REDEEM_RATE: Decimal = Decimal::ONE;

/// Errors raised by the guest ledger.
#[derive(Debug, Error, PartialEq)]
pub enum GuestError {
    /// A name is blank or contains characters other than letters and spaces.
    #[error("invalid {field} {value:?}: use letters and spaces only")]
    InvalidName {
        /// `first name` or `last name`
        field: &'static str,
        /// Rejected value
        value: String,
    },

    /// A guest with the same derived id already exists.
    #[error("guest {0} is already registered")]
    DuplicateGuest(String),

    /// No guest with this id.
    #[error("guest {0} not found")]
    NotFound(String),

    /// Redeemed points must be a positive multiple of 100.
    #[error("cannot redeem {0} points: redeem at least {REDEMPTION_BLOCK}, in multiples of {REDEMPTION_BLOCK}")]
    InvalidRedemption(u64),

    /// The guest does not hold enough points.
    #[error("cannot redeem {requested} points, balance is {balance}")]
    InsufficientPoints {
        /// Points requested
        requested: u64,
        /// Points held
        balance: u64,
    },

    /// Reward rates must be positive.
    #[error("reward rate must be positive, got {0}")]
    InvalidRewardRate(Decimal),

    /// Redeem rates must be at least 1.
    #[error("redeem rate must be at least 1, got {0}")]
    InvalidRedeemRate(Decimal),

    /// Points arithmetic overflowed.
    #[error("reward point balance overflowed")]
    Overflow,

    /// Discount conversion failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Derive a guest id: first initial, date of birth as `dd-mm-yyyy`, the first
/// two letters of the last name, then the day of birth again.
///
/// Two guests sharing those inputs share an id.
pub fn guest_id(first_name: &str, last_name: &str, date_of_birth: Date) -> String {
    let first_initial: String = first_name.trim().chars().take(1).collect();
    let last_initials: String = last_name.trim().chars().take(2).collect();

    format!(
        "{first_initial}{}{last_initials}{:02}",
        date_of_birth.strftime("%d-%m-%Y"),
        date_of_birth.day()
    )
}

fn check_name(field: &'static str, value: &str) -> Result<(), GuestError> {
    let valid = !value.trim().is_empty()
        && value.chars().all(|ch| ch.is_alphabetic() || ch == ' ');

    if valid {
        Ok(())
    } else {
        Err(GuestError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

/// Guest
#[derive(Debug, Clone, PartialEq)]
pub struct Guest {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: Date,
    reward_points: u64,
    reward_rate: Decimal,
    redeem_rate: Decimal,
}

impl Guest {
    /// Create a guest with no points and default rates.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::InvalidName`] for a malformed name.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: Date,
    ) -> Result<Self, GuestError> {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();

        check_name("first name", &first_name)?;
        check_name("last name", &last_name)?;

        Ok(Self {
            id: guest_id(&first_name, &last_name, date_of_birth),
            first_name,
            last_name,
            date_of_birth,
            reward_points: 0,
            reward_rate: DEFAULT_REWARD_RATE,
            redeem_rate: DEFAULT_REDEEM_RATE,
        })
    }

    /// Set the stored balance and rates, as read back from a guest record.
    ///
    /// # Errors
    ///
    /// Returns an error if either rate is out of range.
    pub fn with_rewards(
        mut self,
        reward_points: u64,
        reward_rate: Decimal,
        redeem_rate: Decimal,
    ) -> Result<Self, GuestError> {
        check_reward_rate(reward_rate)?;
        check_redeem_rate(redeem_rate)?;

        self.reward_points = reward_points;
        self.reward_rate = reward_rate;
        self.redeem_rate = redeem_rate;

        Ok(self)
    }

    /// Guest id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// First name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Last name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// `First Last`
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Date of birth.
    pub fn date_of_birth(&self) -> Date {
        self.date_of_birth
    }

    /// Current reward point balance.
    pub fn reward_points(&self) -> u64 {
        self.reward_points
    }

    /// Points earned per dollar, as a percentage (100 = one point per dollar).
    pub fn reward_rate(&self) -> Decimal {
        self.reward_rate
    }

    /// Dollars of discount per 100 points.
    pub fn redeem_rate(&self) -> Decimal {
        self.redeem_rate
    }
}

fn check_reward_rate(rate: Decimal) -> Result<(), GuestError> {
    if rate > Decimal::ZERO {
        Ok(())
    } else {
        Err(GuestError::InvalidRewardRate(rate))
    }
}

fn check_redeem_rate(rate: Decimal) -> Result<(), GuestError> {
    if rate >= Decimal::ONE {
        Ok(())
    } else {
        Err(GuestError::InvalidRedeemRate(rate))
    }
}

/// Registered guests keyed by their derived id.
#[derive(Debug, Default)]
pub struct GuestLedger {
    guests: FxHashMap<String, Guest>,
    insertion_order: Vec<String>,
}

impl GuestLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of guests.
    pub fn len(&self) -> usize {
        self.guests.len()
    }

    /// Whether no guests are registered.
    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }

    /// Register a new guest.
    ///
    /// # Errors
    ///
    /// - [`GuestError::InvalidName`]: malformed name.
    /// - [`GuestError::DuplicateGuest`]: the derived id is taken.
    pub fn register(
        &mut self,
        first_name: &str,
        last_name: &str,
        date_of_birth: Date,
    ) -> Result<&Guest, GuestError> {
        let guest = self.insert(Guest::new(first_name, last_name, date_of_birth)?)?;

        info!(guest = %guest.id, "registered guest");

        Ok(guest)
    }

    /// Add a fully formed guest, e.g. one read from records.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::DuplicateGuest`] if the id is taken.
    pub fn insert(&mut self, guest: Guest) -> Result<&Guest, GuestError> {
        if self.guests.contains_key(&guest.id) {
            return Err(GuestError::DuplicateGuest(guest.id));
        }

        let id = guest.id.clone();

        self.insertion_order.push(id.clone());

        Ok(self.guests.entry(id).or_insert(guest))
    }

    /// Look up a guest by exact id, falling back to a case-insensitive full-name match.
    pub fn find(&self, id_or_name: &str) -> Option<&Guest> {
        let needle = id_or_name.trim();

        self.get(needle).or_else(|| {
            let needle = needle.to_lowercase();

            self.iter()
                .find(|guest| guest.full_name().to_lowercase() == needle)
        })
    }

    /// Look up a guest by exact id.
    pub fn get(&self, id: &str) -> Option<&Guest> {
        self.guests.get(id)
    }

    /// Iterate guests in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Guest> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.guests.get(id))
    }

    /// Add earned points to a guest's balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest is unknown or the balance overflows.
    pub fn accrue(&mut self, guest_id: &str, points: u64) -> Result<u64, GuestError> {
        let guest = self.guest_mut(guest_id)?;

        guest.reward_points = guest
            .reward_points
            .checked_add(points)
            .ok_or(GuestError::Overflow)?;

        debug!(guest = %guest_id, points, balance = guest.reward_points, "accrued points");

        Ok(guest.reward_points)
    }

    /// Validate a redemption and return the discount in minor units, without
    /// touching the balance.
    ///
    /// # Errors
    ///
    /// - [`GuestError::NotFound`]: unknown guest.
    /// - [`GuestError::InvalidRedemption`]: not a positive multiple of 100.
    /// - [`GuestError::InsufficientPoints`]: more points than the balance.
    pub fn quote_redemption(&self, guest_id: &str, points: u64) -> Result<i64, GuestError> {
        let guest = self
            .get(guest_id)
            .ok_or_else(|| GuestError::NotFound(guest_id.to_string()))?;

        if points < REDEMPTION_BLOCK || points % REDEMPTION_BLOCK != 0 {
            return Err(GuestError::InvalidRedemption(points));
        }

        if points > guest.reward_points {
            return Err(GuestError::InsufficientPoints {
                requested: points,
                balance: guest.reward_points,
            });
        }

        Ok(redemption_discount_minor(points, guest.redeem_rate)?)
    }

    /// Deduct `points` from the guest's balance and return the discount in minor units.
    ///
    /// # Errors
    ///
    /// Same as [`GuestLedger::quote_redemption`].
    pub fn redeem(&mut self, guest_id: &str, points: u64) -> Result<i64, GuestError> {
        let discount = self.quote_redemption(guest_id, points)?;
        let guest = self.guest_mut(guest_id)?;

        guest.reward_points -= points;

        info!(guest = %guest_id, points, discount, balance = guest.reward_points, "redeemed points");

        Ok(discount)
    }

    /// Give back points from a redemption that did not go through.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest is unknown or the balance overflows.
    pub fn refund(&mut self, guest_id: &str, points: u64) -> Result<u64, GuestError> {
        let guest = self.guest_mut(guest_id)?;

        guest.reward_points = guest
            .reward_points
            .checked_add(points)
            .ok_or(GuestError::Overflow)?;

        info!(guest = %guest_id, points, "refunded points");

        Ok(guest.reward_points)
    }

    /// Change how many points a guest earns per dollar.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest is unknown or `rate` is not positive.
    pub fn set_reward_rate(&mut self, guest_id: &str, rate: Decimal) -> Result<(), GuestError> {
        check_reward_rate(rate)?;

        self.guest_mut(guest_id)?.reward_rate = rate;

        info!(guest = %guest_id, %rate, "updated reward rate");

        Ok(())
    }

    /// Change how many dollars 100 points are worth to a guest.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest is unknown or `rate` is below 1.
    pub fn set_redeem_rate(&mut self, guest_id: &str, rate: Decimal) -> Result<(), GuestError> {
        check_redeem_rate(rate)?;

        self.guest_mut(guest_id)?.redeem_rate = rate;

        info!(guest = %guest_id, %rate, "updated redeem rate");

        Ok(())
    }

    /// Guest records in registration order.
    pub fn serialize_all(&self) -> Vec<String> {
        self.iter().map(codec::format_guest).collect()
    }

    fn guest_mut(&mut self, guest_id: &str) -> Result<&mut Guest, GuestError> {
        self.guests
            .get_mut(guest_id)
            .ok_or_else(|| GuestError::NotFound(guest_id.to_string()))
    }
}
