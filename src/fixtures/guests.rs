//! Guest Fixtures

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    guests::{DEFAULT_REDEEM_RATE, DEFAULT_REWARD_RATE, Guest},
    records::codec::parse_date,
};

/// Guest fixture
#[derive(Debug, Deserialize)]
pub struct GuestFixture {
    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,

    /// Date of birth (`dd/mm/yyyy`)
    pub date_of_birth: String,

    /// Opening points balance
    #[serde(default)]
    pub reward_points: u64,

    /// Percent of spend awarded as points
    #[serde(default = "default_reward_rate")]
    pub reward_rate: Decimal,

    /// Cents of discount per redeemed point
    #[serde(default = "default_redeem_rate")]
    pub redeem_rate: Decimal,
}

fn default_reward_rate() -> Decimal {
    DEFAULT_REWARD_RATE
}

fn default_redeem_rate() -> Decimal {
    DEFAULT_REDEEM_RATE
}

impl TryFrom<GuestFixture> for Guest {
    type Error = FixtureError;

    fn try_from(fixture: GuestFixture) -> Result<Self, Self::Error> {
        let date_of_birth = parse_date(&fixture.date_of_birth)
            .map_err(|_err| FixtureError::InvalidDate(fixture.date_of_birth.clone()))?;

        Ok(
            Guest::new(fixture.first_name, fixture.last_name, date_of_birth)?.with_rewards(
                fixture.reward_points,
                fixture.reward_rate,
                fixture.redeem_rate,
            )?,
        )
    }
}
