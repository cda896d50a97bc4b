//! Product Fixtures

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    pricing::parse_currency,
    products::{ApartmentUnit, Bundle, BundleComponents, SupplementaryItem},
};

/// Apartment fixture
#[derive(Debug, Deserialize)]
pub struct ApartmentFixture {
    /// Apartment id (e.g. `U12swan`)
    pub id: String,

    /// Apartment name
    pub name: String,

    /// Nightly rate (e.g. "200.00 USD")
    pub rate: String,

    /// Guests the apartment sleeps
    pub capacity: u8,
}

impl ApartmentFixture {
    /// Convert to an apartment unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate or apartment details are invalid.
    pub fn into_apartment(self) -> Result<ApartmentUnit<'static>, FixtureError> {
        let (minor_units, currency) = parse_price(&self.rate)?;

        Ok(ApartmentUnit::new(
            self.id,
            self.name,
            Money::from_minor(minor_units, currency),
            self.capacity,
        )?)
    }
}

/// Supplementary item fixture
#[derive(Debug, Deserialize)]
pub struct ItemFixture {
    /// Item id (e.g. `SI1`)
    pub id: String,

    /// Item name
    pub name: String,

    /// Unit price (e.g. "25.00 USD")
    pub price: String,

    /// Item description
    pub description: String,
}

impl ItemFixture {
    /// Convert to a supplementary item.
    ///
    /// # Errors
    ///
    /// Returns an error if the price or item details are invalid.
    pub fn into_item(self) -> Result<SupplementaryItem<'static>, FixtureError> {
        let (minor_units, currency) = parse_price(&self.price)?;

        Ok(SupplementaryItem::new(
            self.id,
            self.name,
            Money::from_minor(minor_units, currency),
            self.description,
        )?)
    }
}

/// Bundle fixture. Bundles carry no price; the catalog derives it from the
/// components.
#[derive(Debug, Deserialize)]
pub struct BundleFixture {
    /// Bundle id (e.g. `B1`)
    pub id: String,

    /// Bundle name
    pub name: String,

    /// Apartment included in the bundle
    pub apartment: String,

    /// Item ids, repeated per unit
    #[serde(default)]
    pub items: Vec<String>,
}

impl BundleFixture {
    /// Convert to an unpriced bundle in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle details or components are invalid.
    pub fn into_bundle(self, currency: &'static Currency) -> Result<Bundle<'static>, FixtureError> {
        let components = BundleComponents::from_ids(&self.id, &self.apartment, &self.items)?;

        Ok(Bundle::new(
            self.id,
            self.name,
            components,
            Money::from_minor(0, currency),
        )?)
    }
}

/// Parse price string (e.g., "25.30 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount is not a positive decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let minor_units = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| {
            value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .filter(|minor| *minor > 0)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = parse_currency(currency_code)
        .ok_or_else(|| FixtureError::UnknownCurrency((*currency_code).to_string()))?;

    Ok((minor_units, currency))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{AUD, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_amount_and_currency() -> TestResult {
        assert_eq!(parse_price("190.70 USD")?, (19_070, USD));
        assert_eq!(parse_price("25 AUD")?, (2_500, AUD));

        Ok(())
    }

    #[test]
    fn parse_price_rejects_malformed_input() {
        assert!(matches!(
            parse_price("190.70"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("abc USD"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("0.00 USD"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("10.00 XYZ"),
            Err(FixtureError::UnknownCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn bundle_fixture_merges_repeated_items() -> TestResult {
        let fixture = BundleFixture {
            id: "B1".to_string(),
            name: "Romantic Getaway Package".to_string(),
            apartment: "U12swan".to_string(),
            items: vec!["SI2".to_string(), "SI2".to_string(), "SI1".to_string()],
        };

        let bundle = fixture.into_bundle(USD)?;

        assert_eq!(bundle.components.to_string(), "U12swan, 2 x SI2, SI1");

        Ok(())
    }
}
