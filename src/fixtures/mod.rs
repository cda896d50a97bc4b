//! Fixtures

use std::{fs, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
    catalog::{Catalog, CatalogError},
    fixtures::{
        guests::GuestFixture,
        products::{ApartmentFixture, BundleFixture, ItemFixture},
    },
    guests::{Guest, GuestError, GuestLedger},
    products::{Product, ProductError},
};

pub mod guests;
pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid date format
    #[error("Invalid date, expected dd/mm/yyyy: {0}")]
    InvalidDate(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No apartments or items loaded yet
    #[error("No priced products loaded yet; currency unknown")]
    NoCurrency,

    /// Invalid product definition
    #[error(transparent)]
    Product(#[from] ProductError),

    /// Product rejected by the catalog
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Invalid or duplicate guest
    #[error(transparent)]
    Guest(#[from] GuestError),
}

/// A fixture set file.
#[derive(Debug, Deserialize)]
pub struct FixtureSet {
    /// Apartment units
    #[serde(default)]
    pub apartments: Vec<ApartmentFixture>,

    /// Supplementary items
    #[serde(default)]
    pub items: Vec<ItemFixture>,

    /// Bundles, priced from the apartments and items above
    #[serde(default)]
    pub bundles: Vec<BundleFixture>,

    /// Guests
    #[serde(default)]
    pub guests: Vec<GuestFixture>,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Catalog, created once the first priced product fixes the currency
    catalog: Option<Catalog<'static>>,

    /// Guests
    ledger: GuestLedger,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: None,
            ledger: GuestLedger::new(),
        }
    }

    /// Load a fixture set from `<base path>/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// product or guest is invalid.
    pub fn load_set(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.load_str(&contents)?;

        info!(
            set = name,
            products = self.catalog.as_ref().map_or(0, Catalog::len),
            guests = self.ledger.len(),
            "loaded fixture set"
        );

        Ok(self)
    }

    /// Load a fixture set from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed, or if any product or
    /// guest is invalid.
    pub fn load_str(&mut self, contents: &str) -> Result<&mut Self, FixtureError> {
        let set: FixtureSet = serde_norway::from_str(contents)?;

        for apartment in set.apartments {
            self.add_product(Product::Apartment(apartment.into_apartment()?))?;
        }

        for item in set.items {
            self.add_product(Product::Item(item.into_item()?))?;
        }

        for bundle in set.bundles {
            let catalog = self.catalog.as_mut().ok_or(FixtureError::NoCurrency)?;
            let bundle = bundle.into_bundle(catalog.currency())?;

            catalog.add_or_update(Product::Bundle(bundle))?;
        }

        for guest in set.guests {
            self.ledger.insert(Guest::try_from(guest)?)?;
        }

        Ok(self)
    }

    fn add_product(&mut self, product: Product<'static>) -> Result<(), FixtureError> {
        let currency = product.price().currency();
        let catalog = self.catalog.get_or_insert_with(|| Catalog::new(currency));

        if catalog.currency() != currency {
            return Err(FixtureError::CurrencyMismatch(
                catalog.currency().iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            ));
        }

        catalog.add_or_update(product)?;

        Ok(())
    }

    /// Load a complete fixture set from the default base path
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_set(name)?;

        Ok(fixture)
    }

    /// Catalog built from the fixture
    ///
    /// # Errors
    ///
    /// Returns an error if no priced products were loaded.
    pub fn catalog(&self) -> Result<&Catalog<'static>, FixtureError> {
        self.catalog.as_ref().ok_or(FixtureError::NoCurrency)
    }

    /// Guests built from the fixture
    pub fn ledger(&self) -> &GuestLedger {
        &self.ledger
    }

    /// Consume the fixture, returning its catalog and guests
    ///
    /// # Errors
    ///
    /// Returns an error if no priced products were loaded.
    pub fn into_parts(self) -> Result<(Catalog<'static>, GuestLedger), FixtureError> {
        let catalog = self.catalog.ok_or(FixtureError::NoCurrency)?;

        Ok((catalog, self.ledger))
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
