//! Catalog
//!
//! Owns every bookable product. Products live in a `SlotMap` with a string id
//! index on the side and an insertion-order list for stable listings.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    discounts::{DiscountError, bundle_price_ratio, percent_of_minor},
    pricing::{TotalPriceError, line_total, total_price},
    products::{
        ApartmentUnit, Bundle, BundleComponents, Product, ProductError, ProductKey, ProductKind,
        SupplementaryItem,
    },
    records::codec,
};

/// Errors raised by catalog operations.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Per-kind validation failed.
    #[error(transparent)]
    Product(#[from] ProductError),

    /// No product with this id.
    #[error("product {0} not found")]
    NotFound(String),

    /// A bundle component does not resolve to a product of the right kind.
    #[error("bundle {bundle} component {component} not found in catalog")]
    ComponentNotFound {
        /// Bundle id
        bundle: String,
        /// Missing component id
        component: String,
    },

    /// Removal blocked by bundles or orders that reference the product.
    #[error("product {id} is referenced by {bundles} bundle(s) and {orders} order(s)")]
    ReferentialIntegrity {
        /// Product id
        id: String,
        /// Number of bundles listing the product
        bundles: usize,
        /// Number of orders containing the product
        orders: usize,
    },

    /// A product priced in a currency other than the catalog's.
    #[error("product {id} is priced in {found}, catalog uses {expected}")]
    CurrencyMismatch {
        /// Product id
        id: String,
        /// Catalog currency code
        expected: &'static str,
        /// Product currency code
        found: &'static str,
    },

    /// Bundle price arithmetic failed.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// Bundle discount calculation failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Counts stored orders that reference a product, consulted before removal.
pub trait ProductReferences {
    /// Number of orders whose lines mention `product_id`.
    fn orders_referencing(&self, product_id: &str) -> usize;
}

/// Product catalog
#[derive(Debug)]
pub struct Catalog<'a> {
    products: SlotMap<ProductKey, Product<'a>>,
    keys: FxHashMap<String, ProductKey>,
    insertion_order: Vec<ProductKey>,
    currency: &'a Currency,
}

impl<'a> Catalog<'a> {
    /// Create an empty catalog priced in `currency`.
    pub fn new(currency: &'a Currency) -> Self {
        Self {
            products: SlotMap::with_key(),
            keys: FxHashMap::default(),
            insertion_order: Vec::new(),
            currency,
        }
    }

    /// Catalog currency.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Insert a new product or overwrite the product with the same id.
    ///
    /// Bundle prices are recomputed from the current component prices, and
    /// changing an apartment or item re-prices every bundle that lists it.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the product is priced in another
    /// currency, or a bundle component cannot be resolved.
    pub fn add_or_update(&mut self, product: Product<'a>) -> Result<&Product<'a>, CatalogError> {
        let found = product.price().currency();

        if found != self.currency {
            return Err(CatalogError::CurrencyMismatch {
                id: product.id().to_string(),
                expected: self.currency.iso_alpha_code,
                found: found.iso_alpha_code,
            });
        }

        let product = match product {
            Product::Bundle(mut bundle) => {
                bundle.price = self.bundle_price(&bundle.id, &bundle.components)?;
                Product::Bundle(bundle)
            }
            other => other,
        };

        let id = product.id().to_string();
        let kind = product.kind();

        let key = if let Some(&key) = self.keys.get(&id) {
            let previous = self
                .products
                .get_mut(key)
                .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

            let previous = std::mem::replace(previous, product);

            if kind != ProductKind::Bundle
                && let Err(err) = self.reprice_bundles_using(&id)
            {
                // leave the catalog as it was
                if let Some(slot) = self.products.get_mut(key) {
                    *slot = previous;
                }

                return Err(err);
            }

            debug!(product = %id, "updated product");

            key
        } else {
            let key = self.products.insert(product);

            self.keys.insert(id.clone(), key);
            self.insertion_order.push(key);

            debug!(product = %id, "added product");

            key
        };

        self.products
            .get(key)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Look up a product by exact id, falling back to a case-insensitive name match.
    pub fn find(&self, id_or_name: &str) -> Option<&Product<'a>> {
        let needle = id_or_name.trim();

        self.get(needle).or_else(|| {
            let needle = needle.to_lowercase();

            self.iter()
                .find(|product| product.name().to_lowercase() == needle)
        })
    }

    /// Look up a product by exact id.
    pub fn get(&self, id: &str) -> Option<&Product<'a>> {
        self.keys
            .get(id)
            .and_then(|key| self.products.get(*key))
    }

    /// Look up an apartment unit by id.
    pub fn apartment(&self, id: &str) -> Option<&ApartmentUnit<'a>> {
        self.get(id).and_then(Product::as_apartment)
    }

    /// Look up a supplementary item by id.
    pub fn item(&self, id: &str) -> Option<&SupplementaryItem<'a>> {
        self.get(id).and_then(Product::as_item)
    }

    /// Look up a bundle by id.
    pub fn bundle(&self, id: &str) -> Option<&Bundle<'a>> {
        self.get(id).and_then(Product::as_bundle)
    }

    /// Iterate products in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Product<'a>> {
        self.insertion_order
            .iter()
            .filter_map(|key| self.products.get(*key))
    }

    /// Iterate apartment units in insertion order.
    pub fn apartments(&self) -> impl Iterator<Item = &ApartmentUnit<'a>> {
        self.iter().filter_map(Product::as_apartment)
    }

    /// Iterate supplementary items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &SupplementaryItem<'a>> {
        self.iter().filter_map(Product::as_item)
    }

    /// Iterate bundles in insertion order.
    pub fn bundles(&self) -> impl Iterator<Item = &Bundle<'a>> {
        self.iter().filter_map(Product::as_bundle)
    }

    /// Remove a product that nothing references.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`]: no such product.
    /// - [`CatalogError::ReferentialIntegrity`]: a bundle or stored order uses it.
    pub fn remove(
        &mut self,
        id: &str,
        references: &impl ProductReferences,
    ) -> Result<Product<'a>, CatalogError> {
        let key = *self
            .keys
            .get(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        let bundles = self
            .bundles()
            .filter(|bundle| bundle.id != id && bundle.components.mentions(id))
            .count();

        let orders = references.orders_referencing(id);

        if bundles > 0 || orders > 0 {
            return Err(CatalogError::ReferentialIntegrity {
                id: id.to_string(),
                bundles,
                orders,
            });
        }

        let product = self
            .products
            .remove(key)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        self.keys.remove(id);
        self.insertion_order.retain(|k| *k != key);

        info!(product = %id, "removed product");

        Ok(product)
    }

    /// Price a bundle from its components: 80% of the apartment rate plus
    /// each item price times its quantity, rounded half-up to the cent.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ComponentNotFound`] if a component is missing
    /// or not of the expected kind.
    pub fn bundle_price(
        &self,
        bundle_id: &str,
        components: &BundleComponents,
    ) -> Result<Money<'a, Currency>, CatalogError> {
        let missing = |component: &str| CatalogError::ComponentNotFound {
            bundle: bundle_id.to_string(),
            component: component.to_string(),
        };

        let apartment = self
            .apartment(&components.apartment_id)
            .ok_or_else(|| missing(&components.apartment_id))?;

        let mut lines = Vec::with_capacity(components.items.len() + 1);

        lines.push(apartment.rate);

        for (item_id, quantity) in &components.items {
            let item = self.item(item_id).ok_or_else(|| missing(item_id))?;

            lines.push(line_total(&item.price, *quantity)?);
        }

        let sum = total_price(lines, self.currency)?;
        let minor = percent_of_minor(&bundle_price_ratio(), sum.to_minor_units())?;

        Ok(Money::from_minor(minor, self.currency))
    }

    /// Catalog records: apartments, then items, then bundles.
    pub fn serialize_all(&self) -> Vec<String> {
        let apartments = self.iter().filter(|p| p.kind() == ProductKind::Apartment);
        let items = self.iter().filter(|p| p.kind() == ProductKind::Item);
        let bundles = self.iter().filter(|p| p.kind() == ProductKind::Bundle);

        apartments
            .chain(items)
            .chain(bundles)
            .map(codec::format_product)
            .collect()
    }

    fn reprice_bundles_using(&mut self, component_id: &str) -> Result<(), CatalogError> {
        let mut repriced = Vec::new();

        for (key, product) in &self.products {
            if let Product::Bundle(bundle) = product
                && bundle.components.mentions(component_id)
            {
                repriced.push((key, self.bundle_price(&bundle.id, &bundle.components)?));
            }
        }

        for (key, price) in repriced {
            if let Some(Product::Bundle(bundle)) = self.products.get_mut(key) {
                debug!(bundle = %bundle.id, %price, "repriced bundle");

                bundle.price = price;
            }
        }

        Ok(())
    }
}
