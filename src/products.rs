//! Products
//!
//! Everything a guest can book: apartment units, supplementary items and
//! bundles. Each kind is identified by its id prefix (`U…`, `SI…`, `B…`).

use std::fmt;

use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;
use smallvec::SmallVec;
use thiserror::Error;

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Largest base occupancy of an apartment unit, before extra beds.
pub const MAX_CAPACITY: u8 = 4;

/// Errors raised when a product fails its per-kind validation rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    /// The id prefix does not match the product kind.
    #[error("product id {id:?} must start with {prefix:?}")]
    InvalidId {
        /// Offending id
        id: String,
        /// Prefix required for the kind
        prefix: &'static str,
    },

    /// The display name is blank.
    #[error("product {0} must have a name")]
    EmptyName(String),

    /// Rates and prices must be strictly positive.
    #[error("product {0} must have a positive price")]
    NonPositivePrice(String),

    /// Apartment capacity outside `1..=4`.
    #[error("apartment {id} capacity {capacity} is outside 1..={MAX_CAPACITY}")]
    CapacityOutOfRange {
        /// Apartment id
        id: String,
        /// Rejected capacity
        capacity: u8,
    },

    /// Supplementary items need a description.
    #[error("supplementary item {0} must have a description")]
    EmptyDescription(String),

    /// A bundle component has the wrong prefix for its slot.
    #[error("bundle {bundle} has invalid component {component:?}")]
    InvalidComponent {
        /// Bundle id
        bundle: String,
        /// Component id
        component: String,
    },

    /// A bundle lists more than one apartment unit.
    #[error("bundle {0} cannot contain more than one apartment unit")]
    MultipleApartments(String),

    /// A bundle component was given a zero quantity.
    #[error("bundle {bundle} component {component} has zero quantity")]
    ZeroQuantity {
        /// Bundle id
        bundle: String,
        /// Component id
        component: String,
    },
}

/// Product kind, derived from the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKind {
    /// Apartment unit (`U…`)
    Apartment,

    /// Supplementary item (`SI…`)
    Item,

    /// Bundle (`B…`)
    Bundle,
}

impl ProductKind {
    /// Classify an id by its prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        if id.starts_with("SI") {
            Some(Self::Item)
        } else if id.starts_with('U') {
            Some(Self::Apartment)
        } else if id.starts_with('B') {
            Some(Self::Bundle)
        } else {
            None
        }
    }

    /// Required id prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Apartment => "U",
            Self::Item => "SI",
            Self::Bundle => "B",
        }
    }

    /// Unit in which booked quantities of this kind are counted.
    pub fn quantity_unit(self) -> &'static str {
        match self {
            Self::Apartment => "nights",
            Self::Item => "units",
            Self::Bundle => "bookings",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::Item => "Item",
            Self::Bundle => "Bundle",
        }
    }
}

fn check_id(id: &str, kind: ProductKind) -> Result<(), ProductError> {
    if ProductKind::from_id(id) == Some(kind) {
        Ok(())
    } else {
        Err(ProductError::InvalidId {
            id: id.to_string(),
            prefix: kind.prefix(),
        })
    }
}

fn check_name(id: &str, name: &str) -> Result<(), ProductError> {
    if name.trim().is_empty() {
        Err(ProductError::EmptyName(id.to_string()))
    } else {
        Ok(())
    }
}

fn check_price(id: &str, price: &Money<'_, Currency>) -> Result<(), ProductError> {
    if price.to_minor_units() > 0 {
        Ok(())
    } else {
        Err(ProductError::NonPositivePrice(id.to_string()))
    }
}

/// An apartment unit, priced per night.
#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentUnit<'a> {
    /// Apartment id (`U…`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Rate per night
    pub rate: Money<'a, Currency>,

    /// Base guest count before extra beds
    pub capacity: u8,
}

impl<'a> ApartmentUnit<'a> {
    /// Create a validated apartment unit.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if the id, name, rate or capacity is invalid.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rate: Money<'a, Currency>,
        capacity: u8,
    ) -> Result<Self, ProductError> {
        let id = id.into();
        let name = name.into();

        check_id(&id, ProductKind::Apartment)?;
        check_name(&id, &name)?;
        check_price(&id, &rate)?;

        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(ProductError::CapacityOutOfRange { id, capacity });
        }

        Ok(Self {
            id,
            name,
            rate,
            capacity,
        })
    }
}

/// An add-on item, priced per unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementaryItem<'a> {
    /// Item id (`SI…`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price
    pub price: Money<'a, Currency>,

    /// Free-text description
    pub description: String,
}

impl<'a> SupplementaryItem<'a> {
    /// Create a validated supplementary item.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if the id, name, price or description is invalid.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Money<'a, Currency>,
        description: impl Into<String>,
    ) -> Result<Self, ProductError> {
        let id = id.into();
        let name = name.into();
        let description = description.into();

        check_id(&id, ProductKind::Item)?;
        check_name(&id, &name)?;
        check_price(&id, &price)?;

        if description.trim().is_empty() {
            return Err(ProductError::EmptyDescription(id));
        }

        Ok(Self {
            id,
            name,
            price,
            description,
        })
    }
}

/// The component multiset of a bundle: one apartment plus item quantities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleComponents {
    /// The single apartment unit in the bundle
    pub apartment_id: String,

    /// Item ids with quantities, in first-seen order
    pub items: SmallVec<[(String, u32); 8]>,
}

impl BundleComponents {
    /// Build components from an apartment id and a flat list of item ids,
    /// where repeated ids express quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if a second apartment or an unknown kind is listed.
    pub fn from_ids<S: AsRef<str>>(
        bundle_id: &str,
        apartment_id: &str,
        item_ids: &[S],
    ) -> Result<Self, ProductError> {
        let mut items: SmallVec<[(String, u32); 8]> = SmallVec::new();

        for item_id in item_ids {
            let item_id = item_id.as_ref().trim();

            match ProductKind::from_id(item_id) {
                Some(ProductKind::Item) => {}
                Some(ProductKind::Apartment) => {
                    return Err(ProductError::MultipleApartments(bundle_id.to_string()));
                }
                _ => {
                    return Err(ProductError::InvalidComponent {
                        bundle: bundle_id.to_string(),
                        component: item_id.to_string(),
                    });
                }
            }

            if let Some((_, quantity)) = items.iter_mut().find(|(id, _)| id == item_id) {
                *quantity += 1;
            } else {
                items.push((item_id.to_string(), 1));
            }
        }

        Ok(Self {
            apartment_id: apartment_id.trim().to_string(),
            items,
        })
    }

    /// Item ids repeated per quantity, as written in records.
    pub fn flat_item_ids(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .flat_map(|(id, quantity)| (0..*quantity).map(move |_| id.as_str()))
    }

    /// Whether the bundle references the given product id.
    pub fn mentions(&self, product_id: &str) -> bool {
        self.apartment_id == product_id || self.items.iter().any(|(id, _)| id == product_id)
    }
}

impl fmt::Display for BundleComponents {
    /// `U12swan, 2 x SI2, SI1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.apartment_id)?;

        for (id, quantity) in &self.items {
            if *quantity > 1 {
                write!(f, ", {quantity} x {id}")?;
            } else {
                write!(f, ", {id}")?;
            }
        }

        Ok(())
    }
}

/// A discounted package of one apartment and some items.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle<'a> {
    /// Bundle id (`B…`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Package price (80% of the component sum), computed by the catalog
    pub price: Money<'a, Currency>,

    /// Components
    pub components: BundleComponents,
}

impl<'a> Bundle<'a> {
    /// Create a validated bundle. The price is expected to come from
    /// [`Catalog::bundle_price`](crate::catalog::Catalog::bundle_price).
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if the id, name or components are invalid.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        components: BundleComponents,
        price: Money<'a, Currency>,
    ) -> Result<Self, ProductError> {
        let id = id.into();
        let name = name.into();

        check_id(&id, ProductKind::Bundle)?;
        check_name(&id, &name)?;

        if ProductKind::from_id(&components.apartment_id) != Some(ProductKind::Apartment) {
            return Err(ProductError::InvalidComponent {
                bundle: id,
                component: components.apartment_id,
            });
        }

        if let Some((component, _)) = components.items.iter().find(|(_, q)| *q == 0) {
            return Err(ProductError::ZeroQuantity {
                bundle: id.clone(),
                component: component.clone(),
            });
        }

        Ok(Self {
            id,
            name,
            price,
            components,
        })
    }
}

/// Product
#[derive(Debug, Clone, PartialEq)]
pub enum Product<'a> {
    /// Apartment unit
    Apartment(ApartmentUnit<'a>),

    /// Supplementary item
    Item(SupplementaryItem<'a>),

    /// Bundle
    Bundle(Bundle<'a>),
}

impl<'a> Product<'a> {
    /// Product id.
    pub fn id(&self) -> &str {
        match self {
            Product::Apartment(apartment) => &apartment.id,
            Product::Item(item) => &item.id,
            Product::Bundle(bundle) => &bundle.id,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Product::Apartment(apartment) => &apartment.name,
            Product::Item(item) => &item.name,
            Product::Bundle(bundle) => &bundle.name,
        }
    }

    /// Unit price: nightly rate, item price or package price.
    pub fn price(&self) -> Money<'a, Currency> {
        match self {
            Product::Apartment(apartment) => apartment.rate,
            Product::Item(item) => item.price,
            Product::Bundle(bundle) => bundle.price,
        }
    }

    /// Product kind.
    pub fn kind(&self) -> ProductKind {
        match self {
            Product::Apartment(_) => ProductKind::Apartment,
            Product::Item(_) => ProductKind::Item,
            Product::Bundle(_) => ProductKind::Bundle,
        }
    }

    /// Apartment details, if this is an apartment.
    pub fn as_apartment(&self) -> Option<&ApartmentUnit<'a>> {
        match self {
            Product::Apartment(apartment) => Some(apartment),
            _ => None,
        }
    }

    /// Item details, if this is a supplementary item.
    pub fn as_item(&self) -> Option<&SupplementaryItem<'a>> {
        match self {
            Product::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Bundle details, if this is a bundle.
    pub fn as_bundle(&self) -> Option<&Bundle<'a>> {
        match self {
            Product::Bundle(bundle) => Some(bundle),
            _ => None,
        }
    }
}

impl fmt::Display for Product<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Apartment(apartment) => write!(
                f,
                "{}: {} - {}/night, sleeps {}",
                apartment.id, apartment.name, apartment.rate, apartment.capacity
            ),
            Product::Item(item) => write!(
                f,
                "{}: {} - {} ({})",
                item.id, item.name, item.price, item.description
            ),
            Product::Bundle(bundle) => write!(
                f,
                "{}: {} - Components: {} - {}",
                bundle.id, bundle.name, bundle.components, bundle.price
            ),
        }
    }
}
