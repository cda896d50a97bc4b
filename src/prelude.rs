//! Pythonia prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    catalog::{Catalog, CatalogError, ProductReferences},
    discounts::DiscountError,
    draft::{ApartmentLine, BundleLine, DraftOrder, DraftState, ItemLine, StayWindow},
    engine::{CapacityPlan, ErrorKind, PricingEngine, PricingError},
    fixtures::{Fixture, FixtureError},
    guests::{Guest, GuestError, GuestLedger},
    orders::{
        BookingPeriod, BundleReport, BundleStatistics, GuestSpend, Order, OrderStore,
        OrderStoreError, ProductUsage, Statistics,
    },
    pricing::TotalPriceError,
    products::{
        ApartmentUnit, Bundle, BundleComponents, Product, ProductError, ProductKey, ProductKind,
        SupplementaryItem,
    },
    receipt::{Receipt, ReceiptError},
    records::{LoadReport, RecordError, Records, RecordsError, SkippedRecord},
};
