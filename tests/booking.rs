//! Booking scenarios against the `pythonia` fixture set.
//!
//! The fixture carries the business's real catalog:
//!
//! - `U12swan`: Unit 12 Swan Building, $200.00/night, sleeps 3
//! - `U13swan`: Unit 13 Swan Building, $190.70/night, sleeps 2
//! - `SI1`: Car Park, $25.00
//! - `SI6`: Double Extra Bed, $50.00
//! - `B1`: Romantic Getaway Package, `U12swan` + 2 x `SI2` + `SI1`, `SI4`,
//!   `SI16`, `SI20`: (200.00 + 50.60 + 25.00 + 15.50 + 40.00 + 120.00) * 0.8 = $360.88

use jiff::civil::{DateTime, date};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::USD};
use testresult::TestResult;

use pythonia::prelude::*;

struct Desk {
    catalog: Catalog<'static>,
    ledger: GuestLedger,
    engine: PricingEngine,
    store: OrderStore<'static>,
}

fn desk() -> TestResult<Desk> {
    let (catalog, ledger) = Fixture::from_set("pythonia")?.into_parts()?;

    Ok(Desk {
        catalog,
        ledger,
        engine: PricingEngine::default(),
        store: OrderStore::new(),
    })
}

fn usd(minor: i64) -> Money<'static, rusty_money::iso::Currency> {
    Money::from_minor(minor, USD)
}

fn booked_at() -> DateTime {
    date(2024, 9, 20).at(9, 30, 0, 0)
}

#[test]
fn fixture_set_loads_whole_catalog() -> TestResult {
    let desk = desk()?;

    assert_eq!(desk.catalog.apartments().count(), 10);
    assert_eq!(desk.catalog.items().count(), 20);
    assert_eq!(desk.catalog.bundles().count(), 18);
    assert_eq!(desk.ledger.len(), 10);
    assert_eq!(desk.catalog.get("B1").map(Product::price), Some(usd(36_088)));

    Ok(())
}

#[test]
fn apartment_with_car_park_totals_625() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    // reward rate 10
    let guest = ledger.find("John Doe").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(14, 0, 0, 0),
        date(2024, 10, 4).at(10, 0, 0, 0),
        2,
    )?;

    assert_eq!(engine.add_apartment(&mut draft, &catalog, "U12swan")?, usd(60_000));
    assert_eq!(engine.add_item(&mut draft, &catalog, "SI1", 1)?, usd(2_500));
    assert_eq!(engine.compute_total(&draft)?, usd(62_500));

    let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    assert_eq!(order.id(), "BKU1210020301200001");
    assert_eq!(order.total(), usd(62_500));
    assert_eq!(order.discount(), usd(0));
    // 625.00 * 10 / 100 = 62.5, rounded half to even
    assert_eq!(order.reward_points(), 62);
    assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(150 + 62));
    assert_eq!(draft.state(), DraftState::Confirmed);

    Ok(())
}

#[test]
fn redemption_discounts_and_earns_on_the_final_total() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    // 300 points, reward rate 15, redeem rate 7
    let guest = ledger.find("M25-12-1975Jo25").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(14, 0, 0, 0),
        date(2024, 10, 4).at(10, 0, 0, 0),
        2,
    )?;

    engine.add_apartment(&mut draft, &catalog, "U12swan")?;
    engine.add_item(&mut draft, &catalog, "SI1", 1)?;

    assert_eq!(
        engine.apply_redemption(&mut draft, &mut ledger, 250),
        Err(PricingError::Guest(GuestError::InvalidRedemption(250)))
    );
    assert_eq!(
        engine.apply_redemption(&mut draft, &mut ledger, 300)?,
        usd(2_100)
    );
    assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(0));

    let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    assert_eq!(order.subtotal(), usd(62_500));
    assert_eq!(order.total(), usd(60_400));
    // 604.00 * 15 / 100 = 90.6
    assert_eq!(order.reward_points(), 91);
    assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(91));

    Ok(())
}

#[test]
fn cancelling_a_draft_refunds_redeemed_points() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        engine,
        ..
    } = desk()?;

    let guest = ledger.find("Jane Smith").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 2).at(0, 0, 0, 0),
        1,
    )?;

    engine.add_apartment(&mut draft, &catalog, "U20goose")?;
    engine.apply_redemption(&mut draft, &mut ledger, 200)?;

    assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(0));

    engine.cancel(&mut draft, &mut ledger)?;

    assert_eq!(ledger.get(guest.id()).map(Guest::reward_points), Some(200));
    assert_eq!(draft.state(), DraftState::Abandoned);
    assert!(matches!(
        engine.add_item(&mut draft, &catalog, "SI1", 1),
        Err(PricingError::DraftNotEditable(DraftState::Abandoned))
    ));

    Ok(())
}

#[test]
fn large_party_gets_extra_beds() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    let guest = ledger.find("Emily Brown").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 4).at(0, 0, 0, 0),
        5,
    )?;

    engine.add_apartment(&mut draft, &catalog, "U13swan")?;

    let plan = engine.guest_capacity_check(&mut draft, &catalog, "U13swan", 5)?;

    assert_eq!(
        plan,
        CapacityPlan {
            extra_guests: 3,
            extra_beds_per_night: 2,
            total_extra_bed_units: 6,
        }
    );

    let beds = draft
        .items()
        .iter()
        .find(|line| line.item_id == "SI6")
        .ok_or("extra bed line missing")?;

    assert_eq!(beds.quantity, 6);
    assert_eq!(beds.total, usd(30_000));

    let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    // 190.70 * 3 + 6 * 50.00
    assert_eq!(order.total(), usd(87_210));

    let mut crowded = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 4).at(0, 0, 0, 0),
        7,
    )?;

    let result = engine.guest_capacity_check(&mut crowded, &catalog, "U13swan", 7);

    assert!(matches!(result, Err(PricingError::CapacityExceeded { .. })));
    assert!(crowded.items().is_empty());

    Ok(())
}

#[test]
fn bundle_booking_keeps_the_catalog_price() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    let guest = ledger.find("Chris Davis").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 11, 1).at(0, 0, 0, 0),
        date(2024, 11, 3).at(0, 0, 0, 0),
        2,
    )?;

    assert_eq!(engine.price_bundle(&mut draft, &catalog, "B1")?, usd(36_088));
    assert!(matches!(
        engine.add_apartment(&mut draft, &catalog, "U12swan"),
        Err(PricingError::MixedOrder)
    ));

    let bundle = draft.bundle().ok_or("bundle line missing")?;

    // items are scaled by the two nights
    assert_eq!(bundle.apartment.nights, 2);
    assert_eq!(
        bundle
            .items
            .iter()
            .find(|line| line.item_id == "SI2")
            .map(|line| line.quantity),
        Some(4)
    );

    let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    assert_eq!(order.total(), usd(36_088));
    assert_eq!(order.product_quantities(), vec![("B1", 1)]);

    Ok(())
}

#[test]
fn items_alone_cannot_be_confirmed() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    let guest = ledger.find("Emma Wilson").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 2).at(0, 0, 0, 0),
        1,
    )?;

    engine.add_item(&mut draft, &catalog, "SI3", 2)?;
    engine.add_item(&mut draft, &catalog, "SI3", 1)?;

    assert_eq!(draft.items().len(), 1);
    assert_eq!(draft.items().first().map(|line| line.total), Some(usd(3_000)));

    let result = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at());

    assert!(matches!(result, Err(PricingError::EmptyOrder)));
    assert!(store.is_empty());
    assert_eq!(engine.sequence(), 0);

    Ok(())
}

#[test]
fn removing_a_booked_product_is_blocked() -> TestResult {
    let Desk {
        mut catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    let guest = ledger.find("Liam Garcia").ok_or("guest missing")?.clone();

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 2).at(0, 0, 0, 0),
        1,
    )?;

    engine.add_apartment(&mut draft, &catalog, "U23goose")?;
    engine.add_item(&mut draft, &catalog, "SI3", 1)?;
    engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    // SI3 is in no bundle, but one order
    assert_eq!(
        catalog.remove("SI3", &store).err(),
        Some(CatalogError::ReferentialIntegrity {
            id: "SI3".to_string(),
            bundles: 0,
            orders: 1,
        })
    );

    // SI7 is unreferenced
    assert!(catalog.remove("SI7", &store).is_ok());
    assert!(catalog.get("SI7").is_none());

    Ok(())
}

#[test]
fn rate_changes_apply_to_later_orders() -> TestResult {
    let Desk {
        catalog,
        mut ledger,
        mut engine,
        mut store,
    } = desk()?;

    let guest = ledger.find("Olivia Taylor").ok_or("guest missing")?.clone();

    ledger.set_reward_rate(guest.id(), Decimal::ONE_HUNDRED)?;

    assert!(matches!(
        ledger.set_redeem_rate(guest.id(), Decimal::ZERO),
        Err(GuestError::InvalidRedeemRate(_))
    ));

    let mut draft = engine.open_order(
        &catalog,
        &guest,
        date(2024, 10, 1).at(0, 0, 0, 0),
        date(2024, 10, 3).at(0, 0, 0, 0),
        2,
    )?;

    engine.add_apartment(&mut draft, &catalog, "U63duck")?;

    let order = engine.finalize(&mut draft, &mut ledger, &mut store, booked_at())?;

    // 134.50 * 2 at one point per dollar
    assert_eq!(order.reward_points(), 269);

    Ok(())
}
