//! Command-line shell
//!
//! Non-interactive commands over the record files. Each command loads the
//! records, runs against the core and saves whatever it changed.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::Subcommand;
use jiff::{Zoned, civil::DateTime};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    catalog::Catalog,
    config::Config,
    draft::DraftOrder,
    engine::{PricingEngine, PricingError},
    fixtures::Fixture,
    guests::{Guest, GuestError, GuestLedger},
    orders::{BookingPeriod, Order, OrderStore},
    receipt::{
        Receipt,
        reports::{
            write_bundle_report, write_catalog, write_guests, write_history, write_statistics,
        },
        strip_ansi,
    },
    records::{
        Records,
        codec::{format_date_time, parse_date, parse_date_time},
    },
};

/// Commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a fixture set's catalog and guests into the data directory
    Seed {
        /// Fixture set name
        #[arg(long, default_value = "pythonia")]
        set: String,

        /// Directory holding fixture sets
        #[arg(long, default_value = "fixtures")]
        fixtures_dir: PathBuf,

        /// Overwrite existing records and clear the order history
        #[arg(long)]
        force: bool,
    },

    /// List the catalog
    Products,

    /// List registered guests
    Guests,

    /// Register a guest
    Register {
        /// First name
        first_name: String,

        /// Last name
        last_name: String,

        /// Date of birth (dd/mm/yyyy)
        date_of_birth: String,
    },

    /// Book an apartment with optional supplementary items
    Book {
        #[command(flatten)]
        stay: StayArgs,

        /// Apartment id
        #[arg(long)]
        apartment: String,

        /// Supplementary item as ID or ID:QUANTITY, repeatable
        #[arg(long = "item", value_parser = parse_item_arg)]
        items: Vec<(String, u32)>,
    },

    /// Book a bundle
    BookBundle {
        #[command(flatten)]
        stay: StayArgs,

        /// Bundle id
        #[arg(long)]
        bundle: String,
    },

    /// Show a guest's orders
    History {
        /// Guest id or full name
        guest: String,
    },

    /// Show top guests and products
    Stats,

    /// Show bookings, revenue and guests per bundle
    BundleReport {
        /// First booking date counted (dd/mm/yyyy)
        #[arg(long)]
        from: Option<String>,

        /// Last booking date counted (dd/mm/yyyy)
        #[arg(long)]
        to: Option<String>,

        /// Also append the report to stats.txt in the data directory
        #[arg(long)]
        save: bool,
    },

    /// Change a guest's reward or redeem rate
    Rates {
        /// Guest id or full name
        guest: String,

        /// Percent of spend awarded as points
        #[arg(long)]
        reward_rate: Option<Decimal>,

        /// Cents of discount per redeemed point
        #[arg(long)]
        redeem_rate: Option<Decimal>,
    },

    /// Remove a product no bundle or order refers to
    RemoveProduct {
        /// Product id
        id: String,
    },
}

/// Arguments shared by the booking commands.
#[derive(Debug, clap::Args)]
pub struct StayArgs {
    /// Guest id or full name
    #[arg(long)]
    pub guest: String,

    /// Check-in (dd/mm/yyyy [HH:MM])
    #[arg(long)]
    pub check_in: String,

    /// Check-out (dd/mm/yyyy [HH:MM])
    #[arg(long)]
    pub check_out: String,

    /// Guests staying
    #[arg(long, default_value_t = 1)]
    pub party: u32,

    /// Reward points to redeem, in blocks of 100
    #[arg(long)]
    pub redeem: Option<u64>,

    /// Booking time (dd/mm/yyyy HH:MM), defaults to now
    #[arg(long)]
    pub booked_at: Option<String>,
}

/// `SI2` or `SI2:3`
fn parse_item_arg(s: &str) -> Result<(String, u32), String> {
    match s.split_once(':') {
        None => Ok((s.trim().to_string(), 1)),
        Some((id, quantity)) => quantity
            .trim()
            .parse()
            .map(|quantity| (id.trim().to_string(), quantity))
            .map_err(|err| format!("invalid quantity in {s:?}: {err}")),
    }
}

/// Everything loaded from the record files.
#[derive(Debug)]
pub struct Session {
    /// Record files
    pub records: Records,

    /// Products
    pub catalog: Catalog<'static>,

    /// Guests
    pub ledger: GuestLedger,

    /// Pricing engine, its sequence advanced past every loaded order
    pub engine: PricingEngine,

    /// Confirmed orders
    pub store: OrderStore<'static>,
}

impl Session {
    /// Load the record files named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the products or guests file is missing or unreadable.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let records = Records::new(&config.data_dir);
        let mut catalog = Catalog::new(config.currency);
        let mut ledger = GuestLedger::new();
        let mut engine = PricingEngine::new(config.extra_bed_item.clone());
        let mut store = OrderStore::new();

        records.load_catalog(&mut catalog)?;
        records.load_guests(&mut ledger)?;
        records.load_orders(&catalog, &ledger, &mut engine, &mut store)?;

        Ok(Self {
            records,
            catalog,
            ledger,
            engine,
            store,
        })
    }

    fn guest(&self, id_or_name: &str) -> Result<Guest, GuestError> {
        self.ledger
            .find(id_or_name)
            .cloned()
            .ok_or_else(|| GuestError::NotFound(id_or_name.to_string()))
    }
}

/// Run the configured command, writing its output to `out`.
///
/// # Errors
///
/// Returns an error if the records cannot be loaded or saved, or the core
/// rejects the request.
pub fn run(config: &Config, mut out: impl io::Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Seed {
            set,
            fixtures_dir,
            force,
        } => seed(config, set, fixtures_dir, *force),
        Command::Products => {
            let session = Session::load(config)?;

            Ok(write_catalog(&mut out, &session.catalog)?)
        }
        Command::Guests => {
            let session = Session::load(config)?;

            Ok(write_guests(&mut out, &session.ledger)?)
        }
        Command::Register {
            first_name,
            last_name,
            date_of_birth,
        } => {
            let mut session = Session::load(config)?;
            let date_of_birth = parse_date(date_of_birth)?;
            let guest = session
                .ledger
                .register(first_name, last_name, date_of_birth)?;

            writeln!(out, "Registered {} as {}", guest.full_name(), guest.id())?;

            session.records.save_guests(&session.ledger)?;

            Ok(())
        }
        Command::Book {
            stay,
            apartment,
            items,
        } => {
            let mut session = Session::load(config)?;

            let order = book(&mut session, stay, |engine, draft, catalog| {
                let party_size = draft.party_size();

                engine.add_apartment(draft, catalog, apartment)?;

                let plan = engine.guest_capacity_check(draft, catalog, apartment, party_size)?;

                if plan.total_extra_bed_units > 0 {
                    info!(
                        extra_beds = plan.extra_beds_per_night,
                        units = plan.total_extra_bed_units,
                        "added extra beds"
                    );
                }

                for (item_id, quantity) in items {
                    engine.add_item(draft, catalog, item_id, *quantity)?;
                }

                Ok(())
            })?;

            finish_booking(&session, &order, out)
        }
        Command::BookBundle { stay, bundle } => {
            let mut session = Session::load(config)?;

            let order = book(&mut session, stay, |engine, draft, catalog| {
                engine.price_bundle(draft, catalog, bundle)?;

                Ok(())
            })?;

            finish_booking(&session, &order, out)
        }
        Command::History { guest } => {
            let session = Session::load(config)?;
            let guest = session.guest(guest)?;
            let orders = session.store.find_by_guest(guest.id());

            Ok(write_history(&mut out, &guest, &orders)?)
        }
        Command::Stats => {
            let session = Session::load(config)?;
            let statistics = session.store.aggregate_statistics(config.top_n)?;

            Ok(write_statistics(
                &mut out,
                &statistics,
                &session.catalog,
                &session.ledger,
            )?)
        }
        Command::BundleReport { from, to, save } => {
            let session = Session::load(config)?;
            let from = from.as_deref().map(parse_date).transpose()?;
            let to = to.as_deref().map(parse_date).transpose()?;
            let report = session
                .store
                .bundle_statistics(&session.catalog, BookingPeriod::new(from, to)?)?;

            let mut rendered = Vec::new();
            write_bundle_report(&mut rendered, &report)?;
            out.write_all(&rendered)?;

            if *save {
                let text = strip_ansi(&String::from_utf8_lossy(&rendered));

                session.records.append_report(&format!(
                    "\nBundle report generated {}\n{text}",
                    format_date_time(now())
                ))?;

                writeln!(out, "Saved to {}", session.records.stats_path().display())?;
            }

            Ok(())
        }
        Command::Rates {
            guest,
            reward_rate,
            redeem_rate,
        } => {
            let mut session = Session::load(config)?;
            let guest = session.guest(guest)?;

            if reward_rate.is_none() && redeem_rate.is_none() {
                bail!("nothing to change: pass --reward-rate and/or --redeem-rate");
            }

            if let Some(rate) = reward_rate {
                session.ledger.set_reward_rate(guest.id(), *rate)?;
            }

            if let Some(rate) = redeem_rate {
                session.ledger.set_redeem_rate(guest.id(), *rate)?;
            }

            writeln!(out, "Updated rates for {}", guest.id())?;

            session.records.save_guests(&session.ledger)?;

            Ok(())
        }
        Command::RemoveProduct { id } => {
            let mut session = Session::load(config)?;
            let removed = session.catalog.remove(id, &session.store)?;

            writeln!(out, "Removed {removed}")?;

            session.records.save_catalog(&session.catalog)?;

            Ok(())
        }
    }
}

fn seed(config: &Config, set: &str, fixtures_dir: &Path, force: bool) -> anyhow::Result<()> {
    let records = Records::new(&config.data_dir);

    if !force && (records.products_path().exists() || records.guests_path().exists()) {
        bail!(
            "{} already holds records; pass --force to overwrite them",
            config.data_dir.display()
        );
    }

    let mut fixture = Fixture::with_base_path(fixtures_dir);
    fixture
        .load_set(set)
        .with_context(|| format!("loading fixture set {set}"))?;

    let (catalog, ledger) = fixture.into_parts()?;

    if catalog.currency() != config.currency {
        warn!(
            fixture = catalog.currency().iso_alpha_code,
            configured = config.currency.iso_alpha_code,
            "fixture prices are in a different currency"
        );
    }

    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;

    records.save_catalog(&catalog)?;
    records.save_guests(&ledger)?;
    records.save_orders(&OrderStore::new())?;

    Ok(())
}

/// Open a draft, add lines, redeem and confirm. Points redeemed on a draft
/// that fails to confirm are refunded.
fn book(
    session: &mut Session,
    stay: &StayArgs,
    add_lines: impl FnOnce(
        &mut PricingEngine,
        &mut DraftOrder<'static>,
        &Catalog<'static>,
    ) -> Result<(), PricingError>,
) -> anyhow::Result<Order<'static>> {
    let guest = session.guest(&stay.guest)?;
    let check_in = parse_date_time(&stay.check_in)?;
    let check_out = parse_date_time(&stay.check_out)?;
    let booked_at = match &stay.booked_at {
        Some(booked_at) => parse_date_time(booked_at)?,
        None => now(),
    };

    let Session {
        catalog,
        ledger,
        engine,
        store,
        ..
    } = session;

    let mut draft = engine.open_order(catalog, &guest, check_in, check_out, stay.party)?;

    let confirmed = add_lines(engine, &mut draft, catalog)
        .and_then(|()| match stay.redeem {
            Some(points) => engine
                .apply_redemption(&mut draft, ledger, points)
                .map(|_discount| ()),
            None => Ok(()),
        })
        .and_then(|()| engine.finalize(&mut draft, ledger, store, booked_at));

    match confirmed {
        Ok(order) => Ok(order),
        Err(err) => {
            warn!(kind = ?err.kind(), %err, "booking rejected");

            engine.cancel(&mut draft, ledger)?;

            Err(err.into())
        }
    }
}

fn finish_booking(
    session: &Session,
    order: &Order<'static>,
    mut out: impl io::Write,
) -> anyhow::Result<()> {
    Receipt::new(order, session.ledger.get(order.guest_id())).write_to(&mut out)?;

    session.records.save_orders(&session.store)?;
    session.records.save_guests(&session.ledger)?;

    Ok(())
}

fn now() -> DateTime {
    Zoned::now().datetime()
}
