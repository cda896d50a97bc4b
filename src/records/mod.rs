//! Records
//!
//! Line-oriented persistence for the catalog, guest ledger and order store.
//! Loading skips malformed lines and reports them; saving keeps a `.bak`
//! copy of the previous file and restores it if the write fails.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use rusty_money::Money;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    catalog::Catalog,
    engine::{PricingEngine, PricingError},
    guests::{GuestError, GuestLedger},
    orders::{Order, OrderStore},
    products::{Product, ProductKind},
};

pub mod codec;

pub use codec::RecordError;

/// Catalog file name.
pub const PRODUCTS_FILE: &str = "products.csv";

/// Guest file name.
pub const GUESTS_FILE: &str = "guests.csv";

/// Order file name.
pub const ORDERS_FILE: &str = "orders.csv";

/// Saved reports file name.
pub const STATS_FILE: &str = "stats.txt";

const PRODUCTS_HEADER: &str = "# ID, Name, RatePerNight|Price|ApartmentID, Capacity|Description|Components..., [Price]";
const GUESTS_HEADER: &str = "# FirstName, LastName, DateOfBirth, RewardPoints, RewardRate, RedeemRate";
const ORDERS_HEADER: &str = "# BookingDate, GuestID, CheckIn, CheckOut, Nights, PartySize, <Quantity> x <ProductID> @ <UnitPrice>..., TotalCost, RewardPoints";

/// Errors raised reading or writing record files.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// A file required at start-up does not exist.
    #[error("required file {} not found", .0.display())]
    MissingFile(PathBuf),

    /// A file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A file could not be written. The previous contents were restored
    /// from the backup where possible.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
}

/// A record line that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based line number
    pub line: usize,

    /// Why it was skipped
    pub reason: String,
}

/// Outcome of loading one record file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records loaded
    pub loaded: usize,

    /// Records skipped
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    fn skip(&mut self, source: &str, line: usize, reason: impl ToString) {
        let reason = reason.to_string();

        warn!(source, line, %reason, "skipped record");

        self.skipped.push(SkippedRecord { line, reason });
    }
}

/// Numbered record lines, without blanks and `#` comments.
fn record_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Load catalog records into `catalog`. Bundles are added after every
/// apartment and item so their components resolve regardless of line order.
pub fn load_catalog_from(contents: &str, catalog: &mut Catalog<'_>) -> LoadReport {
    let mut report = LoadReport::default();
    let mut bundles = Vec::new();

    for (line_no, line) in record_lines(contents) {
        match codec::parse_product(line, catalog.currency()) {
            Ok(product @ Product::Bundle(_)) => bundles.push((line_no, product)),
            Ok(product) => match catalog.add_or_update(product) {
                Ok(_) => report.loaded += 1,
                Err(err) => report.skip(PRODUCTS_FILE, line_no, err),
            },
            Err(err) => report.skip(PRODUCTS_FILE, line_no, err),
        }
    }

    for (line_no, bundle) in bundles {
        match catalog.add_or_update(bundle) {
            Ok(_) => report.loaded += 1,
            Err(err) => report.skip(PRODUCTS_FILE, line_no, err),
        }
    }

    report
}

/// Load guest records into `ledger`.
pub fn load_guests_from(contents: &str, ledger: &mut GuestLedger) -> LoadReport {
    let mut report = LoadReport::default();

    for (line_no, line) in record_lines(contents) {
        let loaded = codec::parse_guest(line)
            .map_err(|err| err.to_string())
            .and_then(|guest| ledger.insert(guest).map(|_| ()).map_err(|err| err.to_string()));

        match loaded {
            Ok(()) => report.loaded += 1,
            Err(reason) => report.skip(GUESTS_FILE, line_no, reason),
        }
    }

    report
}

/// Load order records into `store`, rebuilding each at the prices it was
/// booked at and issuing fresh order ids from `engine`.
pub fn load_orders_from<'a>(
    contents: &str,
    catalog: &Catalog<'a>,
    ledger: &GuestLedger,
    engine: &mut PricingEngine,
    store: &mut OrderStore<'a>,
) -> LoadReport {
    let mut report = LoadReport::default();

    for (line_no, line) in record_lines(contents) {
        let loaded = codec::parse_order(line)
            .map_err(|err| err.to_string())
            .and_then(|record| {
                restore_order(&record, catalog, ledger, engine).map_err(|err| err.to_string())
            })
            .and_then(|order| store.save(order).map_err(|err| err.to_string()));

        match loaded {
            Ok(()) => report.loaded += 1,
            Err(reason) => report.skip(ORDERS_FILE, line_no, reason),
        }
    }

    report
}

/// Why a persisted order could not be rebuilt.
#[derive(Debug, Error)]
enum RestoreError {
    #[error("recorded {recorded} nights but the stay spans {stay}")]
    NightsMismatch { recorded: u32, stay: u32 },

    #[error("unknown product {0}")]
    UnknownProduct(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

fn restore_order<'a>(
    record: &codec::OrderRecord,
    catalog: &Catalog<'a>,
    ledger: &GuestLedger,
    engine: &mut PricingEngine,
) -> Result<Order<'a>, RestoreError> {
    let guest = ledger
        .get(&record.guest_id)
        .ok_or_else(|| PricingError::Guest(GuestError::NotFound(record.guest_id.clone())))?;

    let mut draft = engine.open_order(
        catalog,
        guest,
        record.check_in,
        record.check_out,
        record.party_size,
    )?;

    if draft.nights() != record.nights {
        return Err(RestoreError::NightsMismatch {
            recorded: record.nights,
            stay: draft.nights(),
        });
    }

    for line in &record.lines {
        let product_id = &line.product_id;

        match ProductKind::from_id(product_id) {
            Some(ProductKind::Apartment) if line.quantity == draft.nights() => {
                engine.add_apartment(&mut draft, catalog, product_id)?;
            }
            Some(ProductKind::Item) => {
                engine.add_item(&mut draft, catalog, product_id, line.quantity)?;
            }
            Some(ProductKind::Bundle) => {
                engine.price_bundle(&mut draft, catalog, product_id)?;
            }
            Some(ProductKind::Apartment) => {
                return Err(RestoreError::NightsMismatch {
                    recorded: line.quantity,
                    stay: draft.nights(),
                });
            }
            None => return Err(RestoreError::UnknownProduct(product_id.clone())),
        }

        if let Some(minor) = line.unit_price_minor {
            let price = Money::from_minor(minor, catalog.currency());

            draft
                .set_recorded_price(product_id, price)
                .map_err(PricingError::from)?;
        }
    }

    let total = Money::from_minor(record.total_minor, catalog.currency());

    Ok(engine.restore(&draft, record.booked_at, total, record.reward_points)?)
}

/// Record files in a data directory.
#[derive(Debug, Clone)]
pub struct Records {
    dir: PathBuf,
}

impl Records {
    /// Use the record files in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the catalog file.
    pub fn products_path(&self) -> PathBuf {
        self.dir.join(PRODUCTS_FILE)
    }

    /// Path of the guest file.
    pub fn guests_path(&self) -> PathBuf {
        self.dir.join(GUESTS_FILE)
    }

    /// Path of the order file.
    pub fn orders_path(&self) -> PathBuf {
        self.dir.join(ORDERS_FILE)
    }

    /// Path of the saved reports file.
    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    /// Load the catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::MissingFile`] if the file does not exist.
    pub fn load_catalog(&self, catalog: &mut Catalog<'_>) -> Result<LoadReport, RecordsError> {
        let path = self.products_path();
        let contents = read_required(&path)?;
        let report = load_catalog_from(&contents, catalog);

        info!(path = %path.display(), loaded = report.loaded, skipped = report.skipped.len(), "loaded products");

        Ok(report)
    }

    /// Load the guest file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::MissingFile`] if the file does not exist.
    pub fn load_guests(&self, ledger: &mut GuestLedger) -> Result<LoadReport, RecordsError> {
        let path = self.guests_path();
        let contents = read_required(&path)?;
        let report = load_guests_from(&contents, ledger);

        info!(path = %path.display(), loaded = report.loaded, skipped = report.skipped.len(), "loaded guests");

        Ok(report)
    }

    /// Load the order file. A missing file means there is no history yet.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Read`] if the file exists but cannot be read.
    pub fn load_orders<'a>(
        &self,
        catalog: &Catalog<'a>,
        ledger: &GuestLedger,
        engine: &mut PricingEngine,
        store: &mut OrderStore<'a>,
    ) -> Result<LoadReport, RecordsError> {
        let path = self.orders_path();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no order history");

                return Ok(LoadReport::default());
            }
            Err(source) => return Err(RecordsError::Read { path, source }),
        };

        let report = load_orders_from(&contents, catalog, ledger, engine, store);

        info!(path = %path.display(), loaded = report.loaded, skipped = report.skipped.len(), "loaded orders");

        Ok(report)
    }

    /// Write the catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Write`] if the file could not be written.
    pub fn save_catalog(&self, catalog: &Catalog<'_>) -> Result<(), RecordsError> {
        write_with_backup(&self.products_path(), PRODUCTS_HEADER, &catalog.serialize_all())
    }

    /// Write the guest file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Write`] if the file could not be written.
    pub fn save_guests(&self, ledger: &GuestLedger) -> Result<(), RecordsError> {
        write_with_backup(&self.guests_path(), GUESTS_HEADER, &ledger.serialize_all())
    }

    /// Write the order file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Write`] if the file could not be written.
    pub fn save_orders(&self, store: &OrderStore<'_>) -> Result<(), RecordsError> {
        write_with_backup(&self.orders_path(), ORDERS_HEADER, &store.serialize_all())
    }

    /// Append a rendered report to the saved reports file, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Write`] if the file could not be written.
    pub fn append_report(&self, report: &str) -> Result<(), RecordsError> {
        let path = self.stats_path();

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| io::Write::write_all(&mut file, report.as_bytes()))
            .map_err(|source| RecordsError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), bytes = report.len(), "appended report");

        Ok(())
    }
}

fn read_required(path: &Path) -> Result<String, RecordsError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            RecordsError::MissingFile(path.to_path_buf())
        } else {
            RecordsError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// `products.csv` -> `products.csv.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");

    PathBuf::from(name)
}

fn write_with_backup(path: &Path, header: &str, lines: &[String]) -> Result<(), RecordsError> {
    let backup = backup_path(path);

    let backed_up = path.exists()
        && fs::copy(path, &backup)
            .inspect_err(|err| warn!(path = %path.display(), %err, "could not back up records"))
            .is_ok();

    let mut contents = String::from(header);

    for line in lines {
        contents.push('\n');
        contents.push_str(line);
    }

    contents.push('\n');

    if let Err(source) = fs::write(path, contents) {
        warn!(path = %path.display(), %source, "failed to write records");

        if backed_up && let Err(err) = fs::copy(&backup, path) {
            warn!(path = %path.display(), %err, "failed to restore backup");
        }

        return Err(RecordsError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    info!(path = %path.display(), records = lines.len(), "saved records");

    Ok(())
}
