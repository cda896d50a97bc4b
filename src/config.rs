//! Configuration
//!
//! Command-line arguments with environment fallbacks, read after an optional
//! `.env` file.

use std::path::PathBuf;

use clap::{Args, Parser};
use rusty_money::iso::Currency;

use crate::{cli::Command, engine::DEFAULT_EXTRA_BED_ITEM, pricing::parse_currency};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "PYTHONIA_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

/// Pythonia booking ledger
#[derive(Debug, Parser)]
#[command(name = "pythonia", about = "Pythonia serviced apartment bookings", version, long_about = None)]
pub struct Config {
    /// Directory holding products.csv, guests.csv and orders.csv
    #[arg(short, long, env = "PYTHONIA_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Ledger currency (USD, AUD, GBP, EUR)
    #[arg(
        long,
        env = "PYTHONIA_CURRENCY",
        default_value = "USD",
        value_parser = currency_parser,
        global = true
    )]
    pub currency: &'static Currency,

    /// Supplementary item added when a party needs extra beds
    #[arg(
        long,
        env = "PYTHONIA_EXTRA_BED_ITEM",
        default_value = DEFAULT_EXTRA_BED_ITEM,
        global = true
    )]
    pub extra_bed_item: String,

    /// Rows shown in each statistics table
    #[arg(long, env = "PYTHONIA_TOP_N", default_value_t = 3, global = true)]
    pub top_n: usize,

    /// Logging settings
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

fn currency_parser(code: &str) -> Result<&'static Currency, String> {
    parse_currency(code).ok_or_else(|| format!("unsupported currency {code:?}"))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults_apply_without_flags() -> TestResult {
        let config = Config::try_parse_from(["pythonia", "products"])?;

        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.currency, USD);
        assert_eq!(config.extra_bed_item, "SI6");
        assert_eq!(config.top_n, 3);
        assert_eq!(config.logging.log_format, LogFormat::Compact);
        assert!(matches!(config.command, Command::Products));

        Ok(())
    }

    #[test]
    fn global_flags_follow_the_command() -> TestResult {
        let config = Config::try_parse_from([
            "pythonia",
            "stats",
            "--currency",
            "eur",
            "--top-n",
            "5",
            "--log-format",
            "json",
        ])?;

        assert_eq!(config.currency, EUR);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(Config::try_parse_from(["pythonia", "--currency", "XYZ", "products"]).is_err());
    }
}
