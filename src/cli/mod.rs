pub mod config;
pub mod inspect;
pub mod reconcile;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::TableKind;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "bankrec", about = "Reconcile a bookkeeping ledger against a bank statement.")]
pub struct Cli {
    /// Log more detail to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match ledger entries against bank statement entries.
    Reconcile {
        /// Ledger / books export (CSV or XLSX)
        ledger: PathBuf,
        /// Bank statement (CSV or XLSX)
        bank: PathBuf,
        /// Match window in days between ledger and bank dates (0-60)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=60))]
        tolerance: Option<u32>,
        /// Match on amount and direction only, ignoring dates
        #[arg(long = "ignore-dates", conflicts_with = "tolerance")]
        ignore_dates: bool,
        /// Use the first row as header when no header row is recognised
        #[arg(long = "permissive-header")]
        permissive_header: bool,
        /// Number of leading rows searched for the header
        #[arg(long = "scan-rows")]
        scan_rows: Option<usize>,
        /// Write Matched / Missing_in_Bank / Missing_in_Books sheets to an .xlsx
        /// file (default: <export_dir>/reconciliation-YYYY-MM-DD.xlsx)
        #[arg(long, num_args = 0..=1, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
        /// Write the three result sets as CSV files into this directory
        #[arg(long = "csv-dir")]
        csv_dir: Option<PathBuf>,
        /// Print the full report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Show how a file is read: format, encoding, header row and column roles.
    Inspect {
        /// CSV or XLSX file
        file: PathBuf,
        /// Which vocabulary to resolve amount columns with
        #[arg(long, value_enum, default_value = "bank")]
        kind: TableKind,
        #[arg(long = "permissive-header")]
        permissive_header: bool,
        #[arg(long = "scan-rows")]
        scan_rows: Option<usize>,
    },
    /// View or change saved defaults.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings.
    Show,
    /// Update saved settings.
    Set {
        /// Default match window in days (0-60)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=60))]
        tolerance: Option<u32>,
        /// Disable the date window by default
        #[arg(long = "ignore-dates", conflicts_with = "tolerance")]
        ignore_dates: bool,
        /// Number of leading rows searched for the header
        #[arg(long = "scan-rows")]
        scan_rows: Option<usize>,
        /// Fall back to the first row when no header is recognised
        #[arg(long = "permissive-header")]
        permissive_header: Option<bool>,
        /// Default directory for exports
        #[arg(long = "export-dir")]
        export_dir: Option<String>,
    },
}

/// Per-run settings overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub tolerance: Option<u32>,
    pub ignore_dates: bool,
    pub permissive_header: bool,
    pub scan_rows: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if self.ignore_dates {
            settings.date_tolerance_days = None;
        } else if let Some(days) = self.tolerance {
            settings.date_tolerance_days = Some(days);
        }
        if self.permissive_header {
            settings.permissive_header = true;
        }
        if let Some(rows) = self.scan_rows {
            settings.header_scan_rows = rows;
        }
        settings
    }
}
