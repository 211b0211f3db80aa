mod cli;
mod columns;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod reconciler;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands, Overrides};

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("warn,bankrec=info"),
        2 => EnvFilter::new("warn,bankrec=debug"),
        _ => EnvFilter::new("warn,bankrec=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Reconcile {
            ledger,
            bank,
            tolerance,
            ignore_dates,
            permissive_header,
            scan_rows,
            export,
            csv_dir,
            json,
        } => cli::reconcile::run(
            &ledger,
            &bank,
            &Overrides {
                tolerance,
                ignore_dates,
                permissive_header,
                scan_rows,
            },
            &cli::reconcile::Output {
                export,
                csv_dir,
                json,
            },
        ),
        Commands::Inspect {
            file,
            kind,
            permissive_header,
            scan_rows,
        } => cli::inspect::run(
            &file,
            kind,
            &Overrides {
                permissive_header,
                scan_rows,
                ..Overrides::default()
            },
        ),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set {
                tolerance,
                ignore_dates,
                scan_rows,
                permissive_header,
                export_dir,
            } => cli::config::set(tolerance, ignore_dates, scan_rows, permissive_header, export_dir),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
