use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Overrides;
use crate::export;
use crate::fmt::{amount, date};
use crate::models::{Direction, TableKind, Transaction};
use crate::reconciler::{reconcile, Book, ReconcileReport};
use crate::settings::{load_settings, shellexpand_path};

/// Where results go besides the terminal.
#[derive(Debug, Default)]
pub struct Output {
    /// `Some(None)` writes to the default export path.
    pub export: Option<Option<PathBuf>>,
    pub csv_dir: Option<PathBuf>,
    pub json: bool,
}

fn default_export_path(export_dir: &str) -> PathBuf {
    let day = chrono::Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from(shellexpand_path(export_dir)).join(format!("reconciliation-{day}.xlsx"))
}

pub fn run(ledger: &Path, bank: &Path, overrides: &Overrides, output: &Output) -> Result<()> {
    let settings = overrides.apply(load_settings());
    let match_opts = settings.match_options()?;
    let ingest_opts = settings.ingest_options();

    // Load both files before failing so every bad upload is reported at once.
    let (ledger, bank) = match (
        Book::load(ledger, TableKind::Ledger, &ingest_opts),
        Book::load(bank, TableKind::Bank, &ingest_opts),
    ) {
        (Ok(l), Ok(b)) => (l, b),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e.into()),
        (Err(le), Err(be)) => bail!("{le}\n{be}"),
    };

    let report = reconcile(ledger, bank, &match_opts);

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print_report(&report);
    }

    if let Some(target) = &output.export {
        let path = target
            .clone()
            .unwrap_or_else(|| default_export_path(&settings.export_dir));
        export::write_workbook(&report, &path)
            .map_err(|e| anyhow!("writing {}: {e}", path.display()))?;
        if !output.json {
            println!("Wrote {}", path.display());
        }
    }
    if let Some(dir) = &output.csv_dir {
        let written = export::write_csv_dir(&report, dir)
            .map_err(|e| anyhow!("writing CSV results to {}: {e}", dir.display()))?;
        if !output.json {
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

fn colored_amount(value: f64, direction: Direction) -> String {
    if direction.is_inbound() {
        amount(value).green().to_string()
    } else {
        amount(value).red().to_string()
    }
}

fn describe(book: &Book) -> String {
    let t = &book.table;
    let format = match t.text_encoding {
        Some(enc) => format!("{}, {enc}", t.source_format),
        None => t.source_format.to_string(),
    };
    format!(
        "{:<8} {} ({} rows, header at row {}, {format})\n           in: {}  out: {}",
        format!("{}:", book.kind),
        book.file,
        book.transactions.len(),
        t.header_row,
        t.columns[book.roles.inbound],
        t.columns[book.roles.outbound],
    )
}

fn unmatched_table(rows: &[&Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Type", "Amount", "Narration"]);
    for t in rows {
        let shown_date = match t.parsed_date {
            Some(_) => date(t.parsed_date),
            None => t.raw_date.to_string(),
        };
        table.add_row(vec![
            Cell::new(t.row_id + 1),
            Cell::new(shown_date),
            Cell::new(t.direction),
            Cell::new(colored_amount(t.magnitude, t.direction)),
            Cell::new(&t.narration),
        ]);
    }
    table
}

pub fn print_report(report: &ReconcileReport) {
    let missing_in_bank = report.missing_in_bank();
    let missing_in_books = report.missing_in_books();

    println!("{}", "Bank Reconciliation".bold());
    println!("  {}", describe(&report.ledger));
    println!("  {}", describe(&report.bank));
    match report.date_tolerance_days {
        Some(days) => println!("  Window:  \u{00b1}{days} days"),
        None => println!("  Window:  dates ignored"),
    }
    println!();
    println!("  Matched:           {}", report.matched_count().to_string().green());
    let flag = |n: usize| {
        if n == 0 {
            n.to_string().green()
        } else {
            n.to_string().yellow()
        }
    };
    println!("  Missing in bank:   {}", flag(missing_in_bank.len()));
    println!("  Missing in books:  {}", flag(missing_in_books.len()));
    let inert = report.ledger.inert_count() + report.bank.inert_count();
    if inert > 0 {
        println!("  Skipped (no amount): {inert}");
    }

    if !report.matches.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "Amount",
            "Type",
            "Ledger Date",
            "Bank Date",
            "Ledger Narration",
            "Bank Narration",
        ]);
        for m in &report.matches {
            table.add_row(vec![
                Cell::new(colored_amount(m.amount, m.direction)),
                Cell::new(format!("{} / {}", m.direction, m.direction.bank_side())),
                Cell::new(date(m.ledger_date)),
                Cell::new(date(m.bank_date)),
                Cell::new(&m.ledger_narration),
                Cell::new(&m.bank_narration),
            ]);
        }
        println!("\nMatched\n{table}");
    }
    if !missing_in_bank.is_empty() {
        println!("\nMissing in Bank\n{}", unmatched_table(&missing_in_bank));
    }
    if !missing_in_books.is_empty() {
        println!("\nMissing in Books\n{}", unmatched_table(&missing_in_books));
    }
}
