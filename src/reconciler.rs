use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::columns::{resolve_columns, ColumnRoles};
use crate::error::{ReconError, Result};
use crate::importer::{import_file, IngestOptions};
use crate::models::{Direction, MatchRecord, Table, TableKind, Transaction, Value};

/// Magnitudes within this many currency units are the same amount.
pub const AMOUNT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_DATE_TOLERANCE_DAYS: u32 = 5;
pub const MAX_DATE_TOLERANCE_DAYS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// `None` matches on amount and direction only.
    pub date_tolerance_days: Option<u32>,
}

impl MatchOptions {
    pub fn new(date_tolerance_days: Option<u32>) -> Result<Self> {
        match date_tolerance_days {
            Some(days) if days > MAX_DATE_TOLERANCE_DAYS => Err(ReconError::InvalidTolerance(days)),
            _ => Ok(Self {
                date_tolerance_days,
            }),
        }
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            date_tolerance_days: Some(DEFAULT_DATE_TOLERANCE_DAYS),
        }
    }
}

/// One side of a reconciliation: the ingested table, its column roles and
/// the transactions derived from its rows.
#[derive(Debug, Clone)]
pub struct Book {
    pub kind: TableKind,
    pub file: String,
    pub table: Table,
    pub roles: ColumnRoles,
    pub transactions: Vec<Transaction>,
}

impl Book {
    pub fn new(kind: TableKind, file: &str, table: Table) -> Result<Self> {
        let roles = resolve_columns(&table.columns, kind).map_err(|e| e.in_file(kind, file))?;
        info!(
            %kind,
            date = roles.date.map(|i| table.columns[i].as_str()),
            inbound = %table.columns[roles.inbound],
            outbound = %table.columns[roles.outbound],
            narration = roles.narration.map(|i| table.columns[i].as_str()),
            "columns resolved"
        );
        let transactions = derive_transactions(&table, &roles, kind);
        Ok(Self {
            kind,
            file: file.to_string(),
            table,
            roles,
            transactions,
        })
    }

    /// Ingest `path` and resolve its columns; failures name the file.
    pub fn load(path: &Path, kind: TableKind, opts: &IngestOptions) -> Result<Self> {
        let file = path.display().to_string();
        let table = import_file(path, opts).map_err(|e| e.in_file(kind, &file))?;
        Self::new(kind, &file, table)
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(|t| !t.matched && !t.is_inert())
    }

    pub fn inert_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_inert()).count()
    }
}

fn cell_magnitude(cell: &Value, row_id: usize, column: &str) -> f64 {
    match cell.amount() {
        Some(v) => v.abs(),
        None => {
            if !cell.is_blank() {
                debug!(row_id, column, value = %cell, "unparseable amount, treated as zero");
            }
            0.0
        }
    }
}

fn derive_transaction(table: &Table, row_id: usize, roles: &ColumnRoles, kind: TableKind) -> Transaction {
    let inbound_cell = table.cell(row_id, roles.inbound);
    let outbound_cell = table.cell(row_id, roles.outbound);
    let inbound = cell_magnitude(inbound_cell, row_id, &table.columns[roles.inbound]);
    let outbound = cell_magnitude(outbound_cell, row_id, &table.columns[roles.outbound]);

    // Ties go to the inbound column.
    let (is_inbound, magnitude) = if inbound != 0.0 {
        (true, inbound)
    } else if outbound != 0.0 {
        (false, outbound)
    } else {
        (true, 0.0)
    };
    let signed_amount = match (inbound_cell.amount(), outbound_cell.amount()) {
        (None, None) => None,
        _ => Some(inbound - outbound),
    };

    let raw_date = roles
        .date
        .map(|c| table.cell(row_id, c).clone())
        .unwrap_or(Value::Empty);
    let parsed_date = raw_date.date();
    if parsed_date.is_none() && !raw_date.is_blank() {
        debug!(row_id, value = %raw_date, "unparseable date, treated as absent");
    }

    Transaction {
        row_id,
        raw_date,
        parsed_date,
        signed_amount,
        magnitude,
        direction: Direction::new(kind, is_inbound),
        narration: roles
            .narration
            .map(|c| table.cell(row_id, c).to_string())
            .unwrap_or_default(),
        matched: false,
    }
}

pub fn derive_transactions(table: &Table, roles: &ColumnRoles, kind: TableKind) -> Vec<Transaction> {
    (0..table.len())
        .map(|row_id| derive_transaction(table, row_id, roles, kind))
        .collect()
}

fn same_amount(a: f64, b: f64) -> bool {
    // 100.00 vs 100.01 must sit inside the bound after float rounding.
    (a - b).abs() <= AMOUNT_TOLERANCE + 1e-9
}

/// Greedily pair ledger transactions with bank transactions, in ledger row
/// order. Each bank transaction is consumed at most once.
pub fn match_transactions(
    ledger: &mut [Transaction],
    bank: &mut [Transaction],
    opts: &MatchOptions,
) -> Vec<MatchRecord> {
    let mut matches = Vec::new();

    for li in 0..ledger.len() {
        let (magnitude, target, ledger_date) = {
            let l = &ledger[li];
            if l.is_inert() || l.matched {
                continue;
            }
            (l.magnitude, l.direction.bank_side(), l.parsed_date)
        };
        let window = opts.date_tolerance_days.zip(ledger_date);

        // (bank index, day distance when the window applies)
        let mut candidates: Vec<(usize, Option<i64>)> = bank
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                !b.is_inert() && !b.matched && b.direction == target && same_amount(b.magnitude, magnitude)
            })
            .filter_map(|(bi, b)| match (window, b.parsed_date) {
                (Some((days, ld)), Some(bd)) => {
                    let gap = (bd - ld).num_days().abs();
                    (gap <= i64::from(days)).then_some((bi, Some(gap)))
                }
                _ => Some((bi, None)),
            })
            .collect();
        if window.is_some() {
            // Closest date first; undated candidates after dated ones, in row order.
            candidates.sort_by_key(|(_, gap)| gap.unwrap_or(i64::MAX));
        }

        let Some(&(bi, _)) = candidates.first() else {
            trace!(row_id = ledger[li].row_id, magnitude, "no bank candidate");
            continue;
        };

        ledger[li].matched = true;
        bank[bi].matched = true;
        let (l, b) = (&ledger[li], &bank[bi]);
        let day_gap = match (l.parsed_date, b.parsed_date) {
            (Some(ld), Some(bd)) => Some((bd - ld).num_days().abs()),
            _ => None,
        };
        debug!(
            ledger_row = l.row_id,
            bank_row = b.row_id,
            amount = l.magnitude,
            ?day_gap,
            "matched"
        );
        matches.push(MatchRecord {
            amount: l.magnitude,
            direction: l.direction,
            ledger_row: l.row_id,
            bank_row: b.row_id,
            ledger_date: l.parsed_date,
            bank_date: b.parsed_date,
            ledger_narration: l.narration.clone(),
            bank_narration: b.narration.clone(),
            day_gap,
        });
    }

    matches
}

pub struct ReconcileReport {
    pub ledger: Book,
    pub bank: Book,
    pub matches: Vec<MatchRecord>,
    pub date_tolerance_days: Option<u32>,
}

impl ReconcileReport {
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    /// Ledger entries the bank has not seen (e.g. unpresented cheques).
    pub fn missing_in_bank(&self) -> Vec<&Transaction> {
        self.ledger.unmatched().collect()
    }

    /// Bank entries not yet recorded in the books.
    pub fn missing_in_books(&self) -> Vec<&Transaction> {
        self.bank.unmatched().collect()
    }

    pub fn summary(&self) -> ReportSummary<'_> {
        ReportSummary {
            date_tolerance_days: self.date_tolerance_days,
            matched_count: self.matched_count(),
            ledger_rows: self.ledger.transactions.len(),
            bank_rows: self.bank.transactions.len(),
            ledger_inert: self.ledger.inert_count(),
            bank_inert: self.bank.inert_count(),
            matched: &self.matches,
            missing_in_bank: self.missing_in_bank(),
            missing_in_books: self.missing_in_books(),
        }
    }
}

/// Serializable view of a finished reconciliation.
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub date_tolerance_days: Option<u32>,
    pub matched_count: usize,
    pub ledger_rows: usize,
    pub bank_rows: usize,
    pub ledger_inert: usize,
    pub bank_inert: usize,
    pub matched: &'a [MatchRecord],
    pub missing_in_bank: Vec<&'a Transaction>,
    pub missing_in_books: Vec<&'a Transaction>,
}

pub fn reconcile(mut ledger: Book, mut bank: Book, opts: &MatchOptions) -> ReconcileReport {
    let matches = match_transactions(&mut ledger.transactions, &mut bank.transactions, opts);
    let report = ReconcileReport {
        ledger,
        bank,
        matches,
        date_tolerance_days: opts.date_tolerance_days,
    };
    info!(
        matched = report.matched_count(),
        missing_in_bank = report.ledger.unmatched().count(),
        missing_in_books = report.bank.unmatched().count(),
        "reconciliation complete"
    );
    report
}
