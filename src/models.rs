use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::importer::{parse_amount, parse_date_dmy};

/// A single untyped cell as read from the source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            Value::Empty
        } else {
            Value::Text(s.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the cell; `None` when the cell holds no number.
    pub fn amount(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_amount(s),
            _ => None,
        }
    }

    /// Day-first date reading of the cell; `None` when unparseable.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => parse_date_dmy(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => f.write_str("csv"),
            SourceFormat::Spreadsheet => f.write_str("spreadsheet"),
        }
    }
}

/// Text encodings tried for CSV input, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "iso-8859-1")]
    Latin1,
    #[serde(rename = "windows-1252")]
    Windows1252,
}

impl TextEncoding {
    pub const PRIORITY: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "iso-8859-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A header-resolved table. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub source_format: SourceFormat,
    pub text_encoding: Option<TextEncoding>,
    /// 0-based index of the header line within the source grid.
    pub header_row: usize,
    /// SHA-256 of the raw bytes the table was read from.
    pub checksum: String,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Ledger,
    Bank,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Ledger => f.write_str("Ledger"),
            TableKind::Bank => f.write_str("Bank"),
        }
    }
}

/// Money movement as named on each side: the ledger says Receipt/Payment,
/// the bank says Deposit/Withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Receipt,
    Payment,
    Deposit,
    Withdrawal,
}

impl Direction {
    pub fn new(kind: TableKind, inbound: bool) -> Self {
        match (kind, inbound) {
            (TableKind::Ledger, true) => Direction::Receipt,
            (TableKind::Ledger, false) => Direction::Payment,
            (TableKind::Bank, true) => Direction::Deposit,
            (TableKind::Bank, false) => Direction::Withdrawal,
        }
    }

    pub fn is_inbound(&self) -> bool {
        matches!(self, Direction::Receipt | Direction::Deposit)
    }

    /// The same movement named from the bank's side.
    pub fn bank_side(&self) -> Direction {
        Direction::new(TableKind::Bank, self.is_inbound())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Receipt => "Receipt",
            Direction::Payment => "Payment",
            Direction::Deposit => "Deposit",
            Direction::Withdrawal => "Withdrawal",
        };
        f.write_str(s)
    }
}

/// One normalized source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Index of the row within its origin table.
    pub row_id: usize,
    pub raw_date: Value,
    pub parsed_date: Option<NaiveDate>,
    pub signed_amount: Option<f64>,
    pub magnitude: f64,
    pub direction: Direction,
    pub narration: String,
    pub matched: bool,
}

impl Transaction {
    /// Zero-magnitude rows (opening balances, subtotals) take no part in matching.
    pub fn is_inert(&self) -> bool {
        self.magnitude == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub amount: f64,
    pub direction: Direction,
    pub ledger_row: usize,
    pub bank_row: usize,
    pub ledger_date: Option<NaiveDate>,
    pub bank_date: Option<NaiveDate>,
    pub ledger_narration: String,
    pub bank_narration: String,
    /// Absolute day distance, when both sides carry a date.
    pub day_gap: Option<i64>,
}
