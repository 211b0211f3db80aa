use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ReconError, Result};
use crate::models::{SourceFormat, Table, TextEncoding, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn amount_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:rs\.?|inr|dr\.?|cr\.?)\s*").expect("valid regex"))
}

fn amount_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*(?:dr\.?|cr\.?|inr)$").expect("valid regex"))
}

/// Parse a money cell. Thousands separators, currency marks and Dr/Cr
/// markers are stripped; `(x)` reads as `-x`. Non-numeric input gives `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$', '€', '£', '₹'], "");
    let s = s.trim();
    let s = amount_prefix().replace(s, "");
    let s = amount_suffix().replace(&s, "");
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, s),
    };
    let value: f64 = s.replace(' ', "").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y",
    "%d.%m.%y", "%d-%b-%Y", "%d %b %Y", "%d-%b-%y", "%d %b %y", "%d %B %Y", "%d-%B-%Y",
    "%b %d, %Y", "%B %d, %Y",
];

fn parse_date_exact(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            // "%Y" happily reads "24" as year 24; leave two-digit years to "%y".
            .filter(|d| d.year() >= 100)
    })
}

/// Day-first date parsing. A trailing time component is ignored.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(d) = parse_date_exact(raw) {
        return Some(d);
    }
    if let Some((day, _)) = raw.split_once('T') {
        if let Some(d) = parse_date_exact(day) {
            return Some(d);
        }
    }
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    (1..tokens.len())
        .rev()
        .find_map(|n| parse_date_exact(&tokens[..n].join(" ")))
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

const DATE_KEYWORD: &str = "date";

const HEADER_KEYWORDS: &[&str] = &[
    "narration",
    "debit",
    "credit",
    "withdraw",
    "deposit",
    "vch",
    "particulars",
    "account",
    "type",
];

/// A header row names a date column and, in a different cell, at least one
/// other ledger-ish column.
pub fn is_header_row(row: &[Value]) -> bool {
    let cells: Vec<String> = row.iter().map(|v| v.to_string().to_lowercase()).collect();
    let names_role = |c: &String| HEADER_KEYWORDS.iter().any(|k| c.contains(k));
    cells.iter().enumerate().any(|(i, date_cell)| {
        date_cell.contains(DATE_KEYWORD)
            && cells
                .iter()
                .enumerate()
                .any(|(j, c)| j != i && names_role(c))
    })
}

/// Index of the first qualifying header row in `prefix`, scanning top to bottom.
pub fn find_header_row(prefix: &[Vec<Value>]) -> Option<usize> {
    prefix.iter().position(|row| is_header_row(row))
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// How many leading rows are scanned for the header.
    pub scan_rows: usize,
    /// Treat row 0 as the header when no row qualifies instead of failing.
    pub permissive_header: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            scan_rows: 50,
            permissive_header: false,
        }
    }
}

/// A successfully opened file, ready to be read as a grid of cells.
enum Source<'a> {
    Text { text: String, encoding: TextEncoding },
    Workbook { bytes: &'a [u8] },
}

impl Source<'_> {
    fn format(&self) -> SourceFormat {
        match self {
            Source::Text { .. } => SourceFormat::Csv,
            Source::Workbook { .. } => SourceFormat::Spreadsheet,
        }
    }

    fn encoding(&self) -> Option<TextEncoding> {
        match self {
            Source::Text { encoding, .. } => Some(*encoding),
            Source::Workbook { .. } => None,
        }
    }

    /// Read the grid from the start, skipping fully blank rows. `limit`
    /// bounds the number of rows returned.
    fn read_grid(&self, limit: Option<usize>) -> std::result::Result<Vec<Vec<Value>>, String> {
        let limit = limit.unwrap_or(usize::MAX);
        match self {
            Source::Text { text, .. } => {
                let mut rdr = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(text.as_bytes());
                let mut grid = Vec::new();
                for result in rdr.records() {
                    if grid.len() >= limit {
                        break;
                    }
                    let record = result.map_err(|e| e.to_string())?;
                    let row: Vec<Value> = record.iter().map(Value::text).collect();
                    if row.iter().any(|v| !v.is_blank()) {
                        grid.push(row);
                    }
                }
                Ok(grid)
            }
            Source::Workbook { bytes } => {
                use calamine::Reader;
                let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(*bytes))
                    .map_err(|e| e.to_string())?;
                let range = workbook
                    .worksheet_range_at(0)
                    .ok_or_else(|| "workbook has no sheets".to_string())?
                    .map_err(|e| e.to_string())?;
                Ok(range
                    .rows()
                    .map(|row| row.iter().map(spreadsheet_value).collect::<Vec<_>>())
                    .filter(|row| row.iter().any(|v| !v.is_blank()))
                    .take(limit)
                    .collect())
            }
        }
    }
}

fn spreadsheet_value(cell: &calamine::Data) -> Value {
    use calamine::Data;
    match cell {
        Data::String(s) => Value::text(s),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Value::Date)
            .unwrap_or(Value::Empty),
        Data::DateTimeIso(s) => parse_date_dmy(s)
            .map(Value::Date)
            .unwrap_or_else(|| Value::text(s)),
        Data::Empty | Data::Error(_) => Value::Empty,
        other => Value::text(&other.to_string()),
    }
}

const DOS_EOF: u8 = 0x1a;

fn is_stray_char(c: char) -> bool {
    c == '\u{FFFD}' || (c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c'))
}

/// Decode `bytes` strictly. A trailing DOS end-of-file marker is dropped. Valid
/// UTF-8 is accepted unless it holds NUL bytes. The single-byte code pages map
/// every byte, so their output is rejected when it contains control characters.
fn decode(bytes: &[u8], encoding: TextEncoding) -> std::result::Result<String, String> {
    let bytes = bytes.strip_suffix(&[DOS_EOF]).unwrap_or(bytes);
    let text = match encoding {
        TextEncoding::Utf8 => encoding_rs::UTF_8
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| "invalid byte sequence".to_string())?
            .into_owned(),
        TextEncoding::Latin1 => encoding_rs::mem::decode_latin1(bytes).into_owned(),
        TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| "unmappable byte".to_string())?
            .into_owned(),
    };
    let text = text
        .strip_prefix('\u{feff}')
        .map(str::to_string)
        .unwrap_or(text);
    let binary = match encoding {
        TextEncoding::Utf8 => text.contains('\0'),
        TextEncoding::Latin1 | TextEncoding::Windows1252 => text.chars().any(is_stray_char),
    };
    if binary {
        return Err("control characters in decoded text".to_string());
    }
    Ok(text)
}

fn prefers_text(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt"))
}

#[derive(Debug, Clone, Copy)]
enum Attempt {
    Text(TextEncoding),
    Spreadsheet,
}

fn attempt_order(filename: &str) -> Vec<Attempt> {
    let text = TextEncoding::PRIORITY.into_iter().map(Attempt::Text);
    if prefers_text(filename) {
        text.chain([Attempt::Spreadsheet]).collect()
    } else {
        // Unknown or spreadsheet extension: a mislabeled CSV still gets read.
        [Attempt::Spreadsheet].into_iter().chain(text).collect()
    }
}

/// Try each format/encoding in turn; the first one yielding a grid wins.
/// Returns the source together with its bounded prefix.
fn open_source<'a>(
    bytes: &'a [u8],
    filename: &str,
    scan_rows: usize,
) -> Result<(Source<'a>, Vec<Vec<Value>>)> {
    let mut attempts = Vec::new();
    for attempt in attempt_order(filename) {
        let source = match attempt {
            Attempt::Text(encoding) => match decode(bytes, encoding) {
                Ok(text) => Source::Text { text, encoding },
                Err(e) => {
                    debug!(file = filename, %encoding, "decode rejected: {e}");
                    attempts.push(format!("{encoding}: {e}"));
                    continue;
                }
            },
            Attempt::Spreadsheet => Source::Workbook { bytes },
        };
        match source.read_grid(Some(scan_rows)) {
            Ok(prefix) if prefix.is_empty() => return Err(ReconError::EmptyFile),
            Ok(prefix) => {
                info!(
                    file = filename,
                    format = %source.format(),
                    encoding = source.encoding().map(|e| e.label()),
                    "file opened"
                );
                return Ok((source, prefix));
            }
            Err(e) => {
                let label = match attempt {
                    Attempt::Text(encoding) => encoding.label(),
                    Attempt::Spreadsheet => "spreadsheet",
                };
                debug!(file = filename, attempt = label, "parse rejected: {e}");
                attempts.push(format!("{label}: {e}"));
            }
        }
    }
    Err(ReconError::UnreadableFile { attempts })
}

// ---------------------------------------------------------------------------
// Table construction
// ---------------------------------------------------------------------------

fn column_names(header: &[Value]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let name = v.to_string().trim().to_string();
            let name = if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

fn build_table(
    grid: Vec<Vec<Value>>,
    header_row: usize,
    source: &Source<'_>,
    checksum: String,
) -> Table {
    let mut rows_iter = grid.into_iter().skip(header_row);
    let columns = column_names(&rows_iter.next().unwrap_or_default());
    let width = columns.len();
    let rows = rows_iter
        .map(|mut row| {
            row.resize(width, Value::Empty);
            row
        })
        .collect();
    Table {
        columns,
        rows,
        source_format: source.format(),
        text_encoding: source.encoding(),
        header_row,
        checksum,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Ingest a seekable byte stream. `filename` is only used for its extension.
pub fn ingest<R: Read + Seek>(mut reader: R, filename: &str, opts: &IngestOptions) -> Result<Table> {
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ReconError::EmptyFile);
    }

    let (source, prefix) = open_source(&bytes, filename, opts.scan_rows.max(1))?;

    let header_row = match find_header_row(&prefix) {
        Some(idx) => idx,
        None if opts.permissive_header => {
            tracing::warn!(file = filename, "no header row found, using row 0");
            0
        }
        None => {
            let scanned = prefix
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect();
            return Err(ReconError::HeaderNotFound { scanned });
        }
    };
    info!(file = filename, header_row, "header row detected");

    // Re-read from the start now that the header position is known.
    let grid = source.read_grid(None).map_err(|e| ReconError::UnreadableFile {
        attempts: vec![e],
    })?;
    let table = build_table(grid, header_row, &source, compute_checksum(&bytes));
    debug!(file = filename, columns = ?table.columns, rows = table.len(), "table built");
    Ok(table)
}

pub fn import_file(path: &Path, opts: &IngestOptions) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    ingest(BufReader::new(file), filename, opts)
}
