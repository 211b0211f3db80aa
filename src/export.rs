use std::path::{Path, PathBuf};

use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::error::Result;
use crate::models::{Transaction, Value};
use crate::reconciler::{Book, ReconcileReport};

pub const MATCHED_SHEET: &str = "Matched";
pub const MISSING_IN_BANK_SHEET: &str = "Missing_in_Bank";
pub const MISSING_IN_BOOKS_SHEET: &str = "Missing_in_Books";

/// One result set laid out as a header line plus rows.
pub struct Sheet {
    pub name: &'static str,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

fn date_value(d: Option<chrono::NaiveDate>) -> Value {
    d.map(Value::Date).unwrap_or(Value::Empty)
}

fn matched_sheet(report: &ReconcileReport) -> Sheet {
    let header = [
        "Amount",
        "Type",
        "Ledger Date",
        "Bank Date",
        "Ledger Narration",
        "Bank Narration",
        "Day Gap",
    ];
    let rows = report
        .matches
        .iter()
        .map(|m| {
            vec![
                Value::Number(m.amount),
                Value::Text(format!("{} / {}", m.direction, m.direction.bank_side())),
                date_value(m.ledger_date),
                date_value(m.bank_date),
                Value::text(&m.ledger_narration),
                Value::text(&m.bank_narration),
                m.day_gap.map(|g| Value::Number(g as f64)).unwrap_or(Value::Empty),
            ]
        })
        .collect();
    Sheet {
        name: MATCHED_SHEET,
        header: header.iter().map(|s| s.to_string()).collect(),
        rows,
    }
}

/// Unmatched rows keep every source column, followed by the normalized
/// direction and amount.
fn unmatched_sheet(name: &'static str, book: &Book, unmatched: &[&Transaction]) -> Sheet {
    let mut header = book.table.columns.clone();
    header.push("Type".to_string());
    header.push("Amount".to_string());
    let rows = unmatched
        .iter()
        .map(|t| {
            let mut row = book.table.rows[t.row_id].clone();
            row.push(Value::Text(t.direction.to_string()));
            row.push(Value::Number(t.magnitude));
            row
        })
        .collect();
    Sheet { name, header, rows }
}

pub fn result_sheets(report: &ReconcileReport) -> [Sheet; 3] {
    [
        matched_sheet(report),
        unmatched_sheet(MISSING_IN_BANK_SHEET, &report.ledger, &report.missing_in_bank()),
        unmatched_sheet(MISSING_IN_BOOKS_SHEET, &report.bank, &report.missing_in_books()),
    ]
}

/// Write the three result sets as sheets of one workbook.
pub fn write_workbook(report: &ReconcileReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for sheet in result_sheets(report) {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.name)?;
        for (c, name) in sheet.header.iter().enumerate() {
            ws.write_string_with_format(0, c as u16, name, &bold)?;
        }
        for (r, row) in sheet.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                let c = c as u16;
                match value {
                    Value::Empty => {}
                    Value::Number(n) => {
                        ws.write_number(r, c, *n)?;
                    }
                    Value::Text(s) => {
                        ws.write_string(r, c, s)?;
                    }
                    Value::Date(d) => {
                        let day = ExcelDateTime::from_ymd(
                            d.year() as u16,
                            d.month() as u8,
                            d.day() as u8,
                        )?;
                        ws.write_datetime_with_format(r, c, &day, &date_format)?;
                    }
                }
            }
        }
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), "workbook written");
    Ok(())
}

/// Write the three result sets as `<sheet>.csv` files in `dir`.
pub fn write_csv_dir(report: &ReconcileReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for sheet in result_sheets(report) {
        let path = dir.join(format!("{}.csv", sheet.name));
        let mut wtr = csv::Writer::from_path(&path)?;
        wtr.write_record(&sheet.header)?;
        for row in &sheet.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), "csv results written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{ingest, IngestOptions};
    use crate::models::TableKind;
    use crate::reconciler::{reconcile, MatchOptions};
    use calamine::{Data, Reader};
    use std::io::Cursor;

    fn book(kind: TableKind, csv: &str) -> Book {
        let table = ingest(Cursor::new(csv.as_bytes().to_vec()), "x.csv", &IngestOptions::default()).unwrap();
        Book::new(kind, "x.csv", table).unwrap()
    }

    fn sample_report() -> ReconcileReport {
        let ledger = book(
            TableKind::Ledger,
            "Date,Particulars,Debit,Credit\n10/01/2024,ACME,5000,\n11/01/2024,CHQ 17,,800\n",
        );
        let bank = book(
            TableKind::Bank,
            "Date,Narration,Withdrawal Amt.,Deposit Amt.\n12/01/2024,NEFT ACME,,5000\n13/01/2024,BANK CHARGES,35.40,\n",
        );
        reconcile(ledger, bank, &MatchOptions::default())
    }

    #[test]
    fn test_result_sheets_layout() {
        let [matched, in_bank, in_books] = result_sheets(&sample_report());
        assert_eq!(matched.name, "Matched");
        assert_eq!(matched.rows.len(), 1);
        assert_eq!(matched.rows[0][0], Value::Number(5000.0));
        assert_eq!(matched.rows[0][1], Value::Text("Receipt / Deposit".to_string()));
        assert_eq!(matched.rows[0][6], Value::Number(2.0));

        assert_eq!(in_bank.name, "Missing_in_Bank");
        assert_eq!(
            in_bank.header,
            vec!["Date", "Particulars", "Debit", "Credit", "Type", "Amount"]
        );
        assert_eq!(in_bank.rows.len(), 1);
        assert_eq!(in_bank.rows[0][1], Value::Text("CHQ 17".to_string()));
        assert_eq!(in_bank.rows[0][4], Value::Text("Payment".to_string()));

        assert_eq!(in_books.name, "Missing_in_Books");
        assert_eq!(in_books.rows[0][5], Value::Number(35.4));
    }

    #[test]
    fn test_write_workbook_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("recon.xlsx");
        write_workbook(&sample_report(), &path).unwrap();

        let mut wb = calamine::open_workbook_auto(&path).unwrap();
        assert_eq!(
            wb.sheet_names(),
            vec!["Matched", "Missing_in_Bank", "Missing_in_Books"]
        );
        let matched = wb.worksheet_range("Matched").unwrap();
        assert_eq!(matched.get((0, 0)), Some(&Data::String("Amount".to_string())));
        assert_eq!(matched.get((1, 0)), Some(&Data::Float(5000.0)));
        assert_eq!(matched.height(), 2);
        match matched.get((1, 2)) {
            Some(Data::DateTime(day)) => assert_eq!(day.as_f64(), 45301.0),
            other => panic!("expected a date cell, got {other:?}"),
        }
        let books = wb.worksheet_range("Missing_in_Books").unwrap();
        assert_eq!(books.get((1, 1)), Some(&Data::String("BANK CHARGES".to_string())));
    }

    #[test]
    fn test_write_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_csv_dir(&sample_report(), dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        let content = std::fs::read_to_string(dir.path().join("Matched.csv")).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Amount,Type,Ledger Date,Bank Date,Ledger Narration,Bank Narration,Day Gap")
        );
        assert_eq!(
            lines.next(),
            Some("5000,Receipt / Deposit,2024-01-10,2024-01-12,ACME,NEFT ACME,2")
        );
        let content = std::fs::read_to_string(dir.path().join("Missing_in_Bank.csv")).unwrap();
        assert!(content.contains("11/01/2024,CHQ 17,,800,Payment,800"));
    }
}
