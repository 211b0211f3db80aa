use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const BOOKS: &str = "\
ACME TRADERS
Bank Book for January 2024

Date,Particulars,Vch Type,Debit,Credit
01/01/2024,Opening Balance,,,
10/01/2024,ACME CUSTOMER,Receipt,5000.00,
12/01/2024,CHQ 000123 SUPPLIER,Payment,,\"1,200.50\"
15/01/2024,CHQ 000124 RENT,Payment,,800.00
";

const STATEMENT: &str = "\
State Bank Statement
Account Name: ACME TRADERS
Account Number: XXXX1234
Branch: MG Road
Period: 01/01/2024 to 31/01/2024
Generated on 02/02/2024
Date,Narration,Withdrawal Amt.,Deposit Amt.
11/01/2024,NEFT ACME CUSTOMER,,5000.00
13/01/2024,CLG CHQ 000123,1200.50,
31/01/2024,BANK CHARGES,35.40,
";

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn bankrec(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bankrec").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn reconcile_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(dir.path(), "books.csv", BOOKS.as_bytes());
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());

    bankrec(dir.path())
        .arg("reconcile")
        .arg(&books)
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("Matched:           2"))
        .stdout(predicate::str::contains("Missing in bank:   1"))
        .stdout(predicate::str::contains("Missing in books:  1"))
        .stdout(predicate::str::contains("CHQ 000124 RENT"))
        .stdout(predicate::str::contains("BANK CHARGES"));
}

#[test]
fn reconcile_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(dir.path(), "books.csv", BOOKS.as_bytes());
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());

    let output = bankrec(dir.path())
        .args(["reconcile", "--json", "--tolerance", "0"])
        .arg(&books)
        .arg(&bank)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // A zero-day window rejects both one-day-late bank entries.
    assert_eq!(json["matched_count"], 0);
    assert_eq!(json["date_tolerance_days"], 0);
    assert_eq!(json["missing_in_bank"].as_array().unwrap().len(), 3);
    assert_eq!(json["missing_in_books"].as_array().unwrap().len(), 3);
    assert_eq!(json["ledger_inert"], 1);
}

#[test]
fn reconcile_ignore_dates_matches_on_amount() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(dir.path(), "books.csv", BOOKS.as_bytes());
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());

    let output = bankrec(dir.path())
        .args(["reconcile", "--json", "--ignore-dates"])
        .arg(&books)
        .arg(&bank)
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["matched_count"], 2);
    assert!(json["date_tolerance_days"].is_null());
    assert_eq!(json["matched"][0]["direction"], "Receipt");
    assert_eq!(json["matched"][0]["bank_narration"], "NEFT ACME CUSTOMER");
}

#[test]
fn reconcile_exports_workbook_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(dir.path(), "books.csv", BOOKS.as_bytes());
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());
    let xlsx = dir.path().join("out").join("recon.xlsx");
    let csv_dir = dir.path().join("csv");

    bankrec(dir.path())
        .arg("reconcile")
        .arg(&books)
        .arg(&bank)
        .arg("--export")
        .arg(&xlsx)
        .arg("--csv-dir")
        .arg(&csv_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    assert!(xlsx.exists());
    for name in ["Matched.csv", "Missing_in_Bank.csv", "Missing_in_Books.csv"] {
        assert!(csv_dir.join(name).exists(), "{name}");
    }
    let missing = std::fs::read_to_string(csv_dir.join("Missing_in_Bank.csv")).unwrap();
    assert!(missing.starts_with("Date,Particulars,Vch Type,Debit,Credit,Type,Amount"));
    assert!(missing.contains("CHQ 000124 RENT"));
}

#[test]
fn reconcile_names_the_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(
        dir.path(),
        "books.csv",
        b"Date,Description,Amount,Type\n10/01/2024,x,5,Receipt\n",
    );
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());

    bankrec(dir.path())
        .arg("reconcile")
        .arg(&books)
        .arg(&bank)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ledger file"))
        .stderr(predicate::str::contains("Date, Description, Amount, Type"));
}

#[test]
fn reconcile_reports_both_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let books = write(dir.path(), "books.csv", b"nothing to see\nhere\n");
    let bank = write(dir.path(), "statement.csv", &[0x00, 0xff, 0xfe, 0x81, 0x00]);

    bankrec(dir.path())
        .arg("reconcile")
        .arg(&books)
        .arg(&bank)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ledger file"))
        .stderr(predicate::str::contains("No header row found"))
        .stderr(predicate::str::contains("Bank file"))
        .stderr(predicate::str::contains("Could not read file"));
}

#[test]
fn inspect_shows_header_and_roles() {
    let dir = tempfile::tempdir().unwrap();
    let bank = write(dir.path(), "statement.csv", STATEMENT.as_bytes());

    bankrec(dir.path())
        .arg("inspect")
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("Header row:  6"))
        .stdout(predicate::str::contains("Encoding:    utf-8"))
        .stdout(predicate::str::contains("amount in (Deposit)"))
        .stdout(predicate::str::contains("amount out (Withdrawal)"));
}

#[test]
fn config_set_persists_tolerance() {
    let dir = tempfile::tempdir().unwrap();

    bankrec(dir.path())
        .args(["config", "set", "--tolerance", "9"])
        .assert()
        .success();
    let saved = std::fs::read_to_string(dir.path().join(".config/bankrec/settings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["date_tolerance_days"], 9);

    bankrec(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"date_tolerance_days\": 9"));
}

#[test]
fn rejects_tolerance_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    bankrec(dir.path())
        .args(["reconcile", "a.csv", "b.csv", "--tolerance", "61"])
        .assert()
        .failure();
}
