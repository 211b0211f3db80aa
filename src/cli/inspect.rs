use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Overrides;
use crate::columns::{resolve_columns, ColumnRoles};
use crate::importer::import_file;
use crate::models::{Direction, TableKind};
use crate::reconciler::derive_transactions;
use crate::settings::load_settings;

fn role_label(idx: usize, roles: &ColumnRoles, kind: TableKind) -> String {
    if roles.date == Some(idx) {
        "date".to_string()
    } else if roles.inbound == idx {
        format!("amount in ({})", Direction::new(kind, true))
    } else if roles.outbound == idx {
        format!("amount out ({})", Direction::new(kind, false))
    } else if roles.narration == Some(idx) {
        "narration".to_string()
    } else {
        String::new()
    }
}

pub fn run(file: &Path, kind: TableKind, overrides: &Overrides) -> Result<()> {
    let settings = overrides.apply(load_settings());
    let name = file.display().to_string();
    let table = import_file(file, &settings.ingest_options()).map_err(|e| e.in_file(kind, &name))?;

    println!("File:        {name}");
    println!("Format:      {}", table.source_format);
    println!(
        "Encoding:    {}",
        table.text_encoding.map(|e| e.label()).unwrap_or("-")
    );
    println!("Header row:  {}", table.header_row);
    println!("Data rows:   {}", table.len());
    println!("SHA-256:     {}", table.checksum);
    if table.is_empty() {
        println!("{}", "Header found but no data rows below it.".yellow());
    }

    let roles = resolve_columns(&table.columns, kind);

    let mut columns = Table::new();
    columns.set_header(vec!["#", "Column", "Role"]);
    for (i, col) in table.columns.iter().enumerate() {
        let role = match &roles {
            Ok(r) => role_label(i, r, kind),
            Err(_) => String::new(),
        };
        columns.add_row(vec![Cell::new(i), Cell::new(col), Cell::new(role)]);
    }
    println!("\n{columns}");

    let roles = roles.map_err(|e| e.in_file(kind, &name))?;
    if roles.date.is_none() {
        println!("{}", "No date column: matching will ignore dates for this file.".yellow());
    }

    let transactions = derive_transactions(&table, &roles, kind);
    let inbound = transactions
        .iter()
        .filter(|t| !t.is_inert() && t.direction.is_inbound())
        .count();
    let outbound = transactions
        .iter()
        .filter(|t| !t.is_inert() && !t.direction.is_inbound())
        .count();
    let inert = transactions.iter().filter(|t| t.is_inert()).count();
    let undated = transactions
        .iter()
        .filter(|t| !t.is_inert() && t.parsed_date.is_none())
        .count();

    println!();
    println!("{:<12} {inbound}", format!("{}s:", Direction::new(kind, true)));
    println!("{:<12} {outbound}", format!("{}s:", Direction::new(kind, false)));
    println!("Zero rows:   {inert}");
    if undated > 0 {
        println!("{}", format!("Undated:     {undated}").yellow());
    }
    Ok(())
}
