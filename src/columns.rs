use serde::Serialize;

use crate::error::{ReconError, Result};
use crate::models::TableKind;

/// Keyword priority table for one kind of table. Each role takes the first
/// column containing its highest-priority keyword (case-insensitive).
pub struct RoleKeywords {
    pub date: &'static [&'static str],
    pub inbound: &'static [&'static str],
    pub outbound: &'static [&'static str],
    pub narration: &'static [&'static str],
}

const NARRATION: &[&str] = &["narration", "account", "particulars", "description", "remarks"];

// In the books, a debit to the bank account is money received.
const LEDGER: RoleKeywords = RoleKeywords {
    date: &["date"],
    inbound: &["debit", "deposit"],
    outbound: &["credit", "withdraw"],
    narration: NARRATION,
};

// On a statement the bank speaks from its own side: credits are money in.
const BANK: RoleKeywords = RoleKeywords {
    date: &["date"],
    inbound: &["deposit", "credit"],
    outbound: &["withdraw", "debit"],
    narration: NARRATION,
};

pub fn keywords(kind: TableKind) -> &'static RoleKeywords {
    match kind {
        TableKind::Ledger => &LEDGER,
        TableKind::Bank => &BANK,
    }
}

/// Column index per semantic role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub date: Option<usize>,
    pub inbound: usize,
    pub outbound: usize,
    pub narration: Option<usize>,
}

fn find_column(columns: &[String], keywords: &[&str], taken: &[usize]) -> Option<usize> {
    keywords.iter().find_map(|kw| {
        columns
            .iter()
            .enumerate()
            .find(|(i, name)| !taken.contains(i) && name.to_lowercase().contains(kw))
            .map(|(i, _)| i)
    })
}

/// Map column names to roles. Both amount roles are required.
pub fn resolve_columns(columns: &[String], kind: TableKind) -> Result<ColumnRoles> {
    let kw = keywords(kind);
    let not_found = || ReconError::ColumnsNotFound {
        columns: columns.to_vec(),
    };

    let date = find_column(columns, kw.date, &[]);
    let mut taken: Vec<usize> = date.into_iter().collect();
    let inbound = find_column(columns, kw.inbound, &taken).ok_or_else(not_found)?;
    taken.push(inbound);
    let outbound = find_column(columns, kw.outbound, &taken).ok_or_else(not_found)?;
    taken.push(outbound);
    let narration = find_column(columns, kw.narration, &taken);

    Ok(ColumnRoles {
        date,
        inbound,
        outbound,
        narration,
    })
}
