use thiserror::Error;

use crate::models::TableKind;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File is empty")]
    EmptyFile,

    #[error("Could not read file as CSV or spreadsheet ({})", attempts.join("; "))]
    UnreadableFile { attempts: Vec<String> },

    #[error("No header row found in the first {} rows (need a 'date' column plus one of narration/debit/credit/withdraw/deposit/vch/particulars/account/type)", scanned.len())]
    HeaderNotFound { scanned: Vec<Vec<String>> },

    #[error("Could not find debit/credit columns. Columns found: {}", columns.join(", "))]
    ColumnsNotFound { columns: Vec<String> },

    #[error("Date tolerance must be between 0 and 60 days, got {0}")]
    InvalidTolerance(u32),

    #[error("{kind} file {file}: {cause}")]
    InFile {
        kind: TableKind,
        file: String,
        cause: Box<ReconError>,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl ReconError {
    /// Tag a file-level failure with the upload it came from.
    pub fn in_file(self, kind: TableKind, file: &str) -> Self {
        ReconError::InFile {
            kind,
            file: file.to_string(),
            cause: Box::new(self),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReconError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ReconError::Export(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
