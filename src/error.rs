//! Crate-level error taxonomy.
//!
//! Per-field problems (bad rect, ambiguous widget type, a single failed
//! rename) are never surfaced as `Err` here — they are recorded on the
//! relevant `FieldModification` or logged as a warning and the pipeline
//! continues. `CoreError` carries only the small set of document-level,
//! fatal conditions named in the error taxonomy.

use std::path::PathBuf;

use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoreError {
    #[snafu(display("input file not found: {}", path.display()))]
    InputNotFound { path: PathBuf, backtrace: Backtrace },

    #[snafu(display("input file unreadable: {source}"))]
    InputUnreadable {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("document is not a recognizable PDF"))]
    InvalidPdf { backtrace: Backtrace },

    #[snafu(display("document is encrypted and no credential was supplied"))]
    EncryptedNoCredential { backtrace: Backtrace },

    #[snafu(display("supplied credential could not decrypt the document"))]
    BadCredential { backtrace: Backtrace },

    #[snafu(display("document contains no pages"))]
    EmptyDocument { backtrace: Backtrace },

    #[snafu(display("underlying PDF object graph error: {source}"))]
    #[snafu(context(false))]
    Pdf {
        source: pdf::error::PdfError,
        backtrace: Backtrace,
    },

    #[snafu(display("critical failure while writing modified document: {message}"))]
    ModificationCritical {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("backup source file is missing: {}", path.display()))]
    BackupSourceMissing { path: PathBuf, backtrace: Backtrace },

    #[snafu(display("failed to copy backup: {source}"))]
    BackupCopyFailed {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("backup not found: {backup_id}"))]
    BackupMissing {
        backup_id: String,
        backtrace: Backtrace,
    },

    #[snafu(display("backup is corrupt or truncated: {backup_id}"))]
    BackupCorrupt {
        backup_id: String,
        backtrace: Backtrace,
    },

    #[snafu(display("backup index could not be read or written: {source}"))]
    BackupIndex {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("failed to write report: {source}"))]
    ReportWrite {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("failed to write CSV report: {source}"))]
    CsvWrite {
        source: csv::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("I/O error: {source}"))]
    #[snafu(context(false))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
