//! Error taxonomy for the resolution, catalog, and extraction pipeline.
//!
//! Every recoverable condition is a distinct [`BillError`] variant so adapters
//! can show a specific message instead of one generic failure. Conditions that
//! are informational rather than errors (an empty catalog, a page without
//! text) are exposed as message constants and never travel through `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// Shown when a catalog lists zero documents.
pub const NO_FILES_MESSAGE: &str = "No PDF files found in the bills folder.";

/// Shown in place of the text of a page that yielded nothing.
pub const NO_PAGE_TEXT_MESSAGE: &str =
    "This page has no extractable text (it may be a scanned image).";

#[derive(Debug, Error)]
pub enum BillError {
    /// No candidate directory exists and no upload was supplied.
    #[error("no bills source found: none of the candidate folders exist and nothing was uploaded")]
    SourceNotFound,

    /// A previously resolved source can no longer be read.
    #[error("bills source {} is no longer readable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The selected PDF could not be opened at all.
    #[error("could not read document {name}: {diagnostic}")]
    DocumentOpenFailure { name: String, diagnostic: String },

    /// The selection names a document absent from the latest catalog.
    #[error("document not found: {name}")]
    NotFound { name: String },

    /// An uploaded filename does not reduce to a usable file name.
    #[error("invalid upload filename: {name:?}")]
    InvalidUpload { name: String },

    /// The caller interrupted extraction.
    #[error("extraction cancelled")]
    Cancelled,
}

impl BillError {
    /// Stable machine-readable code, used by the HTTP adapter and `--json` output.
    pub fn code(&self) -> &'static str {
        match self {
            BillError::SourceNotFound => "source_not_found",
            BillError::SourceUnavailable { .. } => "source_unavailable",
            BillError::DocumentOpenFailure { .. } => "document_open_failure",
            BillError::NotFound { .. } => "not_found",
            BillError::InvalidUpload { .. } => "invalid_upload",
            BillError::Cancelled => "cancelled",
        }
    }

    /// Message meant for the person using the viewer.
    pub fn user_message(&self) -> String {
        match self {
            BillError::SourceNotFound => {
                "Bills folder not found. Please upload PDF bills to continue.".to_string()
            }
            BillError::SourceUnavailable { path, .. } => format!(
                "The bills folder {} can no longer be read. Refresh to locate it again.",
                path.display()
            ),
            BillError::DocumentOpenFailure { name, diagnostic } => format!(
                "This document could not be read ({}): {}. Select a different bill.",
                name, diagnostic
            ),
            BillError::NotFound { name } => format!(
                "{} is not in the current list of bills. Refresh and select again.",
                name
            ),
            BillError::InvalidUpload { name } => {
                format!("The uploaded file name {:?} cannot be used.", name)
            }
            BillError::Cancelled => "Reading the document was interrupted.".to_string(),
        }
    }

    pub(crate) fn unavailable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        BillError::SourceUnavailable {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn open_failure(name: &str, diagnostic: impl std::fmt::Display) -> Self {
        BillError::DocumentOpenFailure {
            name: name.to_string(),
            diagnostic: diagnostic.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BillError>;
