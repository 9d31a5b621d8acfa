//! Core data models shared by the resolver, catalog, and extractor.
//!
//! These types are immutable values once produced: a refreshed catalog or a
//! second extraction builds new values instead of mutating old ones.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{BillError, Result, NO_PAGE_TEXT_MESSAGE};
use crate::upload::UploadStore;

/// MIME type served with every download.
pub const MIME_PDF: &str = "application/pdf";

/// Where a source location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A relative path, e.g. `./bills` next to a deployed app.
    CloudRelative,
    /// An absolute path on the local machine.
    LocalAbsolute,
    /// Files supplied by the user for this session only.
    EphemeralUpload,
}

impl SourceKind {
    /// Kind of a configured candidate path.
    pub fn for_path(path: &Path) -> Self {
        if path.is_absolute() {
            SourceKind::LocalAbsolute
        } else {
            SourceKind::CloudRelative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::CloudRelative => "cloud_relative",
            SourceKind::LocalAbsolute => "local_absolute",
            SourceKind::EphemeralUpload => "ephemeral_upload",
        }
    }
}

/// The single active source of a session.
///
/// Both variants are "a directory of named byte blobs" to the catalog. The
/// ephemeral variant keeps its upload storage alive for as long as any clone
/// of the location (including one held by a catalog) exists.
#[derive(Debug, Clone)]
pub enum SourceLocation {
    Directory { path: PathBuf, kind: SourceKind },
    Ephemeral(UploadStore),
}

impl SourceLocation {
    pub fn path(&self) -> &Path {
        match self {
            SourceLocation::Directory { path, .. } => path,
            SourceLocation::Ephemeral(store) => store.path(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourceLocation::Directory { kind, .. } => *kind,
            SourceLocation::Ephemeral(_) => SourceKind::EphemeralUpload,
        }
    }
}

/// A PDF file listed from a source location.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    /// File name, unique within its catalog (case-sensitive).
    pub name: String,
    /// Size in bytes at listing time.
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl DocumentEntry {
    /// Reads the raw, unmodified content of the file.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| BillError::unavailable(&self.path, e))
    }
}

/// Text extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedPage {
    /// 0-based page position in document order.
    pub index: usize,
    /// Page text; always empty when `extractable` is false.
    pub text: String,
    pub extractable: bool,
}

impl ExtractedPage {
    /// Text to show for this page, substituting a notice for pages without text.
    pub fn display_text(&self) -> &str {
        if self.extractable {
            &self.text
        } else {
            NO_PAGE_TEXT_MESSAGE
        }
    }
}

/// Successful extraction of a whole document.
///
/// A document that could not be opened is reported as
/// [`BillError::DocumentOpenFailure`] instead; zero pages here means the PDF
/// opened and really has no pages.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub name: String,
    pub pages: Vec<ExtractedPage>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn extractable_count(&self) -> usize {
        self.pages.iter().filter(|p| p.extractable).count()
    }
}

/// Raw bytes of a document, ready to be offered as a file download.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Hex SHA-256 of the content, used as an entity tag.
    pub fn sha256(&self) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(&self.bytes))
    }
}
