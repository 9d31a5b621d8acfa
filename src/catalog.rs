//! Document catalog: the PDF files directly inside a source location.
//!
//! Only direct children are considered. An entry is listed when it resolves
//! (following symlinks) to a regular file whose extension is `pdf` in any
//! letter case. Listing order is whatever the filesystem yields unless
//! [`SortOrder::Name`] is requested.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{BillError, Result, NO_FILES_MESSAGE};
use crate::models::{Download, DocumentEntry, SourceLocation, MIME_PDF};

/// Ordering of catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Platform-defined directory enumeration order.
    #[default]
    Filesystem,
    /// Byte-wise ascending file name.
    Name,
}

/// Immutable listing of one source location.
#[derive(Debug, Clone)]
pub struct Catalog {
    source: SourceLocation,
    entries: Vec<DocumentEntry>,
}

impl Catalog {
    /// Lists the PDF documents in `source`.
    ///
    /// Fails with [`BillError::SourceUnavailable`] if the location cannot be
    /// read any more. A readable directory without PDFs yields an empty
    /// catalog, not an error.
    pub fn list(source: SourceLocation, order: SortOrder) -> Result<Self> {
        let root = source.path().to_path_buf();
        std::fs::read_dir(&root).map_err(|e| BillError::unavailable(&root, e))?;

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(BillError::unavailable(&root, e)),
                Err(e) => {
                    // Broken symlinks and entries removed mid-listing.
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_pdf_extension(entry.path()) {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(name, error = %e, "skipping entry without metadata");
                    continue;
                }
            };

            entries.push(DocumentEntry {
                name: name.to_string(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                path: entry.path().to_path_buf(),
            });
        }

        if order == SortOrder::Name {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
        }

        tracing::debug!(
            source = %root.display(),
            documents = entries.len(),
            "listed catalog"
        );

        Ok(Self { source, entries })
    }

    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Informational notice for an empty catalog.
    pub fn notice(&self) -> Option<&'static str> {
        self.is_empty().then_some(NO_FILES_MESSAGE)
    }

    /// Looks up an entry by exact (case-sensitive) name.
    pub fn find(&self, name: &str) -> Result<&DocumentEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BillError::NotFound {
                name: name.to_string(),
            })
    }

    /// Raw bytes of an entry together with its original file name.
    pub fn download(&self, name: &str) -> Result<Download> {
        let entry = self.find(name)?;
        Ok(Download {
            file_name: entry.name.clone(),
            content_type: MIME_PDF,
            bytes: entry.read_bytes()?,
        })
    }
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
