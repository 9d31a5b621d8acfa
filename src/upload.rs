//! Session-scoped storage for uploaded documents.
//!
//! When no bills folder exists, users hand over files directly. Those files
//! are written into a private temporary directory so the catalog can list
//! them exactly like a real folder. Each store is its own directory, so two
//! sessions never see each other's uploads, and the directory is removed once
//! the last handle to it is dropped.

use std::path::{Component, Path};
use std::sync::Arc;

use tempfile::TempDir;

use crate::error::{BillError, Result};

const UPLOAD_DIR_PREFIX: &str = "bills-upload-";

/// One uploaded file as received from the presentation layer.
///
/// The name is not required to end in `.pdf`; the catalog filters uploads the
/// same way it filters folders.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a local file as an upload, keeping only its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            name,
            bytes: std::fs::read(path)?,
        })
    }
}

/// Handle to a temporary upload directory. Clones share the same directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: Arc<TempDir>,
    files: usize,
}

impl UploadStore {
    /// Writes `files` into a fresh temporary directory.
    ///
    /// A later file with the same name as an earlier one replaces it.
    pub fn materialize(files: &[UploadedFile]) -> Result<Self> {
        if files.is_empty() {
            return Err(BillError::SourceNotFound);
        }

        // Validate every name before touching the disk.
        let names = files
            .iter()
            .map(|f| sanitize_file_name(&f.name))
            .collect::<Result<Vec<_>>>()?;

        let dir = tempfile::Builder::new()
            .prefix(UPLOAD_DIR_PREFIX)
            .tempdir()
            .map_err(|e| BillError::unavailable(std::env::temp_dir(), e))?;

        for (name, file) in names.iter().zip(files) {
            let target = dir.path().join(name);
            std::fs::write(&target, &file.bytes).map_err(|e| BillError::unavailable(&target, e))?;
        }

        let mut unique = names.clone();
        unique.sort();
        unique.dedup();

        tracing::info!(
            dir = %dir.path().display(),
            files = unique.len(),
            "materialized upload set"
        );

        Ok(Self {
            dir: Arc::new(dir),
            files: unique.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of distinct files written.
    pub fn len(&self) -> usize {
        self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files == 0
    }
}

/// Reduces an uploaded name to its final path component.
fn sanitize_file_name(raw: &str) -> Result<String> {
    let normalized = raw.replace('\\', "/");
    let last = Path::new(&normalized)
        .components()
        .next_back()
        .and_then(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match last {
        Some(name) => Ok(name.to_string()),
        None => Err(BillError::InvalidUpload {
            name: raw.to_string(),
        }),
    }
}
