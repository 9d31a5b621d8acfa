//! One user's view of the bills: the active source and its latest catalog.
//!
//! A session resolves its source once and keeps it until [`Session::refresh`].
//! Catalogs are handed out as `Arc`s; a refresh swaps in a new one, so readers
//! holding the old catalog keep a consistent (if stale) view.

use std::sync::Arc;

use crate::catalog::{Catalog, SortOrder};
use crate::config::Config;
use crate::error::{BillError, Result};
use crate::extract::{CancelFlag, ContentExtractor};
use crate::models::{DocumentEntry, Download, ExtractedDocument, SourceLocation};
use crate::progress::ExtractProgress;
use crate::resolver::{Resolution, SourceResolver};
use crate::upload::{UploadStore, UploadedFile};

#[derive(Debug)]
pub struct Session {
    resolver: SourceResolver,
    order: SortOrder,
    upload: Option<UploadStore>,
    catalog: Option<Arc<Catalog>>,
}

impl Session {
    pub fn new(resolver: SourceResolver, order: SortOrder) -> Self {
        Self {
            resolver,
            order,
            upload: None,
            catalog: None,
        }
    }

    /// The active catalog, resolving and listing on first use.
    pub fn open(&mut self) -> Result<Arc<Catalog>> {
        match &self.catalog {
            Some(catalog) => Ok(Arc::clone(catalog)),
            None => self.refresh(),
        }
    }

    /// Discards the active catalog and resolves + lists from scratch.
    ///
    /// Candidate folders take precedence; uploaded files are used only when no
    /// folder exists. If neither is available the session has no catalog.
    pub fn refresh(&mut self) -> Result<Arc<Catalog>> {
        self.catalog = None;
        let source = match self.resolver.resolve() {
            Resolution::Directory(source) => source,
            Resolution::RequiresUpload => match &self.upload {
                Some(store) => SourceLocation::Ephemeral(store.clone()),
                None => return Err(BillError::SourceNotFound),
            },
        };
        self.install(source)
    }

    /// Like [`Session::open`], but falls back to `files` when no folder exists.
    ///
    /// Files are only materialized when resolution actually needs them.
    pub fn open_or_upload(&mut self, files: &[UploadedFile]) -> Result<Arc<Catalog>> {
        match self.open() {
            Err(BillError::SourceNotFound) if !files.is_empty() => self.supply_upload(files),
            other => other,
        }
    }

    /// Stores an upload set and makes it the active source.
    pub fn supply_upload(&mut self, files: &[UploadedFile]) -> Result<Arc<Catalog>> {
        let source = self.resolver.accept_upload(files)?;
        if let SourceLocation::Ephemeral(store) = &source {
            self.upload = Some(store.clone());
        }
        self.install(source)
    }

    /// The latest catalog, if one has been built.
    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.clone()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolver(), config.catalog.sort)
    }

    pub fn has_upload(&self) -> bool {
        self.upload.is_some()
    }

    /// Resolves a selection against the latest catalog.
    pub fn select(&self, name: &str) -> Result<DocumentEntry> {
        let catalog = self.catalog.as_ref().ok_or(BillError::SourceNotFound)?;
        catalog.find(name).cloned()
    }

    pub fn download(&self, name: &str) -> Result<Download> {
        let catalog = self.catalog.as_ref().ok_or(BillError::SourceNotFound)?;
        catalog.download(name)
    }

    pub fn extract(
        &self,
        name: &str,
        extractor: &ContentExtractor,
        cancel: &CancelFlag,
        progress: &dyn ExtractProgress,
    ) -> Result<ExtractedDocument> {
        let entry = self.select(name)?;
        extractor.extract_with(&entry, cancel, progress)
    }

    fn install(&mut self, source: SourceLocation) -> Result<Arc<Catalog>> {
        let catalog = Arc::new(Catalog::list(source, self.order)?);
        self.catalog = Some(Arc::clone(&catalog));
        Ok(catalog)
    }
}
