//! Per-page text extraction for PDF bills.
//!
//! Opening the document is all-or-nothing: a file that does not parse is a
//! [`BillError::DocumentOpenFailure`]. Once open, every page is extracted on
//! its own. A page that yields no text, returns an error, or panics inside the
//! PDF library becomes a non-extractable page and the next page carries on.

use serde::Deserialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BillError, Result};
use crate::models::{DocumentEntry, ExtractedDocument, ExtractedPage};
use crate::progress::{ExtractProgress, ExtractProgressEvent, NoProgress};

/// Text engine used for pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractEngine {
    /// `lopdf`, one page at a time.
    #[default]
    Lopdf,
    /// `pdf-extract`, page by page over the whole document. Falls back to
    /// [`ExtractEngine::Lopdf`] for encrypted files and whenever its output
    /// cannot be mapped onto the document's pages one to one.
    PdfExtract,
}

/// Shared flag a caller sets to stop an extraction early.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What one page produced before folding into an [`ExtractedPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageOutcome {
    Text(String),
    Empty,
    Failed(String),
}

impl PageOutcome {
    fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            PageOutcome::Empty
        } else {
            PageOutcome::Text(text)
        }
    }

    fn into_page(self, index: usize) -> ExtractedPage {
        match self {
            PageOutcome::Text(text) => ExtractedPage {
                index,
                text,
                extractable: true,
            },
            PageOutcome::Empty | PageOutcome::Failed(_) => ExtractedPage {
                index,
                text: String::new(),
                extractable: false,
            },
        }
    }
}

/// Extracts per-page text from PDF bytes. Never writes anything back.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    engine: ExtractEngine,
    password: Option<String>,
    max_bytes: Option<u64>,
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &crate::config::ExtractConfig) -> Self {
        Self {
            engine: config.engine,
            password: config.password.clone(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn with_engine(mut self, engine: ExtractEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn extract(&self, entry: &DocumentEntry) -> Result<ExtractedDocument> {
        self.extract_with(entry, &CancelFlag::default(), &NoProgress)
    }

    pub fn extract_with(
        &self,
        entry: &DocumentEntry,
        cancel: &CancelFlag,
        progress: &dyn ExtractProgress,
    ) -> Result<ExtractedDocument> {
        self.check_size(&entry.name, entry.size)?;
        let bytes = entry.read_bytes()?;
        self.extract_bytes_with(&entry.name, &bytes, cancel, progress)
    }

    pub fn extract_bytes(&self, name: &str, bytes: &[u8]) -> Result<ExtractedDocument> {
        self.extract_bytes_with(name, bytes, &CancelFlag::default(), &NoProgress)
    }

    pub fn extract_bytes_with(
        &self,
        name: &str,
        bytes: &[u8],
        cancel: &CancelFlag,
        progress: &dyn ExtractProgress,
    ) -> Result<ExtractedDocument> {
        self.check_size(name, bytes.len() as u64)?;
        if cancel.is_cancelled() {
            return Err(BillError::Cancelled);
        }

        let (doc, encrypted) = open_document(name, bytes, self.password.as_deref())?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total = page_numbers.len() as u64;
        progress.report(ExtractProgressEvent::Opened {
            document: name.to_string(),
            pages: total,
        });

        let mut whole_document = match self.engine {
            ExtractEngine::PdfExtract if !encrypted => {
                pdf_extract_pages(name, bytes, page_numbers.len())
            }
            _ => None,
        }
        .map(Vec::into_iter);

        let mut pages = Vec::with_capacity(page_numbers.len());
        for (index, page_number) in page_numbers.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::debug!(document = name, at_page = index, "extraction cancelled");
                return Err(BillError::Cancelled);
            }

            let outcome = match whole_document.as_mut().and_then(Iterator::next) {
                Some(text) => PageOutcome::from_text(text),
                None => extract_page(&doc, *page_number),
            };
            if let PageOutcome::Failed(reason) = &outcome {
                tracing::debug!(document = name, page = index, %reason, "page extraction failed");
            }

            let page = outcome.into_page(index);
            progress.report(ExtractProgressEvent::Page {
                document: name.to_string(),
                n: index as u64 + 1,
                total,
                extractable: page.extractable,
            });
            pages.push(page);
        }

        Ok(ExtractedDocument {
            name: name.to_string(),
            pages,
        })
    }

    fn check_size(&self, name: &str, size: u64) -> Result<()> {
        match self.max_bytes {
            Some(max) if size > max => Err(BillError::open_failure(
                name,
                format!("file is {} bytes, over the {} byte limit", size, max),
            )),
            _ => Ok(()),
        }
    }
}

/// Opens `bytes`, decrypting when needed. The flag is true for encrypted
/// files, which pdf-extract decrypts a second time.
fn open_document(
    name: &str,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<(lopdf::Document, bool)> {
    let doc = load(name, bytes)?;
    if !doc.is_encrypted() {
        ensure_catalog(name, &doc)?;
        return Ok((doc, false));
    }

    // lopdf already decrypted everything with the empty user password.
    if doc.encryption_state.is_some() {
        ensure_catalog(name, &doc)?;
        return Ok((doc, true));
    }

    let Some(password) = password else {
        return Err(BillError::open_failure(
            name,
            "document is encrypted and no password is configured",
        ));
    };
    let doc = load_with_password(name, bytes, password)?;
    ensure_catalog(name, &doc)?;
    Ok((doc, true))
}

fn load(name: &str, bytes: &[u8]) -> Result<lopdf::Document> {
    match catch_unwind(|| lopdf::Document::load_mem(bytes)) {
        Ok(Ok(doc)) => Ok(doc),
        Ok(Err(e)) => Err(BillError::open_failure(name, e)),
        Err(payload) => Err(BillError::open_failure(name, panic_message(payload))),
    }
}

/// lopdf only parses the objects of an encrypted file when the user password
/// is empty. Loading with the encryption key parked parses them as plain
/// objects; restoring it lets `decrypt` run with the real password.
fn load_with_password(name: &str, bytes: &[u8], password: &str) -> Result<lopdf::Document> {
    let mut parked = bytes.to_vec();
    park_encrypt_key(&mut parked);
    let mut doc = load(name, &parked)?;

    let encrypt = doc
        .trailer
        .remove(&PARKED_ENCRYPT_KEY[1..])
        .ok_or_else(|| BillError::open_failure(name, "encryption dictionary not found"))?;
    doc.trailer.set("Encrypt", encrypt);

    doc.decrypt(password).map_err(|e| {
        BillError::open_failure(
            name,
            format!("could not decrypt with the configured password: {}", e),
        )
    })?;
    Ok(doc)
}

const ENCRYPT_KEY: &[u8] = b"/Encrypt";
const PARKED_ENCRYPT_KEY: &[u8] = b"/Xncrypt";

/// Renames every `/Encrypt` name token in place. Same length, so xref offsets
/// stay valid. Longer names such as `/EncryptMetadata` are left alone.
fn park_encrypt_key(bytes: &mut [u8]) {
    let mut from = 0;
    while let Some(pos) = bytes[from..]
        .windows(ENCRYPT_KEY.len())
        .position(|w| w == ENCRYPT_KEY)
    {
        let at = from + pos;
        let end = at + ENCRYPT_KEY.len();
        if bytes.get(end).map_or(true, |b| !b.is_ascii_alphanumeric()) {
            bytes[at..end].copy_from_slice(PARKED_ENCRYPT_KEY);
        }
        from = end;
    }
}

/// A document without a reachable catalog did not really open, even if
/// lopdf returned one.
fn ensure_catalog(name: &str, doc: &lopdf::Document) -> Result<()> {
    doc.catalog()
        .map(|_| ())
        .map_err(|e| BillError::open_failure(name, format!("document catalog unreadable: {}", e)))
}

fn extract_page(doc: &lopdf::Document, page_number: u32) -> PageOutcome {
    match catch_unwind(AssertUnwindSafe(|| doc.extract_text(&[page_number]))) {
        Ok(Ok(text)) => PageOutcome::from_text(text),
        Ok(Err(e)) => PageOutcome::Failed(e.to_string()),
        Err(payload) => PageOutcome::Failed(panic_message(payload)),
    }
}

/// Per-page text from pdf-extract, or `None` when it fails or stops short of
/// `expected` pages.
fn pdf_extract_pages(name: &str, bytes: &[u8], expected: usize) -> Option<Vec<String>> {
    let pages = match catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            tracing::debug!(document = name, error = %e, "pdf-extract failed; using lopdf");
            return None;
        }
        Err(payload) => {
            tracing::debug!(
                document = name,
                error = %panic_message(payload),
                "pdf-extract panicked; using lopdf"
            );
            return None;
        }
    };

    if pages.len() == expected {
        Some(pages)
    } else {
        tracing::debug!(
            document = name,
            expected,
            found = pages.len(),
            "pdf-extract page count does not match; using lopdf"
        );
        None
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "PDF library panicked".to_string()
    }
}
