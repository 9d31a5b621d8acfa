//! Catalog listing, document display, and download for the `bills` CLI.
//!
//! Each command opens a fresh [`Session`] from the configuration, falling back
//! to `--upload` files when no bills folder exists.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::catalog::SortOrder;
use crate::config::Config;
use crate::extract::{CancelFlag, ContentExtractor};
use crate::progress::ProgressMode;
use crate::session::Session;
use crate::upload::UploadedFile;

/// Reads `--upload` paths into memory.
pub fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|p| {
            UploadedFile::read(p).with_context(|| format!("Failed to read upload: {}", p.display()))
        })
        .collect()
}

fn open_session(config: &Config, uploads: &[PathBuf], sorted: bool) -> Result<Session> {
    let files = read_uploads(uploads)?;
    let mut session = if sorted {
        Session::new(config.resolver(), SortOrder::Name)
    } else {
        Session::from_config(config)
    };
    session.open_or_upload(&files)?;
    Ok(session)
}

/// `bills list`: prints the catalog.
pub fn run_list(config: &Config, uploads: &[PathBuf], sorted: bool, json: bool) -> Result<()> {
    let session = open_session(config, uploads, sorted)?;
    let Some(catalog) = session.catalog() else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.entries())?);
        return Ok(());
    }

    println!(
        "source: {} ({})",
        catalog.source().path().display(),
        catalog.source().kind().as_str()
    );
    if let Some(notice) = catalog.notice() {
        println!("{}", notice);
        return Ok(());
    }

    println!("{:<40} {:>12}  MODIFIED", "NAME", "BYTES");
    for entry in catalog.entries() {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<40} {:>12}  {}", entry.name, entry.size, modified);
    }
    println!("{} document(s)", catalog.len());

    Ok(())
}

/// `bills show`: prints the per-page text of one document.
pub fn run_show(
    config: &Config,
    uploads: &[PathBuf],
    name: &str,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let session = open_session(config, uploads, false)?;
    let extractor = ContentExtractor::from_config(&config.extract);
    let reporter = progress.reporter();
    let doc = session.extract(name, &extractor, &CancelFlag::new(), reporter.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("--- Document ---");
    println!("name:   {}", doc.name);
    println!(
        "pages:  {} ({} with text)",
        doc.page_count(),
        doc.extractable_count()
    );
    println!();

    for page in &doc.pages {
        println!("--- Page {} ---", page.index + 1);
        println!("{}", page.display_text().trim_end());
        println!();
    }

    Ok(())
}

/// `bills download`: writes the unmodified bytes of a document to disk.
pub fn run_download(
    config: &Config,
    uploads: &[PathBuf],
    name: &str,
    out: Option<&Path>,
) -> Result<()> {
    let session = open_session(config, uploads, false)?;
    let download = session.download(name)?;

    let target = match out {
        Some(path) if path.is_dir() => path.join(&download.file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&download.file_name),
    };
    std::fs::write(&target, &download.bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!(
        "wrote {} bytes ({}) to {}",
        download.bytes.len(),
        download.content_type,
        target.display()
    );
    println!("sha256: {}", download.sha256());

    Ok(())
}
