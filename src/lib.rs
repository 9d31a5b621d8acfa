//! # Bill Viewer
//!
//! Browse a folder of PDF bills, read their text page by page, and download
//! the originals.
//!
//! The library is the pipeline behind the `bills` CLI and HTTP server:
//!
//! ```text
//! ┌────────────────┐   ┌─────────┐   ┌───────────┐   ┌──────────────────┐
//! │ SourceResolver │──▶│ Catalog │──▶│ selection │──▶│ ContentExtractor │
//! │ folders/upload │   │ *.pdf   │   │ by name   │   │ per page         │
//! └────────────────┘   └─────────┘   └───────────┘   └──────────────────┘
//! ```
//!
//! Candidate folders are tried in order; when none exists the caller supplies
//! uploaded files, which live in a private temporary directory for the rest
//! of the session. Extraction isolates pages: one unreadable page never costs
//! the rest of the document.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`resolver`] | Ordered candidate folders and upload fallback |
//! | [`upload`] | Session-scoped storage for uploaded files |
//! | [`catalog`] | PDF listing, lookup, and download |
//! | [`extract`] | Per-page text extraction |
//! | [`session`] | Active source, refresh, and selection |
//! | [`error`] | Error taxonomy and user-facing messages |
//! | [`models`] | Core data types |
//! | [`config`] | TOML configuration parsing |
//! | [`progress`] | Extraction progress reporting |
//! | [`server`] | HTTP adapter |
//! | [`sources`] | `bills sources` command |
//! | [`show`] | `bills list`, `show`, and `download` commands |

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod progress;
pub mod resolver;
pub mod server;
pub mod session;
pub mod show;
pub mod sources;
pub mod upload;

#[cfg(test)]
mod fixtures;
