//! Extraction progress reporting.
//!
//! Long documents are extracted page by page; reporters let the CLI show how
//! far along it is. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.

use std::io::Write;

/// A single progress event for extraction.
#[derive(Clone, Debug)]
pub enum ExtractProgressEvent {
    /// The document opened and its page count is known.
    Opened { document: String, pages: u64 },
    /// Page `n` (1-based) of `total` finished.
    Page {
        document: String,
        n: u64,
        total: u64,
        extractable: bool,
    },
}

/// Reports extraction progress. Called from the extractor.
pub trait ExtractProgress: Send + Sync {
    fn report(&self, event: ExtractProgressEvent);
}

/// Human-friendly progress on stderr: "extract Jan.pdf  page 3 / 12".
pub struct StderrProgress;

impl ExtractProgress for StderrProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let line = match &event {
            ExtractProgressEvent::Opened { document, pages } => {
                format!("extract {}  {} pages\n", document, format_number(*pages))
            }
            ExtractProgressEvent::Page {
                document,
                n,
                total,
                extractable,
            } => {
                let suffix = if *extractable { "" } else { "  (no text)" };
                format!(
                    "extract {}  page {} / {}{}\n",
                    document,
                    format_number(*n),
                    format_number(*total),
                    suffix
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExtractProgress for JsonProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let obj = match &event {
            ExtractProgressEvent::Opened { document, pages } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "opened",
                "total": pages
            }),
            ExtractProgressEvent::Page {
                document,
                n,
                total,
                extractable,
            } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "page",
                "n": n,
                "total": total,
                "extractable": extractable
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExtractProgress for NoProgress {
    fn report(&self, _event: ExtractProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ExtractProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
