//! # Bill Viewer CLI (`bills`)
//!
//! ## Usage
//!
//! ```bash
//! bills --config ./config/bills.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bills sources` | Show candidate folders and which one is active |
//! | `bills list` | List the PDF bills in the active source |
//! | `bills show <name>` | Print the text of each page |
//! | `bills download <name>` | Save the original PDF |
//! | `bills serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # List bills sorted by name
//! bills list --sorted
//!
//! # No bills folder? Supply files for this run
//! bills --upload ~/Downloads/Jan.pdf list
//!
//! # Read a bill as JSON
//! bills show Jan.pdf --json
//! ```

use bill_viewer::error::BillError;
use bill_viewer::progress::ProgressMode;
use bill_viewer::{config, server, show, sources};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bill Viewer: browse, read, and download PDF bills.
///
/// Bills are read from the first candidate folder in the configuration that
/// exists. When none does, pass `--upload` to supply files directly.
#[derive(Parser)]
#[command(name = "bills", version, about = "Browse, read, and download PDF bills")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/bills.toml`. When the file does not exist the
    /// built-in defaults are used (candidate folder `./bills`).
    #[arg(long, global = true, default_value = "./config/bills.toml")]
    config: PathBuf,

    /// PDF files to use when no candidate folder exists. Repeatable.
    #[arg(long = "upload", global = true, value_name = "FILE")]
    uploads: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every candidate folder and whether it is available.
    Sources,

    /// List the PDF bills in the active source.
    List {
        /// Sort by file name instead of directory order.
        #[arg(long)]
        sorted: bool,

        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the text of every page of a bill.
    ///
    /// Pages without extractable text (scans, images) are reported as such.
    Show {
        /// File name as shown by `bills list`.
        name: String,

        /// Print the extraction result as JSON.
        #[arg(long)]
        json: bool,

        /// Progress on stderr. Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Save the original, unmodified PDF.
    Download {
        /// File name as shown by `bills list`.
        name: String,

        /// Output file or directory. Defaults to the bill's name in the current directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_minimal(&cli.config)?;

    let result = match cli.command {
        Commands::Sources => sources::list_sources(&cfg),
        Commands::List { sorted, json } => show::run_list(&cfg, &cli.uploads, sorted, json),
        Commands::Show {
            name,
            json,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            show::run_show(&cfg, &cli.uploads, &name, json, mode)
        }
        Commands::Download { name, out } => {
            show::run_download(&cfg, &cli.uploads, &name, out.as_deref())
        }
        Commands::Serve => server::run_server(&cfg).await,
    };

    if let Err(err) = result {
        if let Some(bill_err) = err.downcast_ref::<BillError>() {
            eprintln!("Error: {}", bill_err.user_message());
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}
