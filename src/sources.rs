use anyhow::Result;

use crate::config::Config;
use crate::resolver::Resolution;

/// Prints every candidate folder, its kind, and whether it can be used.
pub fn list_sources(config: &Config) -> Result<()> {
    let resolver = config.resolver();
    let statuses = resolver.statuses();

    println!("{:<4} {:<40} {:<16} AVAILABLE", "#", "CANDIDATE", "KIND");
    for (i, status) in statuses.iter().enumerate() {
        let available = if status.available {
            "yes".to_string()
        } else {
            format!("no ({})", status.reason.as_deref().unwrap_or("unknown"))
        };
        println!(
            "{:<4} {:<40} {:<16} {}",
            i + 1,
            status.path.display(),
            status.kind.as_str(),
            available
        );
    }

    match resolver.resolve() {
        Resolution::Directory(source) => {
            println!();
            println!("active: {} ({})", source.path().display(), source.kind().as_str());
        }
        Resolution::RequiresUpload => {
            println!();
            println!("active: none (pass --upload <FILE> to supply PDFs for this run)");
        }
    }

    Ok(())
}
