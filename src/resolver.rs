//! Source resolution: pick the folder that supplies bills.
//!
//! Candidates are checked strictly in order and the first readable directory
//! wins. When none exists the resolver asks for an upload instead of failing;
//! the caller then hands over files which become an ephemeral source.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::models::{SourceKind, SourceLocation};
use crate::upload::{UploadStore, UploadedFile};

/// One candidate location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Ordered list of candidate locations.
#[derive(Debug, Clone, Default)]
pub struct Candidates(Vec<Candidate>);

impl Candidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate, tried after every candidate already present.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        let kind = SourceKind::for_path(&path);
        self.0.push(Candidate { path, kind });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for Candidates {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut candidates = Candidates::new();
        for path in iter {
            candidates.push(path);
        }
        candidates
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone)]
pub enum Resolution {
    Directory(SourceLocation),
    /// No candidate exists; the caller must supply an upload set.
    RequiresUpload,
}

/// Availability of one candidate, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateStatus {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub available: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    candidates: Candidates,
}

impl SourceResolver {
    pub fn new(candidates: Candidates) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    /// Returns the first candidate that is a readable directory.
    pub fn resolve(&self) -> Resolution {
        for candidate in self.candidates.iter() {
            match check_dir(&candidate.path) {
                Ok(()) => {
                    tracing::info!(
                        path = %candidate.path.display(),
                        kind = candidate.kind.as_str(),
                        "resolved bills source"
                    );
                    return Resolution::Directory(SourceLocation::Directory {
                        path: candidate.path.clone(),
                        kind: candidate.kind,
                    });
                }
                Err(reason) => {
                    tracing::debug!(
                        path = %candidate.path.display(),
                        %reason,
                        "candidate unavailable"
                    );
                }
            }
        }
        tracing::info!(
            candidates = self.candidates.len(),
            "no candidate folder exists; upload required"
        );
        Resolution::RequiresUpload
    }

    /// Materializes an upload set as an ephemeral source.
    ///
    /// An empty set leaves nothing to resolve and yields
    /// [`BillError::SourceNotFound`](crate::error::BillError::SourceNotFound).
    pub fn accept_upload(&self, files: &[UploadedFile]) -> Result<SourceLocation> {
        UploadStore::materialize(files).map(SourceLocation::Ephemeral)
    }

    /// Checks every candidate without stopping at the first hit.
    pub fn statuses(&self) -> Vec<CandidateStatus> {
        self.candidates
            .iter()
            .map(|c| {
                let result = check_dir(&c.path);
                CandidateStatus {
                    path: c.path.clone(),
                    kind: c.kind,
                    available: result.is_ok(),
                    reason: result.err(),
                }
            })
            .collect()
    }
}

/// A candidate counts only if it is a directory we can actually list.
/// Any I/O error reads as "does not exist".
fn check_dir(path: &Path) -> std::result::Result<(), String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if !metadata.is_dir() {
        return Err("not a directory".to_string());
    }
    std::fs::read_dir(path).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BillError;
    use tempfile::TempDir;

    #[test]
    fn first_existing_candidate_wins() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        std::fs::create_dir(&first).unwrap();
        std::fs::create_dir(&second).unwrap();

        let resolver = SourceResolver::new([&first, &second].into_iter().collect());
        match resolver.resolve() {
            Resolution::Directory(loc) => assert_eq!(loc.path(), first),
            other => panic!("expected directory, got {:?}", other),
        }
    }

    #[test]
    fn only_second_candidate_exists() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let present = tmp.path().join("present");
        std::fs::create_dir(&present).unwrap();

        let resolver = SourceResolver::new([&missing, &present].into_iter().collect());
        match resolver.resolve() {
            Resolution::Directory(loc) => {
                assert_eq!(loc.path(), present);
                assert_eq!(loc.kind(), SourceKind::LocalAbsolute);
            }
            other => panic!("expected directory, got {:?}", other),
        }
    }

    #[test]
    fn regular_file_is_not_a_source() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("bills");
        std::fs::write(&file, b"not a dir").unwrap();

        let resolver = SourceResolver::new([&file].into_iter().collect());
        assert!(matches!(resolver.resolve(), Resolution::RequiresUpload));
    }

    #[test]
    fn path_under_a_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("bills");
        std::fs::write(&file, b"not a dir").unwrap();
        // Stat fails with ENOTDIR rather than ENOENT.
        let under_file = file.join("sub");
        let second = tmp.path().join("second");
        std::fs::create_dir(&second).unwrap();

        let resolver = SourceResolver::new([&under_file, &second].into_iter().collect());
        match resolver.resolve() {
            Resolution::Directory(loc) => assert_eq!(loc.path(), second),
            other => panic!("expected directory, got {:?}", other),
        }

        let statuses = resolver.statuses();
        assert!(!statuses[0].available);
        assert!(statuses[0].reason.is_some());
        assert!(statuses[1].available);
    }

    #[test]
    fn nothing_exists_requires_upload() {
        let tmp = TempDir::new().unwrap();
        let resolver = SourceResolver::new(
            [tmp.path().join("a"), tmp.path().join("b")]
                .into_iter()
                .collect(),
        );
        assert!(matches!(resolver.resolve(), Resolution::RequiresUpload));
        assert!(matches!(
            SourceResolver::default().resolve(),
            Resolution::RequiresUpload
        ));
    }

    #[test]
    fn relative_candidate_is_cloud_kind() {
        let candidates: Candidates = ["./bills"].into_iter().collect();
        let c = candidates.iter().next().unwrap();
        assert_eq!(c.kind, SourceKind::CloudRelative);
    }

    #[test]
    fn accept_upload_builds_ephemeral_source() {
        let resolver = SourceResolver::default();
        let loc = resolver
            .accept_upload(&[UploadedFile::new("bill1.pdf", b"%PDF".to_vec())])
            .unwrap();
        assert_eq!(loc.kind(), SourceKind::EphemeralUpload);
        assert!(loc.path().join("bill1.pdf").is_file());
    }

    #[test]
    fn accept_empty_upload_is_no_source() {
        let err = SourceResolver::default().accept_upload(&[]).unwrap_err();
        assert!(matches!(err, BillError::SourceNotFound));
    }

    #[test]
    fn statuses_report_every_candidate() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("present");
        std::fs::create_dir(&present).unwrap();
        let resolver =
            SourceResolver::new([present.clone(), tmp.path().join("gone")].into_iter().collect());

        let statuses = resolver.statuses();
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].available);
        assert!(!statuses[1].available);
        assert!(statuses[1].reason.is_some());
    }
}
