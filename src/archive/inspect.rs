//! Archive classification and structural verification.
//!
//! Classification is by file extension only; structural verification
//! extracts to a scratch directory and checks for the single top-level
//! directory containing `package.json` that npm produces. A malformed
//! archive is never an error here, only a `false`.

use crate::archive::extract::{ArchiveExtractor, TarGzExtractor};
use crate::manifest::{MANIFEST_FILE, ManifestDocument, read_manifest};
use camino::Utf8Path;
use std::fs;
use std::path::{Path, PathBuf};

/// The kind of input file, as judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A gzip-compressed tarball (`.tgz` or `.tar.gz`).
    Tarball,
    /// A zip archive (`.zip`).
    Zip,
    /// Anything else; treated as raw content for a new package.
    Other,
}

impl ArchiveKind {
    /// Classify `path` by its extension.
    #[must_use]
    pub fn classify(path: &Utf8Path) -> Self {
        let name = path.file_name().unwrap_or_default().to_ascii_lowercase();
        if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Self::Tarball
        } else if name.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Other
        }
    }
}

/// Check whether a tarball follows the canonical npm layout: a single
/// top-level directory containing a manifest file.
///
/// Extracts to a scratch location that is removed before returning,
/// regardless of outcome. A failed extraction is reported as `false`,
/// never as an error.
#[must_use]
pub fn verify_package_structure(archive_path: &Utf8Path) -> bool {
    peek_manifest(archive_path).is_some()
}

/// Read the manifest out of a structurally valid tarball.
///
/// Returns `None` when the archive cannot be extracted, does not have a
/// single top-level directory, that directory lacks a manifest, or the
/// manifest cannot be parsed. The scratch extraction directory is always
/// removed.
#[must_use]
pub fn peek_manifest(archive_path: &Utf8Path) -> Option<ManifestDocument> {
    let scratch = tempfile::tempdir().ok()?;

    TarGzExtractor
        .extract(archive_path.as_std_path(), scratch.path())
        .ok()?;

    let top_level = sole_top_level_directory(scratch.path())?;
    if !top_level.join(MANIFEST_FILE).is_file() {
        return None;
    }

    read_manifest(&top_level).ok().flatten()
}

/// Return the single top-level directory of `dir`, or `None` when the
/// layout differs.
fn sole_top_level_directory(dir: &Path) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();

    match entries.as_slice() {
        [single] if single.is_dir() => Some(single.clone()),
        _ => None,
    }
}
