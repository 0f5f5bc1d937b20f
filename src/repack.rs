//! Repackaging of arbitrary inputs into the canonical archive format.
//!
//! Every publish attempt gets its own request-scoped working area. The
//! repackager extracts (or wraps) the input, locates the true package
//! root, reconciles the manifest against the request, and re-archives
//! the result as `package/…` inside a `.tgz`. On any failure the working
//! area is removed before the error propagates; no partial state
//! survives a failed repackage.

use crate::archive::extract::{ArchiveExtractor, TarGzExtractor, ZipExtractor};
use crate::archive::inspect::{ArchiveKind, peek_manifest};
use crate::archive::pack::{ARCHIVE_TOP_LEVEL, create_package_archive};
use crate::error::{RepubError, Result};
use crate::manifest::{ManifestTarget, locate_package_root, reconcile};
use crate::request::PackageRequest;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

/// Raw inputs larger than this are not embedded into a synthesized
/// package; the archive then carries only the generated manifest.
pub const RAW_FILE_LIMIT: u64 = 1024 * 1024;

/// A canonical `.tgz` ready for `npm publish`.
///
/// The archive lives in its own temporary directory and is removed when
/// the value is dropped, so it cannot outlive the publish attempt that
/// owns it.
#[derive(Debug)]
pub struct CanonicalArchive {
    _dir: TempDir,
    path: Utf8PathBuf,
}

impl CanonicalArchive {
    /// Path to the archive file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Repackage the request's source into a [`CanonicalArchive`].
///
/// Tarball inputs that are already in the canonical layout and whose
/// manifest matches the requested name and version are copied through
/// unchanged. Everything else is extracted (or wrapped), reconciled, and
/// re-archived under a single `package` top-level entry.
///
/// # Errors
///
/// Returns [`RepubError::SourceNotFound`] when the source path does not
/// exist, [`RepubError::Extraction`] when a zip input cannot be
/// extracted, and manifest or I/O errors from the reconciliation and
/// archiving steps. The request-scoped working directory is removed
/// before any error is returned.
pub fn repackage(request: &PackageRequest) -> Result<CanonicalArchive> {
    let source = request.source_path();
    if !source.exists() {
        return Err(RepubError::SourceNotFound {
            path: source.to_owned(),
        });
    }

    let output_dir = TempDir::new().map_err(workdir_error)?;
    let archive_name = format!("{}-{}.tgz", request.name(), request.version());
    let output_path = utf8_path(output_dir.path())?.join(archive_name);

    // Dropped on every exit path, including errors, which removes the
    // whole request-scoped working tree.
    let workdir = TempDir::new().map_err(workdir_error)?;

    let target = ManifestTarget {
        name: request.name(),
        version: request.version(),
        registry_url: request.registry_url(),
        repository_slug: request.repository_slug(),
    };

    match ArchiveKind::classify(source) {
        ArchiveKind::Tarball => {
            repackage_tarball(source, &workdir, &target, &output_path)?;
        }
        ArchiveKind::Zip => {
            repackage_zip(source, &workdir, &target, &output_path)?;
        }
        ArchiveKind::Other => {
            repackage_raw(source, &workdir, &target, &output_path)?;
        }
    }

    Ok(CanonicalArchive {
        _dir: output_dir,
        path: output_path,
    })
}

/// Tarball path: shortcut when already canonical and matching, otherwise
/// extract, reconcile, and re-archive.
fn repackage_tarball(
    source: &Utf8Path,
    workdir: &TempDir,
    target: &ManifestTarget<'_>,
    output_path: &Utf8Path,
) -> Result<()> {
    if let Some(manifest) = peek_manifest(source) {
        let name_matches = manifest.get("name") == Some(&json!(target.name));
        let version_matches = manifest.get("version") == Some(&json!(target.version.to_string()));
        if name_matches && version_matches {
            // Already canonical with the right identity; pass the bytes
            // through untouched.
            fs::copy(source, output_path)?;
            return Ok(());
        }
    }

    let extracted = workdir.path().join("extracted");
    fs::create_dir_all(&extracted)?;

    // A tarball that fails to extract still gets a package synthesized
    // from whatever did land in the extraction directory.
    if let Err(e) = TarGzExtractor.extract(source.as_std_path(), &extracted) {
        log::warn!("tarball extraction failed, synthesizing package: {e}");
    }

    let package_root = locate_package_root(&extracted);
    reconcile(&package_root, target)?;
    create_package_archive(&package_root, output_path.as_std_path())?;
    Ok(())
}

/// Zip path: always extract; extraction failure is fatal.
fn repackage_zip(
    source: &Utf8Path,
    workdir: &TempDir,
    target: &ManifestTarget<'_>,
    output_path: &Utf8Path,
) -> Result<()> {
    let extracted = workdir.path().join("extracted");
    fs::create_dir_all(&extracted)?;

    ZipExtractor.extract(source.as_std_path(), &extracted)?;

    let package_root = locate_package_root(&extracted);
    reconcile(&package_root, target)?;
    create_package_archive(&package_root, output_path.as_std_path())?;
    Ok(())
}

/// Raw path: wrap the file in a fresh package, embedding it only when it
/// is smaller than [`RAW_FILE_LIMIT`].
fn repackage_raw(
    source: &Utf8Path,
    workdir: &TempDir,
    target: &ManifestTarget<'_>,
    output_path: &Utf8Path,
) -> Result<()> {
    let package_root = workdir.path().join(ARCHIVE_TOP_LEVEL);
    fs::create_dir_all(&package_root)?;

    let size = fs::metadata(source.as_std_path())?.len();
    if size < RAW_FILE_LIMIT {
        if let Some(file_name) = source.file_name() {
            fs::copy(source, package_root.join(file_name))?;
        }
    } else {
        // Large unknown files are intentionally dropped rather than
        // embedded; the archive then carries only the manifest.
        log::warn!(
            "raw input {source} is {size} bytes (>= {RAW_FILE_LIMIT}); not embedding it in the package"
        );
    }

    reconcile(&package_root, target)?;
    create_package_archive(&package_root, output_path.as_std_path())?;
    Ok(())
}

fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| RepubError::Workdir {
        reason: format!("temporary path is not valid UTF-8: {}", p.display()),
    })
}

fn workdir_error(e: std::io::Error) -> RepubError {
    RepubError::Workdir {
        reason: format!("failed to create temporary directory: {e}"),
    }
}

#[cfg(test)]
#[path = "repack_tests.rs"]
mod tests;
