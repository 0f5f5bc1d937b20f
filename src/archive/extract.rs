//! Archive extraction for uploaded package files.
//!
//! Extracts `.tgz`/`.tar.gz` and `.zip` archives to a target directory
//! with path traversal protection to prevent zip-slip attacks.

use std::path::{Component, Path};

/// Trait for extracting package archives, enabling test mocking.
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the list of file names that were extracted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts
    /// to escape the destination directory, [`ExtractionError::Malformed`]
    /// when the archive cannot be decoded, and [`ExtractionError::Io`]
    /// on I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive could not be decoded.
    #[error("malformed archive: {reason}")]
    Malformed {
        /// Description of the decode failure.
        reason: String,
    },
}

/// Extractor for gzip-compressed tarballs using `flate2` and `tar`.
///
/// Validates each entry path before extraction to guard against path
/// traversal attacks (zip-slip).
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        let mut extracted = Vec::new();

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_path = entry.path()?.into_owned();

            validate_entry_path(&entry_path)?;

            let dest_path = dest_dir.join(&entry_path);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            entry.unpack(&dest_path)?;

            if let Some(name) = entry_path.file_name() {
                extracted.push(name.to_string_lossy().into_owned());
            }
        }

        Ok(extracted)
    }
}

/// Extractor for zip archives using the `zip` crate.
///
/// Relies on `ZipFile::enclosed_name` to reject entries that would land
/// outside the destination directory.
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractionError::Malformed {
            reason: e.to_string(),
        })?;
        let mut extracted = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ExtractionError::Malformed {
                    reason: e.to_string(),
                })?;

            let Some(entry_path) = entry.enclosed_name() else {
                return Err(ExtractionError::PathTraversal {
                    path: entry.name().to_owned(),
                });
            };

            let dest_path = dest_dir.join(&entry_path);
            if entry.is_dir() {
                std::fs::create_dir_all(&dest_path)?;
                continue;
            }

            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut output = std::fs::File::create(&dest_path)?;
            std::io::copy(&mut entry, &mut output)?;

            if let Some(name) = entry_path.file_name() {
                extracted.push(name.to_string_lossy().into_owned());
            }
        }

        Ok(extracted)
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_tgz(archive_path: &Path, entries: &[(&str, &[u8])]) {
        let output = std::fs::File::create(archive_path).expect("create archive");
        let encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *contents)
                .expect("append");
        }
        let encoder = builder.into_inner().expect("tar finish");
        encoder.finish().expect("gzip finish");
    }

    #[test]
    fn extracts_tgz_entries() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("test.tgz");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        write_tgz(&archive_path, &[("package/index.js", b"module.exports = 1;")]);

        let files = TarGzExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        assert_eq!(files, vec!["index.js"]);
        assert!(dest_dir.join("package/index.js").exists());
    }

    #[test]
    fn extracts_zip_entries() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("test.zip");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        let file = std::fs::File::create(&archive_path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("mylib/package.json", zip::write::SimpleFileOptions::default())
            .expect("start file");
        writer.write_all(b"{\"name\":\"old\"}").expect("write entry");
        writer.finish().expect("finish zip");

        let files = ZipExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        assert_eq!(files, vec!["package.json"]);
        assert!(dest_dir.join("mylib/package.json").exists());
    }

    #[test]
    fn malformed_tgz_reports_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("broken.tgz");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");
        std::fs::write(&archive_path, b"this is not a gzip stream").expect("write");

        let result = TarGzExtractor.extract(&archive_path, &dest_dir);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_zip_reports_malformed() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("broken.zip");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");
        std::fs::write(&archive_path, b"not a zip").expect("write");

        let result = ZipExtractor.extract(&archive_path, &dest_dir);
        assert!(matches!(result, Err(ExtractionError::Malformed { .. })));
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let path = PathBuf::from(bad_path);
        let result = validate_entry_path(&path);
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        let path = PathBuf::from("package/lib/index.js");
        assert!(validate_entry_path(&path).is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let path = PathBuf::from("/etc/passwd");
        let result = validate_entry_path(&path);
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }
}
