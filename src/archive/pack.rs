//! Canonical archive creation.
//!
//! npm expects a gzip-compressed tarball whose sole top-level entry is a
//! directory literally named `package`. Every repackaged upload is
//! written in that layout, at maximum compression, regardless of how the
//! input arrived.

use std::fs;
use std::io;
use std::path::Path;

/// The top-level directory name inside every canonical archive.
pub const ARCHIVE_TOP_LEVEL: &str = "package";

/// Create a canonical `.tgz` at `output_path` from the contents of
/// `source_dir`.
///
/// The directory's contents are placed under a single
/// [`ARCHIVE_TOP_LEVEL`] entry. Compression is `Compression::best()` to
/// match the registry's conventional upload format.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the output cannot be
/// written.
pub fn create_package_archive(source_dir: &Path, output_path: &Path) -> io::Result<()> {
    let output = fs::File::create(output_path)?;
    let encoder = flate2::write::GzEncoder::new(output, flate2::Compression::best());
    let mut builder = tar::Builder::new(encoder);

    builder.append_dir_all(ARCHIVE_TOP_LEVEL, source_dir)?;

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}
