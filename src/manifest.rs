//! `package.json` reconciliation and package-root location.
//!
//! The reconciler guarantees that, whatever the uploaded content
//! declared, the manifest that ends up in the canonical archive carries
//! the requested name and version, points `publishConfig.registry` at the
//! target registry, and (when a repository slug is supplied) a consistent
//! repository/bugs/homepage block. Reconciliation is idempotent: applying
//! it twice with the same inputs yields the same field values.

use crate::error::{RepubError, Result};
use camino::Utf8PathBuf;
use semver::Version;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// The manifest file name npm looks for.
pub const MANIFEST_FILE: &str = "package.json";

/// A parsed `package.json` document.
pub type ManifestDocument = Map<String, Value>;

/// The authoritative values a reconciled manifest must carry.
#[derive(Debug, Clone, Copy)]
pub struct ManifestTarget<'a> {
    /// Desired package name.
    pub name: &'a str,
    /// Desired package version.
    pub version: &'a Version,
    /// Target registry for `publishConfig.registry`.
    pub registry_url: &'a Url,
    /// Optional GitHub `owner/repo` slug.
    pub repository_slug: Option<&'a str>,
}

/// Read and parse the manifest in `package_root`, if one exists.
///
/// # Errors
///
/// Returns [`RepubError::Manifest`] when the file exists but is not a
/// JSON object, and [`RepubError::Io`] on read failures.
pub fn read_manifest(package_root: &Path) -> Result<Option<ManifestDocument>> {
    let path = package_root.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)?;
    let value: Value =
        serde_json::from_str(&contents).map_err(|e| manifest_error(&path, e.to_string()))?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        other => Err(manifest_error(
            &path,
            format!("expected a JSON object, found {other}"),
        )),
    }
}

/// Ensure `package_root` carries a manifest matching `target`.
///
/// A missing manifest is synthesized; an existing one has its name and
/// version overwritten unconditionally, its `publishConfig.registry`
/// set, and its repository block replaced when a slug is supplied. The
/// file is rewritten in place as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`RepubError::Manifest`] when the existing manifest cannot be
/// parsed or when, after reconciliation, the required fields are still
/// absent (an invariant violation), and [`RepubError::Io`] on
/// filesystem failures.
pub fn reconcile(package_root: &Path, target: &ManifestTarget<'_>) -> Result<()> {
    let mut document = match read_manifest(package_root)? {
        Some(existing) => {
            let mut doc = existing;
            apply_target(&mut doc, target);
            doc
        }
        None => synthesize(target),
    };

    // The target always injects both fields; their absence here means the
    // document was corrupted between apply and write.
    if !document.contains_key("name") || !document.contains_key("version") {
        let path = package_root.join(MANIFEST_FILE);
        return Err(manifest_error(
            &path,
            "manifest is missing name or version after reconciliation".to_owned(),
        ));
    }

    write_manifest(package_root, &document)?;
    Ok(())
}

/// Build a minimal manifest for content that arrived without one.
#[must_use]
pub fn synthesize(target: &ManifestTarget<'_>) -> ManifestDocument {
    let mut document = ManifestDocument::new();
    document.insert("name".to_owned(), json!(target.name));
    document.insert("version".to_owned(), json!(target.version.to_string()));
    document.insert(
        "description".to_owned(),
        json!(format!("Auto-published package - {}", target.name)),
    );
    document.insert("main".to_owned(), json!("index.js"));
    document.insert(
        "scripts".to_owned(),
        json!({ "test": "echo \"Error: no test specified\" && exit 1" }),
    );
    document.insert("keywords".to_owned(), json!([]));
    document.insert("author".to_owned(), json!(""));
    document.insert("license".to_owned(), json!("MIT"));
    document.insert(
        "publishConfig".to_owned(),
        json!({ "registry": target.registry_url.as_str() }),
    );

    if let Some(slug) = target.repository_slug {
        apply_repository(&mut document, slug);
    }

    document
}

/// Overwrite the authoritative fields of an existing manifest.
fn apply_target(document: &mut ManifestDocument, target: &ManifestTarget<'_>) {
    document.insert("name".to_owned(), json!(target.name));
    document.insert("version".to_owned(), json!(target.version.to_string()));

    let publish_config = document
        .entry("publishConfig".to_owned())
        .or_insert_with(|| json!({}));
    if let Value::Object(config) = publish_config {
        config.insert("registry".to_owned(), json!(target.registry_url.as_str()));
    } else {
        *publish_config = json!({ "registry": target.registry_url.as_str() });
    }

    if let Some(slug) = target.repository_slug {
        apply_repository(document, slug);
    }
}

/// Write the repository/bugs/homepage block derived from a GitHub slug.
fn apply_repository(document: &mut ManifestDocument, slug: &str) {
    document.insert(
        "repository".to_owned(),
        json!({
            "type": "git",
            "url": format!("git+https://github.com/{slug}.git"),
        }),
    );
    document.insert(
        "bugs".to_owned(),
        json!({ "url": format!("https://github.com/{slug}/issues") }),
    );
    document.insert(
        "homepage".to_owned(),
        json!(format!("https://github.com/{slug}#readme")),
    );
}

/// Rewrite the manifest file in `package_root`.
fn write_manifest(package_root: &Path, document: &ManifestDocument) -> Result<()> {
    let path = package_root.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| manifest_error(&path, e.to_string()))?;
    fs::write(&path, json)?;
    Ok(())
}

/// Locate the true package root beneath an extraction directory.
///
/// Performs a breadth-first search, at most two directory levels deep,
/// visiting children in lexicographic order so the result is stable
/// across runs. Returns the first directory containing a manifest file,
/// falling back to `extraction_root` itself when none is found.
#[must_use]
pub fn locate_package_root(extraction_root: &Path) -> PathBuf {
    let mut frontier = vec![extraction_root.to_path_buf()];

    for _depth in 0..2 {
        let mut next = Vec::new();
        for dir in &frontier {
            let mut children = subdirectories(dir);
            children.sort();
            for child in children {
                if child.join(MANIFEST_FILE).is_file() {
                    return child;
                }
                next.push(child);
            }
        }
        frontier = next;
    }

    extraction_root.to_path_buf()
}

/// List the immediate subdirectories of `dir`, ignoring read errors.
fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

/// Build a [`RepubError::Manifest`] for `path`.
fn manifest_error(path: &Path, reason: String) -> RepubError {
    RepubError::Manifest {
        path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
        reason,
    }
}
