//! Caller-supplied publish intent.
//!
//! A [`PackageRequest`] carries everything the pipeline needs for one
//! publish attempt: the desired name and version (authoritative over
//! whatever the uploaded content declares), the source archive or file,
//! and the registry, access, and tag settings. Requests are validated at
//! construction and immutable afterwards.

use crate::error::{RepubError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The default public npm registry.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// The default dist-tag applied when the caller does not choose one.
pub const DEFAULT_DIST_TAG: &str = "latest";

/// Publish access level for the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Publicly readable package.
    #[default]
    Public,
    /// Restricted to the owning organisation.
    Restricted,
}

impl AccessLevel {
    /// The value passed to `npm publish --access`.
    #[must_use]
    pub const fn as_flag(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// A validated, immutable publish request.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    name: String,
    version: Version,
    source_path: Utf8PathBuf,
    registry_url: Url,
    repository_slug: Option<String>,
    access: AccessLevel,
    dist_tag: String,
    dry_run: bool,
    skip_if_exists: bool,
}

impl PackageRequest {
    /// Create a request targeting the default public registry.
    ///
    /// # Errors
    ///
    /// Returns [`RepubError::InvalidRequest`] for an empty name and
    /// [`RepubError::InvalidVersion`] when `version` is not valid semver.
    pub fn new(
        name: impl Into<String>,
        version: &str,
        source_path: impl Into<Utf8PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RepubError::InvalidRequest {
                reason: "package name must not be empty".to_owned(),
            });
        }

        let version = Version::parse(version).map_err(|e| RepubError::InvalidVersion {
            value: version.to_owned(),
            reason: e.to_string(),
        })?;

        let registry_url = parse_registry_url(DEFAULT_REGISTRY)?;

        Ok(Self {
            name,
            version,
            source_path: source_path.into(),
            registry_url,
            repository_slug: None,
            access: AccessLevel::default(),
            dist_tag: DEFAULT_DIST_TAG.to_owned(),
            dry_run: false,
            skip_if_exists: false,
        })
    }

    /// Replace the target registry.
    ///
    /// # Errors
    ///
    /// Returns [`RepubError::InvalidRegistryUrl`] when the URL cannot be
    /// parsed or carries no hostname.
    pub fn with_registry(mut self, registry_url: &str) -> Result<Self> {
        self.registry_url = parse_registry_url(registry_url)?;
        Ok(self)
    }

    /// Attach a GitHub `owner/repo` slug used to derive repository metadata.
    #[must_use]
    pub fn with_repository(mut self, slug: impl Into<String>) -> Self {
        self.repository_slug = Some(slug.into());
        self
    }

    /// Set the publish access level.
    #[must_use]
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    /// Set the dist-tag applied on publish.
    #[must_use]
    pub fn with_dist_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.trim().is_empty() {
            self.dist_tag = tag;
        }
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable the skip-if-exists policy.
    #[must_use]
    pub fn with_skip_if_exists(mut self, skip: bool) -> Self {
        self.skip_if_exists = skip;
        self
    }

    /// The desired package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The desired package version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Path to the uploaded or local archive (or raw file).
    #[must_use]
    pub fn source_path(&self) -> &Utf8Path {
        &self.source_path
    }

    /// The target registry.
    #[must_use]
    pub fn registry_url(&self) -> &Url {
        &self.registry_url
    }

    /// The GitHub `owner/repo` slug, when supplied.
    #[must_use]
    pub fn repository_slug(&self) -> Option<&str> {
        self.repository_slug.as_deref()
    }

    /// The publish access level.
    #[must_use]
    pub fn access(&self) -> AccessLevel {
        self.access
    }

    /// The dist-tag applied on publish.
    #[must_use]
    pub fn dist_tag(&self) -> &str {
        &self.dist_tag
    }

    /// Whether the publish runs in dry-run mode.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether an already-published version is skipped rather than failed.
    #[must_use]
    pub fn skip_if_exists(&self) -> bool {
        self.skip_if_exists
    }
}

/// Parse a registry URL, requiring a hostname.
///
/// The hostname requirement exists because the credential scope binds the
/// auth token to `//<hostname>/` in the generated `.npmrc`.
pub(crate) fn parse_registry_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| RepubError::InvalidRegistryUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(RepubError::InvalidRegistryUrl {
            url: raw.to_owned(),
            reason: "registry URL has no hostname".to_owned(),
        });
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn new_request_applies_defaults() {
        let request = PackageRequest::new("mylib", "1.2.3", "/tmp/mylib.tgz").expect("request");
        assert_eq!(request.name(), "mylib");
        assert_eq!(request.version().to_string(), "1.2.3");
        assert_eq!(request.registry_url().as_str(), DEFAULT_REGISTRY);
        assert_eq!(request.dist_tag(), DEFAULT_DIST_TAG);
        assert_eq!(request.access(), AccessLevel::Public);
        assert!(!request.dry_run());
        assert!(!request.skip_if_exists());
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    fn rejects_blank_name(#[case] name: &str) {
        let result = PackageRequest::new(name, "1.0.0", "/tmp/a.tgz");
        assert!(matches!(result, Err(RepubError::InvalidRequest { .. })));
    }

    #[rstest]
    #[case::word("banana")]
    #[case::partial("1.2")]
    #[case::empty("")]
    fn rejects_invalid_versions(#[case] version: &str) {
        let result = PackageRequest::new("mylib", version, "/tmp/a.tgz");
        assert!(matches!(result, Err(RepubError::InvalidVersion { .. })));
    }

    #[test]
    fn with_registry_rejects_hostless_urls() {
        let request = PackageRequest::new("mylib", "1.0.0", "/tmp/a.tgz").expect("request");
        let result = request.with_registry("file:///var/registry");
        assert!(matches!(result, Err(RepubError::InvalidRegistryUrl { .. })));
    }

    #[test]
    fn with_dist_tag_ignores_blank_tags() {
        let request = PackageRequest::new("mylib", "1.0.0", "/tmp/a.tgz")
            .expect("request")
            .with_dist_tag("");
        assert_eq!(request.dist_tag(), DEFAULT_DIST_TAG);
    }

    #[rstest]
    #[case::public(AccessLevel::Public, "public")]
    #[case::restricted(AccessLevel::Restricted, "restricted")]
    fn access_level_flags(#[case] access: AccessLevel, #[case] expected: &str) {
        assert_eq!(access.as_flag(), expected);
    }
}
