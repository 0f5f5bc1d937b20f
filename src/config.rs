//! Publish configuration file loading.
//!
//! The configuration is a JSON document listing the packages to publish,
//! the npm auth token, and run-wide options. String values may embed
//! `${VAR}` placeholders which are substituted from the environment
//! before deserialisation; unknown variables are left as written so the
//! error surfaces at the point of use rather than silently becoming
//! empty strings.

use crate::error::{RepubError, Result};
use crate::request::{AccessLevel, PackageRequest};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

/// A parsed publish configuration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishConfig {
    /// Packages to publish, in order.
    pub packages: Vec<PackageEntry>,
    /// Registry authentication material.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Run-wide publish options.
    #[serde(default)]
    pub options: PublishOptions,
}

/// One package to publish.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    /// Package name on the registry.
    pub name: String,
    /// Version string, validated as semver when the request is built.
    pub version: String,
    /// Path to the source archive or file.
    pub path: Utf8PathBuf,
    /// Target registry URL; the public npm registry when absent.
    #[serde(default)]
    pub registry: Option<String>,
    /// GitHub `owner/repo` slug for repository metadata.
    #[serde(default)]
    pub repository: Option<String>,
    /// Publish access level; public when absent.
    #[serde(default)]
    pub access: Option<AccessLevel>,
    /// Dist-tag; `latest` when absent.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Authentication section.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// npm registry credentials.
    #[serde(default)]
    pub npm: NpmAuth,
}

/// npm credentials.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmAuth {
    /// Auth token written into the ephemeral `.npmrc`.
    #[serde(default)]
    pub token: Option<String>,
}

/// Run-wide options applied to every package in the run.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOptions {
    /// Pass `--dry-run` to every publish.
    #[serde(default)]
    pub dry_run: bool,
    /// Treat already-published versions as skips rather than failures.
    #[serde(default)]
    pub skip_existing: bool,
}

impl PublishConfig {
    /// Load and substitute a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RepubError::InvalidRequest`] when the file cannot be
    /// read, is not valid JSON, does not match the expected shape, or
    /// lists no packages.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| RepubError::InvalidRequest {
            reason: format!("cannot read configuration {path}: {e}"),
        })?;

        let mut document: Value =
            serde_json::from_str(&contents).map_err(|e| RepubError::InvalidRequest {
                reason: format!("configuration {path} is not valid JSON: {e}"),
            })?;
        substitute_env_vars(&mut document, &|name| std::env::var(name).ok());

        let config: Self =
            serde_json::from_value(document).map_err(|e| RepubError::InvalidRequest {
                reason: format!("configuration {path} is malformed: {e}"),
            })?;

        if config.packages.is_empty() {
            return Err(RepubError::InvalidRequest {
                reason: format!("configuration {path} lists no packages"),
            });
        }

        Ok(config)
    }

    /// The configured npm token, when present and non-blank.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.auth
            .npm
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Build validated publish requests for every configured package.
    ///
    /// # Errors
    ///
    /// Returns the first validation error among the entries.
    pub fn requests(&self) -> Result<Vec<PackageRequest>> {
        self.packages
            .iter()
            .map(|entry| entry.to_request(self.options))
            .collect()
    }
}

impl PackageEntry {
    fn to_request(&self, options: PublishOptions) -> Result<PackageRequest> {
        let mut request =
            PackageRequest::new(self.name.clone(), &self.version, self.path.clone())?;

        if let Some(registry) = &self.registry {
            request = request.with_registry(registry)?;
        }
        if let Some(repository) = &self.repository {
            request = request.with_repository(repository.clone());
        }
        if let Some(access) = self.access {
            request = request.with_access(access);
        }
        if let Some(tag) = &self.tag {
            request = request.with_dist_tag(tag.clone());
        }

        Ok(request
            .with_dry_run(options.dry_run)
            .with_skip_if_exists(options.skip_existing))
    }
}

/// Replace `${VAR}` placeholders throughout a JSON document.
///
/// Substitution walks every string value, including object keys' values
/// inside arrays and nested objects. A placeholder whose variable is
/// absent is left untouched.
fn substitute_env_vars(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => *s = substitute_in_str(s, lookup),
        Value::Array(items) => {
            for item in items {
                substitute_env_vars(item, lookup);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_env_vars(item, lookup);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn substitute_in_str(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let after_marker = &rest[start + 2..];
        let Some(end) = after_marker.find('}') else {
            break;
        };

        output.push_str(&rest[..start]);
        let name = &after_marker[..end];
        match lookup(name) {
            Some(replacement) => output.push_str(&replacement),
            None => {
                output.push_str("${");
                output.push_str(name);
                output.push('}');
            }
        }
        rest = &after_marker[end + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    fn load(contents: &str) -> Result<PublishConfig> {
        let file = write_config(contents);
        let path = Utf8PathBuf::from(file.path().to_string_lossy().into_owned());
        PublishConfig::load(&path)
    }

    const FULL_CONFIG: &str = r#"{
        "packages": [
            {
                "name": "mylib",
                "version": "2.0.0",
                "path": "/tmp/mylib.tgz",
                "registry": "https://reg.example/",
                "repository": "acme/mylib",
                "access": "restricted",
                "tag": "beta"
            }
        ],
        "auth": { "npm": { "token": "tok123" } },
        "options": { "dryRun": true, "skipExisting": true }
    }"#;

    #[test]
    fn full_config_round_trips_into_a_request() {
        let config = load(FULL_CONFIG).expect("config");
        assert_eq!(config.token(), Some("tok123"));

        let requests = config.requests().expect("requests");
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.name(), "mylib");
        assert_eq!(request.version().to_string(), "2.0.0");
        assert_eq!(request.registry_url().as_str(), "https://reg.example/");
        assert_eq!(request.repository_slug(), Some("acme/mylib"));
        assert_eq!(request.access(), AccessLevel::Restricted);
        assert_eq!(request.dist_tag(), "beta");
        assert!(request.dry_run());
        assert!(request.skip_if_exists());
    }

    #[test]
    fn minimal_entry_gets_defaults() {
        let config = load(
            r#"{"packages": [{"name": "a", "version": "1.0.0", "path": "/tmp/a.tgz"}]}"#,
        )
        .expect("config");

        assert_eq!(config.token(), None);
        let requests = config.requests().expect("requests");
        assert_eq!(requests[0].dist_tag(), "latest");
        assert_eq!(requests[0].access(), AccessLevel::Public);
        assert!(!requests[0].dry_run());
    }

    #[rstest]
    #[case::no_packages(r#"{"packages": []}"#)]
    #[case::not_json("{packages")]
    #[case::wrong_shape(r#"{"packages": [{"name": "a"}]}"#)]
    fn rejects_malformed_configurations(#[case] contents: &str) {
        let result = load(contents);
        assert!(matches!(result, Err(RepubError::InvalidRequest { .. })));
    }

    #[test]
    fn invalid_version_in_entry_surfaces_on_request_build() {
        let config = load(
            r#"{"packages": [{"name": "a", "version": "nope", "path": "/tmp/a.tgz"}]}"#,
        )
        .expect("config");
        let result = config.requests();
        assert!(matches!(result, Err(RepubError::InvalidVersion { .. })));
    }

    #[rstest]
    #[case::known("${NPM_TOKEN}", "tok-from-env")]
    #[case::embedded("prefix-${NPM_TOKEN}-suffix", "prefix-tok-from-env-suffix")]
    #[case::unknown("${NOT_SET}", "${NOT_SET}")]
    #[case::unterminated("${NPM_TOKEN", "${NPM_TOKEN")]
    #[case::plain("no placeholders", "no placeholders")]
    fn env_substitution_cases(#[case] input: &str, #[case] expected: &str) {
        let lookup = |name: &str| {
            (name == "NPM_TOKEN").then(|| "tok-from-env".to_owned())
        };
        assert_eq!(substitute_in_str(input, &lookup), expected);
    }

    #[test]
    fn substitution_reaches_nested_values() {
        let mut document: Value = serde_json::from_str(
            r#"{"auth": {"npm": {"token": "${NPM_TOKEN}"}}, "tags": ["${NPM_TOKEN}"]}"#,
        )
        .expect("json");

        let lookup = |name: &str| (name == "NPM_TOKEN").then(|| "tok".to_owned());
        substitute_env_vars(&mut document, &lookup);

        assert_eq!(document["auth"]["npm"]["token"], "tok");
        assert_eq!(document["tags"][0], "tok");
    }
}
