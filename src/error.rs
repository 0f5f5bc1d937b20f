//! Error types for the repub publish pipeline.
//!
//! This module defines semantic error variants for failures that abort a
//! publish attempt. Failures of the `npm publish` invocation itself are
//! never surfaced through these types; they are classified into a
//! [`crate::publish::PublishResult`] instead, so callers only handle
//! errors around request validation and repackaging.

use crate::archive::extract::ExtractionError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur before or during repackaging.
#[derive(Debug, Error)]
pub enum RepubError {
    /// A required request field is missing or malformed.
    #[error("invalid package request: {reason}")]
    InvalidRequest {
        /// Description of the invalid field.
        reason: String,
    },

    /// The requested version is not a valid semantic version.
    #[error("invalid version {value:?}: {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// The semver parse error text.
        reason: String,
    },

    /// No registry token was supplied.
    #[error("npm token not configured; set NPM_TOKEN or provide auth.npm.token")]
    MissingToken,

    /// The registry URL could not be parsed or carries no hostname.
    #[error("invalid registry URL {url:?}: {reason}")]
    InvalidRegistryUrl {
        /// The rejected URL string.
        url: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// The package source path does not exist.
    #[error("package source not found: {path}")]
    SourceNotFound {
        /// Path supplied by the request.
        path: Utf8PathBuf,
    },

    /// Archive extraction failed where recovery is not possible.
    #[error("archive extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// A manifest could not be read, written, or left reconciled.
    #[error("invalid manifest at {path}: {reason}")]
    Manifest {
        /// Path to the offending `package.json`.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The request-scoped working area could not be set up.
    #[error("working directory error: {reason}")]
    Workdir {
        /// Description of the failure.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`RepubError`].
pub type Result<T> = std::result::Result<T, RepubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_names_the_env_var() {
        let msg = RepubError::MissingToken.to_string();
        assert!(msg.contains("NPM_TOKEN"));
    }

    #[test]
    fn invalid_registry_url_includes_url_and_reason() {
        let err = RepubError::InvalidRegistryUrl {
            url: "not a url".to_owned(),
            reason: "relative URL without a base".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not a url"));
        assert!(msg.contains("relative URL"));
    }

    #[test]
    fn manifest_error_includes_path() {
        let err = RepubError::Manifest {
            path: Utf8PathBuf::from("/tmp/pkg/package.json"),
            reason: "missing name field".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("package.json"));
        assert!(msg.contains("missing name field"));
    }
}
