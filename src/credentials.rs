//! Ephemeral, per-call npm credential scopes.
//!
//! Each publish invocation gets its own freshly created temporary
//! directory holding a one-line `.npmrc` that binds the registry's
//! hostname to the bearer token. The file is surfaced to the wrapped
//! operation as per-call environment overrides only; neither the process
//! environment nor any shared path is ever touched, so concurrent
//! publishes with different tokens cannot observe each other's auth
//! material. The directory is removed after the wrapped call returns,
//! whatever the outcome.

use crate::error::{RepubError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;
use url::Url;

/// Name of the npm environment variable pointing at the user config file.
pub const USERCONFIG_ENV: &str = "npm_config_userconfig";

/// Name of the npm environment variable forcing the registry URL.
pub const REGISTRY_ENV: &str = "npm_config_registry";

/// The materialized credential scope handed to the wrapped operation.
#[derive(Debug)]
pub struct CredentialEnv {
    auth_file: Utf8PathBuf,
    vars: Vec<(String, String)>,
}

impl CredentialEnv {
    /// Path to the ephemeral `.npmrc`.
    #[must_use]
    pub fn auth_file(&self) -> &Utf8Path {
        &self.auth_file
    }

    /// Environment overrides for the single wrapped invocation.
    #[must_use]
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }
}

/// Run `operation` with an ephemeral auth file scoped to `registry_url`.
///
/// The auth file contains the single scoped-auth line
/// `//<hostname>/:_authToken=<token>`. Cleanup of the temporary
/// directory is guaranteed: explicitly on return, and through `Drop`
/// should the operation panic. A cleanup failure is logged, never
/// surfaced.
///
/// # Errors
///
/// Returns [`RepubError::InvalidRegistryUrl`] when the registry URL has
/// no hostname, and [`RepubError::Workdir`] or [`RepubError::Io`] when
/// the auth file cannot be materialized.
pub fn with_credential<T>(
    registry_url: &Url,
    token: &str,
    operation: impl FnOnce(&CredentialEnv) -> T,
) -> Result<T> {
    let host = registry_url
        .host_str()
        .ok_or_else(|| RepubError::InvalidRegistryUrl {
            url: registry_url.to_string(),
            reason: "registry URL has no hostname".to_owned(),
        })?;

    let scope_dir = TempDir::new().map_err(|e| RepubError::Workdir {
        reason: format!("failed to create credential directory: {e}"),
    })?;

    let auth_file = scope_dir.path().join(".npmrc");
    fs::write(&auth_file, format!("//{host}/:_authToken={token}\n"))?;

    let env = CredentialEnv {
        auth_file: Utf8PathBuf::from(auth_file.to_string_lossy().into_owned()),
        vars: vec![
            (
                USERCONFIG_ENV.to_owned(),
                auth_file.to_string_lossy().into_owned(),
            ),
            (REGISTRY_ENV.to_owned(), registry_url.to_string()),
        ],
    };

    let result = operation(&env);

    if let Err(e) = scope_dir.close() {
        log::warn!("failed to remove credential directory: {e}");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry(raw: &str) -> Url {
        Url::parse(raw).expect("registry url")
    }

    #[test]
    fn auth_file_carries_the_scoped_token_line() {
        let url = registry("https://reg.example/");
        let contents = with_credential(&url, "sekrit-token", |env| {
            fs::read_to_string(env.auth_file()).expect("read auth file")
        })
        .expect("scope");

        assert_eq!(contents, "//reg.example/:_authToken=sekrit-token\n");
    }

    #[test]
    fn environment_overrides_point_at_the_scope() {
        let url = registry("https://reg.example/");
        with_credential(&url, "tok", |env| {
            let vars: std::collections::HashMap<_, _> = env
                .vars()
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            assert_eq!(
                vars.get(USERCONFIG_ENV).copied(),
                Some(env.auth_file().as_str())
            );
            assert_eq!(vars.get(REGISTRY_ENV).copied(), Some("https://reg.example/"));
        })
        .expect("scope");
    }

    #[test]
    fn scope_directory_is_removed_on_return() {
        let url = registry("https://reg.example/");
        let auth_path = with_credential(&url, "tok", |env| {
            PathBuf::from(env.auth_file().as_std_path())
        })
        .expect("scope");

        assert!(!auth_path.exists());
        assert!(!auth_path.parent().expect("parent").exists());
    }

    #[test]
    fn scope_directory_is_removed_when_operation_panics() {
        let url = registry("https://reg.example/");
        let captured = std::sync::Mutex::new(None::<PathBuf>);

        let outcome = std::panic::catch_unwind(|| {
            let _ = with_credential(&url, "tok", |env| {
                *captured.lock().expect("lock") =
                    Some(PathBuf::from(env.auth_file().as_std_path()));
                panic!("publish exploded");
            });
        });

        assert!(outcome.is_err());
        let auth_path = captured
            .into_inner()
            .expect("lock")
            .expect("path captured");
        assert!(!auth_path.exists(), "tempdir Drop must remove the scope");
    }

    #[test]
    fn concurrent_scopes_never_share_auth_material() {
        let url_a = registry("https://reg-a.example/");
        let url_b = registry("https://reg-b.example/");

        let handle_a = std::thread::spawn(move || {
            with_credential(&url_a, "token-alpha", |env| {
                fs::read_to_string(env.auth_file()).expect("read a")
            })
            .expect("scope a")
        });
        let handle_b = std::thread::spawn(move || {
            with_credential(&url_b, "token-beta", |env| {
                fs::read_to_string(env.auth_file()).expect("read b")
            })
            .expect("scope b")
        });

        let contents_a = handle_a.join().expect("join a");
        let contents_b = handle_b.join().expect("join b");

        assert!(contents_a.contains("token-alpha"));
        assert!(!contents_a.contains("token-beta"));
        assert!(contents_b.contains("token-beta"));
        assert!(!contents_b.contains("token-alpha"));
    }

    #[test]
    fn hostless_registry_is_rejected() {
        let url = registry("file:///srv/registry");
        let result = with_credential(&url, "tok", |_| ());
        assert!(matches!(result, Err(RepubError::InvalidRegistryUrl { .. })));
    }
}
