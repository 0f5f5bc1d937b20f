//! `npm publish` invocation and outcome classification.
//!
//! The invoker wraps the publish command in a credential scope, runs it
//! through a [`CommandExecutor`], and folds every outcome into a
//! [`PublishResult`]. A failed publish is never an error to the caller;
//! only request validation and repackaging can fail with a
//! [`crate::error::RepubError`].

use crate::credentials::with_credential;
use crate::error::{RepubError, Result};
use crate::request::PackageRequest;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::process::{Command, Output};

/// Abstraction for running external commands with per-call environment
/// overrides.
pub trait CommandExecutor {
    /// Runs a command with arguments and environment overrides, returning
    /// the captured output.
    ///
    /// The overrides apply to the spawned process only; the calling
    /// process environment is never mutated.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command.
    fn run(&self, cmd: &str, args: &[&str], envs: &[(String, String)]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], envs: &[(String, String)]) -> Result<Output> {
        Command::new(cmd)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(RepubError::from)
    }
}

/// Outcome record for one publish attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    /// Whether the attempt counts as successful (including skips).
    pub succeeded: bool,
    /// Whether the publish was skipped because the version already exists.
    pub skipped: bool,
    /// Human-readable outcome text.
    pub message: String,
    /// The registry the attempt targeted.
    pub registry_url: String,
    /// Captured standard output of a successful publish, trimmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl PublishResult {
    fn success(request: &PackageRequest, raw_output: String) -> Self {
        Self {
            succeeded: true,
            skipped: false,
            message: format!(
                "published {}@{} successfully",
                request.name(),
                request.version()
            ),
            registry_url: request.registry_url().to_string(),
            raw_output: Some(raw_output),
        }
    }

    /// A skip outcome for a version that is already published.
    #[must_use]
    pub fn skip(request: &PackageRequest) -> Self {
        Self {
            succeeded: true,
            skipped: true,
            message: format!(
                "version {}@{} already exists, publish skipped",
                request.name(),
                request.version()
            ),
            registry_url: request.registry_url().to_string(),
            raw_output: None,
        }
    }

    fn failure(request: &PackageRequest, message: String) -> Self {
        Self {
            succeeded: false,
            skipped: false,
            message,
            registry_url: request.registry_url().to_string(),
            raw_output: None,
        }
    }
}

/// The fixed message reported when npm refuses a 24-hour republish.
pub const REPUBLISH_WINDOW_MESSAGE: &str =
    "this version was published within the last 24 hours; wait 24 hours or publish a new version";

/// How a failed publish invocation is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// The version was unpublished recently and cannot be republished yet.
    RepublishWindow,
    /// The exact version is already on the registry.
    AlreadyExists,
    /// Anything else; reported with the raw error text.
    Other,
}

/// Ordered substring rules for classifying npm's error text.
///
/// This is purely textual matching against the npm CLI's output and is
/// inherently brittle across npm versions; it is kept here, and only
/// here, so a future output change needs exactly one edit.
const FAILURE_RULES: &[(&str, FailureKind)] = &[
    (
        "cannot be republished until 24 hours",
        FailureKind::RepublishWindow,
    ),
    ("version already exists", FailureKind::AlreadyExists),
];

fn classify_failure(error_text: &str) -> FailureKind {
    for (needle, kind) in FAILURE_RULES {
        if error_text.contains(needle) {
            return *kind;
        }
    }
    FailureKind::Other
}

/// Publish `archive_path` to the request's registry.
///
/// The command runs inside a credential scope whose environment
/// overrides apply to this invocation only. Process failures are
/// classified textually (republish window, already exists, other) and
/// always reported as a [`PublishResult`], never as an error.
pub fn publish(
    executor: &dyn CommandExecutor,
    archive_path: &Utf8Path,
    token: &str,
    request: &PackageRequest,
) -> PublishResult {
    let scoped = with_credential(request.registry_url(), token, |env| {
        let registry = request.registry_url().to_string();
        let mut args = vec![
            "publish",
            archive_path.as_str(),
            "--registry",
            registry.as_str(),
            "--access",
            request.access().as_flag(),
            "--tag",
            request.dist_tag(),
        ];
        if request.dry_run() {
            args.push("--dry-run");
        }

        let mut envs = env.vars().to_vec();
        envs.push(("npm_config_loglevel".to_owned(), "error".to_owned()));

        executor.run("npm", &args, &envs)
    });

    let output = match scoped {
        Ok(Ok(output)) => output,
        Ok(Err(e)) | Err(e) => {
            return PublishResult::failure(request, e.to_string());
        }
    };

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        return PublishResult::success(request, stdout);
    }

    let error_text = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    match classify_failure(&error_text) {
        FailureKind::RepublishWindow => {
            PublishResult::failure(request, REPUBLISH_WINDOW_MESSAGE.to_owned())
        }
        FailureKind::AlreadyExists => {
            if request.skip_if_exists() {
                PublishResult::skip(request)
            } else {
                PublishResult::failure(
                    request,
                    format!(
                        "version {}@{} already exists",
                        request.name(),
                        request.version()
                    ),
                )
            }
        }
        FailureKind::Other => PublishResult::failure(request, error_text),
    }
}
