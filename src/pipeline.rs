//! End-to-end publish orchestration.
//!
//! Within one request, steps are strictly sequential: the existence
//! check (when enabled) completes before anything touches the
//! filesystem, repackaging completes fully before publish begins, and
//! the history entry is recorded after the outcome is known. Multiple
//! requests may run concurrently; isolation comes from each request's
//! own working directory and credential scope, never from shared state.

use crate::error::{RepubError, Result};
use crate::history::{HistoryEntry, HistoryLog};
use crate::publish::{CommandExecutor, PublishResult, publish};
use crate::registry::version_exists;
use crate::repack::repackage;
use crate::request::PackageRequest;

/// Orchestrates repackaging, existence checks, publishing, and history
/// recording for publish requests.
pub struct Publisher<'a> {
    executor: &'a dyn CommandExecutor,
    history: Option<&'a HistoryLog>,
}

impl<'a> Publisher<'a> {
    /// Create a publisher running commands through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self {
            executor,
            history: None,
        }
    }

    /// Record every attempt into `history`.
    #[must_use]
    pub fn with_history(mut self, history: &'a HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Run one publish attempt end to end.
    ///
    /// When the skip-if-exists policy is enabled and the registry already
    /// has the exact version, the publish command is never invoked and a
    /// skip result is returned. Publish-command failures are reported
    /// through the returned [`PublishResult`], never as an `Err`; only
    /// configuration and repackaging problems abort with an error.
    ///
    /// # Errors
    ///
    /// Returns [`RepubError::MissingToken`] for an empty token, plus any
    /// repackaging error. The request-scoped working area is cleaned up
    /// before an error propagates.
    pub fn publish_package(
        &self,
        request: &PackageRequest,
        token: &str,
    ) -> Result<PublishResult> {
        if token.trim().is_empty() {
            return Err(RepubError::MissingToken);
        }

        if request.skip_if_exists()
            && version_exists(
                self.executor,
                request.name(),
                request.version(),
                request.registry_url(),
            )
        {
            let result = PublishResult::skip(request);
            self.record(request, &result);
            return Ok(result);
        }

        let archive = repackage(request)?;
        let result = publish(self.executor, archive.path(), token, request);
        drop(archive);

        self.record(request, &result);
        Ok(result)
    }

    /// Best-effort history recording; failures are logged, never
    /// escalated (the publish outcome is already determined).
    fn record(&self, request: &PackageRequest, result: &PublishResult) {
        if let Some(history) = self.history {
            let entry = HistoryEntry::from_outcome(request, result);
            if let Err(e) = history.record(entry) {
                log::warn!("failed to record publish history: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
