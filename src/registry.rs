//! Published-version existence queries.
//!
//! Backs the skip-if-exists policy. The query is deliberately fail-open:
//! any failure (missing package, network error, npm not installed) is
//! reported as "not published" so a transient query problem can never
//! block a legitimate publish.

use crate::publish::CommandExecutor;
use semver::Version;
use url::Url;

/// Check whether `name@version` is already published on `registry_url`.
///
/// Runs `npm view <name>@<version> version` and returns `true` only when
/// the reported version string matches exactly.
#[must_use]
pub fn version_exists(
    executor: &dyn CommandExecutor,
    name: &str,
    version: &Version,
    registry_url: &Url,
) -> bool {
    let spec = format!("{name}@{version}");
    let registry = registry_url.to_string();
    let args = ["view", spec.as_str(), "version", "--registry", registry.as_str()];

    let Ok(output) = executor.run("npm", &args, &[]) else {
        return false;
    };
    if !output.status.success() {
        return false;
    }

    let reported = String::from_utf8_lossy(&output.stdout);
    reported.trim() == version.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepubError;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output_with};

    fn view_args() -> Vec<String> {
        vec![
            "view".to_owned(),
            "mylib@2.0.0".to_owned(),
            "version".to_owned(),
            "--registry".to_owned(),
            "https://reg.example/".to_owned(),
        ]
    }

    fn check(executor: &StubExecutor) -> bool {
        let registry = Url::parse("https://reg.example/").expect("registry url");
        version_exists(executor, "mylib", &Version::new(2, 0, 0), &registry)
    }

    #[test]
    fn exact_match_reports_existing() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "npm",
            args: view_args(),
            result: Ok(success_output_with("2.0.0\n")),
        }]);

        assert!(check(&executor));
        executor.assert_finished();
    }

    #[test]
    fn different_version_reports_missing() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "npm",
            args: view_args(),
            result: Ok(success_output_with("2.0.1\n")),
        }]);

        assert!(!check(&executor));
    }

    #[test]
    fn query_failure_is_fail_open() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "npm",
            args: view_args(),
            result: Ok(failure_output("npm ERR! 404 Not Found")),
        }]);

        assert!(!check(&executor));
    }

    #[test]
    fn spawn_failure_is_fail_open() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "npm",
            args: view_args(),
            result: Err(RepubError::Io(std::io::Error::other("npm not found"))),
        }]);

        assert!(!check(&executor));
    }
}
