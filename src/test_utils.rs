//! Shared test utilities for stubbing command execution.
//!
//! Gated behind the `test-support` feature (and `cfg(test)`) so external
//! integration tests can exercise publish logic without a real `npm`
//! binary on the host.

use crate::error::Result;
use crate::publish::CommandExecutor;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn success_output_with(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "npm").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Records expected command invocations and returns predefined results.
/// Environment overrides are not matched against expectations (they
/// contain per-run temporary paths); they are recorded for assertion
/// instead.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    envs: RefCell<Vec<Vec<(String, String)>>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            envs: RefCell::new(Vec::new()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }

    /// The environment overrides observed by each invocation, in order.
    #[must_use]
    pub fn recorded_envs(&self) -> Vec<Vec<(String, String)>> {
        self.envs.borrow().clone()
    }
}

impl CommandExecutor for StubExecutor {
    #[expect(
        clippy::panic_in_result_fn,
        reason = "stub mismatches are test failures, not recoverable errors"
    )]
    fn run(&self, cmd: &str, args: &[&str], envs: &[(String, String)]) -> Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        assert_eq!(call.args, args);

        self.envs.borrow_mut().push(envs.to_vec());

        call.result
    }
}
