//! repub CLI entrypoint.
//!
//! Loads a JSON publish configuration, repackages each listed package
//! into a canonical tarball, and publishes it with scoped, ephemeral
//! credentials. Failures for one package never abort the run; the
//! summary and exit code report them at the end.

use clap::Parser;
use repub::cli::{Cli, Command, PublishArgs, ValidateArgs};
use repub::config::PublishConfig;
use repub::error::{RepubError, Result};
use repub::history::HistoryLog;
use repub::pipeline::Publisher;
use repub::publish::SystemCommandExecutor;
use repub::request::PackageRequest;
use std::io::Write;

/// Environment variable consulted when the configuration carries no token.
const TOKEN_ENV: &str = "NPM_TOKEN";

/// Outcome counts for one publish run.
#[derive(Debug, Default)]
struct RunSummary {
    published: usize,
    skipped: usize,
    /// Failed packages as `(name@version, message)` pairs.
    failures: Vec<(String, String)>,
}

impl RunSummary {
    fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn main() {
    let cli = Cli::parse();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<RunSummary> {
    match &cli.command {
        Some(Command::Validate(args)) => run_validate(args, stderr),
        Some(Command::Publish(_)) | None => run_publish(cli.publish_args(), stderr),
    }
}

/// Loads the configuration and reports its contents without publishing.
fn run_validate(args: &ValidateArgs, stderr: &mut dyn Write) -> Result<RunSummary> {
    let config = PublishConfig::load(&args.config)?;
    let requests = config.requests()?;

    write_stderr_line(stderr, format!("Configuration {} is valid.", args.config));
    write_stderr_line(stderr, format!("Packages: {}", requests.len()));
    for request in &requests {
        write_stderr_line(
            stderr,
            format!(
                "  - {}@{} ({})",
                request.name(),
                request.version(),
                request.source_path()
            ),
        );
    }

    Ok(RunSummary::default())
}

fn run_publish(args: &PublishArgs, stderr: &mut dyn Write) -> Result<RunSummary> {
    let config = PublishConfig::load(&args.config)?;
    let token = resolve_token(&config)?;
    let requests = config.requests()?;

    let executor = SystemCommandExecutor;
    let mut publisher = Publisher::new(&executor);
    let history = args.history.as_deref().map(HistoryLog::new);
    if let Some(history) = &history {
        publisher = publisher.with_history(history);
    }

    if !args.quiet {
        write_stderr_line(stderr, format!("Publishing {} package(s)...", requests.len()));
    }

    let mut summary = RunSummary::default();
    for request in &requests {
        let request = apply_cli_overrides(request.clone(), args);
        publish_one(&publisher, &request, &token, args.quiet, &mut summary, stderr);
    }

    print_summary(&summary, stderr);
    Ok(summary)
}

/// Applies flags that override the configuration for this invocation.
fn apply_cli_overrides(request: PackageRequest, args: &PublishArgs) -> PackageRequest {
    if args.dry_run {
        request.with_dry_run(true)
    } else {
        request
    }
}

/// Publishes one package and folds the outcome into the summary.
///
/// Per-package errors (missing source, malformed archive) are recorded
/// as failures rather than aborting the remaining packages.
fn publish_one(
    publisher: &Publisher<'_>,
    request: &PackageRequest,
    token: &str,
    quiet: bool,
    summary: &mut RunSummary,
    stderr: &mut dyn Write,
) {
    let spec = format!("{}@{}", request.name(), request.version());
    if !quiet {
        write_stderr_line(
            stderr,
            format!("Publishing {spec} to {}...", request.registry_url()),
        );
    }

    match publisher.publish_package(request, token) {
        Ok(result) if result.skipped => {
            summary.skipped += 1;
            if !quiet {
                write_stderr_line(stderr, format!("  skipped: {}", result.message));
            }
        }
        Ok(result) if result.succeeded => {
            summary.published += 1;
            if !quiet {
                write_stderr_line(stderr, format!("  {}", result.message));
            }
        }
        Ok(result) => {
            write_stderr_line(stderr, format!("  failed: {}", result.message));
            summary.failures.push((spec, result.message));
        }
        Err(err) => {
            let message = err.to_string();
            write_stderr_line(stderr, format!("  failed: {message}"));
            summary.failures.push((spec, message));
        }
    }
}

fn print_summary(summary: &RunSummary, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "");
    write_stderr_line(
        stderr,
        format!(
            "Summary: {} published, {} skipped, {} failed",
            summary.published,
            summary.skipped,
            summary.failures.len()
        ),
    );

    for (spec, message) in &summary.failures {
        write_stderr_line(stderr, format!("  {spec}: {message}"));
    }
}

/// Resolves the auth token from the configuration, falling back to the
/// `NPM_TOKEN` environment variable.
fn resolve_token(config: &PublishConfig) -> Result<String> {
    if let Some(token) = config.token() {
        return Ok(token.to_owned());
    }

    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(RepubError::MissingToken),
    }
}

fn exit_code_for_run_result(result: Result<RunSummary>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) if summary.is_clean() => 0,
        Ok(_) => 1,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
