//! CLI argument definitions.
//!
//! This module defines the command-line interface using clap. It is
//! separated from the main entrypoint to keep the binary small and
//! focused on orchestration.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Default configuration file path, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "publish-config.json";

/// Publish npm packages from a JSON configuration file.
#[derive(Parser, Debug)]
#[command(name = "repub")]
#[command(version, about)]
#[command(long_about = concat!(
    "Publish npm packages from a JSON configuration file.\n\n",
    "Each configured package is repackaged into a canonical gzip tarball ",
    "with a reconciled package.json before publishing, so the name and ",
    "version on the registry always match the configuration regardless of ",
    "what the source archive declares.\n\n",
    "Registry credentials are written to an ephemeral .npmrc in a ",
    "temporary directory and passed to npm through per-invocation ",
    "environment overrides; no credential ever lands in the working tree ",
    "or the process environment.",
))]
#[command(after_help = concat!(
    "CONFIGURATION:\n",
    "  The configuration file lists packages (name, version, path, and\n",
    "  optional registry, repository, access, tag), auth.npm.token, and\n",
    "  run-wide options (dryRun, skipExisting). String values may embed\n",
    "  ${VAR} placeholders substituted from the environment, e.g.\n",
    "  \"token\": \"${NPM_TOKEN}\".\n\n",
    "EXAMPLES:\n",
    "  Publish everything in publish-config.json:\n",
    "    $ repub\n\n",
    "  Publish from a specific configuration with a trial run first:\n",
    "    $ repub publish -c release.json --dry-run\n\n",
    "  Check a configuration without publishing:\n",
    "    $ repub validate -c release.json\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Publish arguments (used when no subcommand is given).
    #[command(flatten)]
    pub publish: PublishArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Publish the configured packages (default when no subcommand given).
    Publish(PublishArgs),

    /// Load and validate a configuration file without publishing.
    Validate(ValidateArgs),
}

/// Arguments for the publish command.
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: Utf8PathBuf,

    /// Run npm publish with --dry-run regardless of the configuration.
    #[arg(long)]
    pub dry_run: bool,

    /// Record publish attempts into this JSON history file.
    #[arg(long, value_name = "FILE")]
    pub history: Option<Utf8PathBuf>,

    /// Suppress progress output (errors and the summary still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the validate command.
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: Utf8PathBuf,
}

impl Default for PublishArgs {
    fn default() -> Self {
        Self {
            config: Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
            dry_run: false,
            history: None,
            quiet: false,
        }
    }
}

impl Cli {
    /// Returns the effective publish arguments.
    ///
    /// If a `Publish` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened publish arguments so the bare
    /// `repub` invocation publishes, matching the subcommand-less form.
    #[must_use]
    pub fn publish_args(&self) -> &PublishArgs {
        match &self.command {
            Some(Command::Publish(args)) => args,
            Some(Command::Validate(_)) | None => &self.publish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_defaults_to_publishing() {
        let cli = Cli::parse_from(["repub"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.publish_args().config, DEFAULT_CONFIG_FILE);
        assert!(!cli.publish_args().dry_run);
    }

    #[test]
    fn publish_subcommand_arguments_take_effect() {
        let cli = Cli::parse_from(["repub", "publish", "-c", "release.json", "--dry-run"]);
        let args = cli.publish_args();
        assert_eq!(args.config, "release.json");
        assert!(args.dry_run);
    }

    #[test]
    fn history_flag_is_optional() {
        let cli = Cli::parse_from(["repub", "--history", "/tmp/history.json"]);
        assert_eq!(
            cli.publish_args().history.as_deref(),
            Some(camino::Utf8Path::new("/tmp/history.json"))
        );
    }

    #[test]
    fn validate_subcommand_parses() {
        let cli = Cli::parse_from(["repub", "validate", "-c", "release.json"]);
        match cli.command {
            Some(Command::Validate(args)) => assert_eq!(args.config, "release.json"),
            other => panic!("expected validate subcommand, got {other:?}"),
        }
    }
}
