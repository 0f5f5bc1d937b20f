//! Repackaging and credential-scoped publishing for npm package archives.
//!
//! This crate accepts a package archive (or a raw file), normalizes its
//! `package.json` so the name, version, registry, and repository metadata
//! match the caller's request, repackages it into the canonical `.tgz`
//! layout npm expects, and runs `npm publish` with ephemeral credentials
//! that never touch shared process state. It backs the `repub` CLI binary
//! and can be consumed programmatically by other front-ends.
//!
//! # Modules
//!
//! - [`archive`] - Archive classification, extraction, and canonical packing
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - JSON configuration file loading with `${VAR}` substitution
//! - [`credentials`] - Ephemeral, per-call npm credential scopes
//! - [`error`] - Semantic error types
//! - [`history`] - Capped, most-recent-first publish history log
//! - [`manifest`] - `package.json` reconciliation and package-root location
//! - [`pipeline`] - End-to-end publish orchestration
//! - [`publish`] - `npm publish` invocation and outcome classification
//! - [`registry`] - Published-version existence queries
//! - [`repack`] - Repackaging into the canonical archive format
//! - [`request`] - Caller-supplied publish intent

pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod history;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod repack;
pub mod request;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
