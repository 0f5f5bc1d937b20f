//! Capped, most-recent-first publish history log.
//!
//! The history file is the one durable artifact kept across requests: a
//! JSON array of past attempts, newest first, capped at
//! [`HISTORY_CAPACITY`] entries. Writers read-modify-write the file;
//! concurrent writers may race (last writer wins), which is acceptable
//! for a best-effort audit log.

use crate::error::Result;
use crate::publish::PublishResult;
use crate::request::PackageRequest;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum number of retained history entries.
pub const HISTORY_CAPACITY: usize = 100;

/// One recorded publish attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// ISO 8601 timestamp of the attempt.
    pub time: String,
    /// Requested package name.
    pub name: String,
    /// Requested package version.
    pub version: String,
    /// Target registry.
    pub registry_url: String,
    /// Dist-tag applied on publish.
    pub dist_tag: String,
    /// Access level requested.
    pub access: String,
    /// Whether the attempt counts as successful.
    pub succeeded: bool,
    /// Whether the publish was skipped.
    pub skipped: bool,
    /// Outcome text.
    pub message: String,
}

impl HistoryEntry {
    /// Build an entry from a request and its outcome, stamped with the
    /// current UTC time.
    #[must_use]
    pub fn from_outcome(request: &PackageRequest, result: &PublishResult) -> Self {
        Self {
            time: now_utc_iso8601(),
            name: request.name().to_owned(),
            version: request.version().to_string(),
            registry_url: result.registry_url.clone(),
            dist_tag: request.dist_tag().to_owned(),
            access: request.access().as_flag().to_owned(),
            succeeded: result.succeeded,
            skipped: result.skipped,
            message: result.message.clone(),
        }
    }
}

/// A history log persisted at a fixed path.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: Utf8PathBuf,
}

impl HistoryLog {
    /// Create a log backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load all entries, newest first.
    ///
    /// A missing or unreadable file yields an empty history rather than
    /// an error; the log is best-effort by design.
    #[must_use]
    pub fn load(&self) -> Vec<HistoryEntry> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&contents).unwrap_or_default()
    }

    /// Prepend `entry` and rewrite the file, truncating to
    /// [`HISTORY_CAPACITY`] entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written. Read failures
    /// are treated as an empty history.
    pub fn record(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(HISTORY_CAPACITY);

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Return the current UTC time as an ISO 8601 string
/// (`YYYY-MM-DDThh:mm:ssZ`).
///
/// Uses `std::time::SystemTime` to avoid pulling in `chrono`.
#[must_use]
pub fn now_utc_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format_epoch_secs(secs)
}

/// Format a Unix epoch timestamp as `YYYY-MM-DDThh:mm:ssZ`.
fn format_epoch_secs(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_epoch(epoch_secs);
    let day_secs = u32::try_from(epoch_secs % 86_400).unwrap_or_default();
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert a Unix epoch timestamp to a `(year, month, day)` triple.
///
/// Adapted from Howard Hinnant's `civil_from_days` algorithm, which is
/// public domain and widely used in C++ `<chrono>` implementations.
fn civil_from_epoch(epoch_secs: u64) -> (u32, u32, u32) {
    let z = (epoch_secs / 86_400) as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097) as u64; // day of era [0, 146_096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = (yoe as i64) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    #[expect(
        clippy::cast_sign_loss,
        reason = "year is always positive for post-epoch dates"
    )]
    (y as u32, m as u32, d as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn entry(name: &str, message: &str) -> HistoryEntry {
        HistoryEntry {
            time: "2026-01-01T00:00:00Z".to_owned(),
            name: name.to_owned(),
            version: "1.0.0".to_owned(),
            registry_url: "https://reg.example/".to_owned(),
            dist_tag: "latest".to_owned(),
            access: "public".to_owned(),
            succeeded: true,
            skipped: false,
            message: message.to_owned(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        let log = HistoryLog::new(format!("{}/history.json", dir.path().display()));
        assert!(log.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("history.json");
        fs::write(&path, "{{not json").expect("seed");
        let log = HistoryLog::new(path.to_string_lossy().into_owned());
        assert!(log.load().is_empty());
    }

    #[test]
    fn entries_are_most_recent_first() {
        let dir = TempDir::new().expect("temp dir");
        let log = HistoryLog::new(format!("{}/history.json", dir.path().display()));

        log.record(entry("first", "a")).expect("record");
        log.record(entry("second", "b")).expect("record");

        let entries = log.load();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "second");
        assert_eq!(entries[1].name, "first");
    }

    #[test]
    fn history_is_capped() {
        let dir = TempDir::new().expect("temp dir");
        let log = HistoryLog::new(format!("{}/history.json", dir.path().display()));

        for index in 0..HISTORY_CAPACITY + 5 {
            log.record(entry(&format!("pkg-{index}"), "ok")).expect("record");
        }

        let entries = log.load();
        assert_eq!(entries.len(), HISTORY_CAPACITY);
        assert_eq!(entries[0].name, format!("pkg-{}", HISTORY_CAPACITY + 4));
    }

    #[rstest]
    #[case::epoch(0, "1970-01-01T00:00:00Z")]
    #[case::y2k(946_684_800, "2000-01-01T00:00:00Z")]
    #[case::leap_day(1_709_164_800, "2024-02-29T00:00:00Z")]
    #[case::with_time(1_756_458_123, "2025-08-29T09:02:03Z")]
    fn formats_epoch_timestamps(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_epoch_secs(secs), expected);
    }
}
