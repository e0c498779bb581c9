//! Operator Event Log
//!
//! Append-only, timestamped, leveled record of what the monitor did:
//! - persisted as one text line per entry with a `[LEVEL]` tag
//! - mirrored to `tracing` for console/diagnostic output
//! - broadcast to in-process subscribers (dashboards, tests)
//!
//! Write failures are reported through `tracing` and never propagate into
//! the monitor tasks that log.

pub mod level;

pub use level::{LogEntry, LogLevel, TIMESTAMP_FORMAT};

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Shared append-only event log
pub struct EventLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    event_tx: broadcast::Sender<LogEntry>,
}

impl EventLog {
    /// Open (or create) the log file at `path` in append mode
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
            event_tx,
        })
    }

    /// Event log without a backing file
    pub fn in_memory() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            path: None,
            file: Mutex::new(None),
            event_tx,
        }
    }

    /// Subscribe to entries appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.event_tx.subscribe()
    }

    /// Append an entry
    pub fn append(&self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry::new(level, message);

        match entry.level {
            LogLevel::Info => info!(target: "svcwatch::events", "{}", entry.message),
            LogLevel::Success => info!(target: "svcwatch::events", success = true, "{}", entry.message),
            LogLevel::Warning => warn!(target: "svcwatch::events", "{}", entry.message),
            LogLevel::Error => error!(target: "svcwatch::events", "{}", entry.message),
        }

        self.persist(&entry);
        let _ = self.event_tx.send(entry.clone());
        entry
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(LogLevel::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> LogEntry {
        self.append(LogLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.append(LogLevel::Error, message)
    }

    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(LogLevel::Success, message)
    }

    /// Last `n` persisted lines, oldest first
    ///
    /// Returns an empty list when there is no backing file or it has not
    /// been created yet.
    pub fn tail(&self, n: usize) -> Result<Vec<String>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(Vec::new());
        };
        read_tail(path, n)
    }

    fn persist(&self, entry: &LogEntry) {
        let mut guard = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(file) = guard.as_mut() else {
            return;
        };

        let mut line = entry.to_line();
        line.push('\n');
        // One write per line keeps concurrent appends from interleaving
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            error!("Failed to write event log {:?}: {}", self.path, e);
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("path", &self.path).finish()
    }
}

/// Append a `Fatal error:` entry to the log file at `path`
///
/// Used on exit paths where no `EventLog` is open yet. Returns false when
/// the file could not be opened.
pub fn record_fatal(path: &Path, error: impl std::fmt::Display) -> bool {
    match EventLog::open(path) {
        Ok(log) => {
            log.error(format!("Fatal error: {}", error));
            true
        }
        Err(e) => {
            warn!("Cannot open event log {}: {}", path.display(), e);
            false
        }
    }
}

/// Last `n` lines of the log file at `path`
pub fn read_tail(path: &Path, n: usize) -> Result<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_persists_tagged_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service_monitor.log");
        let log = EventLog::open(&path).unwrap();

        log.info("Service monitor started");
        log.warning("Service redis appears to be down (failure 1/3)");
        log.success("Successfully restarted redis");

        let lines = log.tail(10).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] Service monitor started"));
        assert!(lines[1].contains("[WARNING] Service redis appears to be down"));
        assert_eq!(LogLevel::classify(&lines[2]), LogLevel::Success);
    }

    #[test]
    fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("monitor.log");

        EventLog::open(&path).unwrap().info("first");
        EventLog::open(&path).unwrap().error("second");

        let lines = read_tail(&path, 10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] first"));
        assert!(lines[1].ends_with("[ERROR] second"));
    }

    #[test]
    fn test_tail_limits_to_last_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path().join("monitor.log")).unwrap();
        for i in 0..30 {
            log.info(format!("entry {i}"));
        }

        let lines = log.tail(20).unwrap();
        assert_eq!(lines.len(), 20);
        assert!(lines[0].ends_with("entry 10"));
        assert!(lines[19].ends_with("entry 29"));
    }

    #[test]
    fn test_multiline_stderr_is_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path().join("monitor.log")).unwrap();

        log.error(
            "Failed to restart nginx: Job for nginx.service failed because the control \
             process exited with error code.\nSee \"systemctl status nginx.service\" and \
             \"journalctl -xeu nginx.service\" for details.",
        );

        let lines = log.tail(20).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(LogLevel::classify(&lines[0]), LogLevel::Error);
        assert!(lines[0].contains("error code. | See \"systemctl status nginx.service\""));
    }

    #[test]
    fn test_record_fatal_without_open_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service_monitor.log");

        assert!(record_fatal(&path, "invalid type: string \"x\", expected u64"));

        let lines = read_tail(&path, 5).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[ERROR] Fatal error: invalid type"));
    }

    #[test]
    fn test_tail_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lines = read_tail(&dir.path().join("absent.log"), 20).unwrap();
        assert!(lines.is_empty());
        assert!(EventLog::in_memory().tail(20).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let log = EventLog::in_memory();
        let mut rx = log.subscribe();

        log.error("Manual intervention required for mysql");

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "Manual intervention required for mysql");
    }
}
