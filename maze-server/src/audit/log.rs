//! Append-only activity log.
//!
//! One `AuditLog` is constructed at start-up and shared (behind an `Arc`)
//! with every component that records events. Recording never fails from the
//! caller's point of view: I/O errors go to `tracing` and the next record
//! retries opening the file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Local;

use super::event::{AuditEntry, EventKind};

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "user_activity_log.txt";

const BANNER_WIDTH: usize = 80;

/// Process-wide audit trail writer.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    /// Lazily (re)opened append handle. `None` after a failed open or write.
    file: Mutex<Option<File>>,
    /// Echo every line to stdout as well.
    echo: bool,
}

impl AuditLog {
    /// Open the log at `path` and append the session-start banner.
    pub fn open(path: impl Into<PathBuf>, echo: bool) -> Self {
        let log = Self {
            path: path.into(),
            file: Mutex::new(None),
            echo,
        };
        log.write_banner();
        log
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event line.
    pub fn record(&self, kind: EventKind, detail: impl Into<String>) {
        self.append(&AuditEntry::now(kind, detail));
    }

    /// Append a pre-built entry.
    pub fn append(&self, entry: &AuditEntry) {
        let line = format!("{entry}\n");

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.write_locked(&mut guard, line.as_bytes()) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                event = %entry.kind,
                "failed to append audit entry"
            );
        }

        if self.echo {
            if let Err(e) = echo_line(&mut io::stdout().lock(), line.as_bytes()) {
                tracing::debug!(error = %e, event = %entry.kind, "failed to echo audit entry");
            }
        }
    }

    fn write_banner(&self) {
        let rule = "=".repeat(BANNER_WIDTH);
        let started = Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p");
        let banner = format!("\n{rule}\nNEW SESSION STARTED: {started}\n{rule}\n");

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.write_locked(&mut guard, banner.as_bytes()) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to write audit session banner"
            );
        }
    }

    /// Write `bytes` through the cached handle, opening it first if needed.
    /// The handle is dropped on failure so the next call reopens the file.
    fn write_locked(&self, slot: &mut Option<File>, bytes: &[u8]) -> io::Result<()> {
        if slot.is_none() {
            *slot = Some(open_append(&self.path)?);
        }
        let Some(file) = slot.as_mut() else {
            return Ok(());
        };
        let result = file.write_all(bytes).and_then(|()| file.flush());
        if result.is_err() {
            *slot = None;
        }
        result
    }
}

fn echo_line(out: &mut impl Write, line: &[u8]) -> io::Result<()> {
    out.write_all(line)?;
    out.flush()
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entries(path: &Path) -> Vec<AuditEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter_map(AuditEntry::parse_line)
            .collect()
    }

    #[test]
    fn test_banner_then_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.txt");

        let log = AuditLog::open(&path, false);
        log.record(EventKind::ServerStarted, "WebSocket server initialized on port 8081");
        log.record(EventKind::ServerStopped, "");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "=".repeat(80));
        assert!(lines[2].starts_with("NEW SESSION STARTED: "));
        assert_eq!(lines[3], "=".repeat(80));
        assert!(lines[4].ends_with(
            "] SERVER_STARTED - WebSocket server initialized on port 8081"
        ));
        assert!(lines[5].ends_with("] SERVER_STOPPED"));
    }

    #[test]
    fn test_reopen_appends_new_banner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.txt");

        AuditLog::open(&path, false).record(EventKind::ServerStarted, "first");
        AuditLog::open(&path, false).record(EventKind::ServerStarted, "second");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("NEW SESSION STARTED").count(), 2);
        let details: Vec<String> = entries(&path).into_iter().map(|e| e.detail).collect();
        assert_eq!(details, vec!["first", "second"]);
    }

    #[test]
    fn test_concurrent_records_are_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.txt");
        let log = Arc::new(AuditLog::open(&path, false));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.record(EventKind::ClientConnected, format!("Client ID: t{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let recorded = entries(&path);
        assert_eq!(recorded.len(), 400);
        // Per-writer order is preserved.
        for t in 0..8 {
            let prefix = format!("Client ID: t{t}-");
            let seq: Vec<usize> = recorded
                .iter()
                .filter_map(|e| e.detail.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_unwritable_target_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let log = AuditLog::open(dir.path(), false);
        log.record(EventKind::ClientConnected, "Client ID: abc");
        log.record(EventKind::ClientDisconnected, "Client ID: abc");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_echo_reports_write_errors() {
        let mut out = Vec::new();
        echo_line(&mut out, b"[ts] SERVER_STARTED\n").unwrap();
        assert_eq!(out, b"[ts] SERVER_STARTED\n");

        let err = echo_line(&mut BrokenPipe, b"[ts] SERVER_STARTED\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_recovers_once_target_becomes_writable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later").join("activity.txt");

        let log = AuditLog::open(&path, false);
        log.record(EventKind::ClientConnected, "lost");

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        log.record(EventKind::ClientConnected, "kept");

        let recorded = entries(&path);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].detail, "kept");
    }
}
