//! Append-only audit log of every scheduled event.
//!
//! Records accumulate in memory in scheduling order and are persisted as a
//! single batch on graceful shutdown. The on-disk format is semicolon-
//! separated text, one record per line, with a header written the first
//! time the file is created.

use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Header line, written exactly once when the log file is first created.
pub const HEADER: &str = "timestamp;delay;type;value;code";

/// One scheduled event, as persisted to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditRecord {
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Computed delay in milliseconds.
    pub delay_ms: u64,
    /// Raw evdev event type.
    pub event_type: u16,
    /// Event value.
    pub value: i32,
    /// Event code.
    pub code: u16,
}

impl AuditRecord {
    fn line(&self) -> String {
        format!(
            "{};{};{};{};{}",
            self.timestamp_ms, self.delay_ms, self.event_type, self.value, self.code
        )
    }
}

/// Thread-safe audit buffer with flush-to-file on shutdown.
pub struct AuditLog {
    path: PathBuf,
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditLog {
    /// Create an empty log that will persist to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append one record. Insertion order is scheduling order.
    pub fn append(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(_) => log::error!("audit buffer poisoned, record dropped"),
        }
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// True when no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append all buffered records to the log file and clear the buffer.
    ///
    /// The header is written only if the file does not exist yet, so logs
    /// from repeated runs accumulate under a single header. Returns the
    /// number of records written.
    pub fn flush_and_clear(&self) -> Result<usize> {
        let drained: Vec<AuditRecord> = {
            let mut records = self
                .records
                .lock()
                .map_err(|_| Error::Poisoned("audit buffer"))?;
            std::mem::take(&mut *records)
        };

        if !self.path.exists() {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .open(&self.path)
                .map_err(Error::AuditLog)?;
            writeln!(file, "{HEADER}").map_err(Error::AuditLog)?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(Error::AuditLog)?;
        for record in &drained {
            writeln!(file, "{}", record.line()).map_err(Error::AuditLog)?;
        }

        Ok(drained.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u64) -> AuditRecord {
        AuditRecord {
            timestamp_ms: 1000 + n,
            delay_ms: 50 + n,
            event_type: 1,
            value: 1,
            code: 30 + n as u16,
        }
    }

    fn temp_log(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lagwire-{name}-{}.csv", std::process::id()))
    }

    #[test]
    fn test_flush_roundtrip_preserves_order() {
        let path = temp_log("roundtrip");
        let _ = std::fs::remove_file(&path);

        let log = AuditLog::new(&path);
        for n in 0..5 {
            log.append(record(n));
        }
        assert_eq!(log.len(), 5);

        let written = log.flush_and_clear().unwrap();
        assert_eq!(written, 5);
        assert!(log.is_empty());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], HEADER);
        for (i, line) in lines[1..].iter().enumerate() {
            let n = i as u64;
            assert_eq!(*line, format!("{};{};1;1;{}", 1000 + n, 50 + n, 30 + n));
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_header_written_once_across_flushes() {
        let path = temp_log("header");
        let _ = std::fs::remove_file(&path);

        let log = AuditLog::new(&path);
        log.append(record(0));
        log.flush_and_clear().unwrap();
        log.append(record(1));
        log.flush_and_clear().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let headers = contents.lines().filter(|l| *l == HEADER).count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_empty_flush_still_creates_header() {
        let path = temp_log("empty");
        let _ = std::fs::remove_file(&path);

        let log = AuditLog::new(&path);
        assert_eq!(log.flush_and_clear().unwrap(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim_end(), HEADER);

        std::fs::remove_file(&path).unwrap();
    }
}
