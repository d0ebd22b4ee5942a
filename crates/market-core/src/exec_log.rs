use chrono::Local;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Append-only execution journal. One line per event:
/// `YYYY-MM-DD HH:MM:SS.mmm | <message>`.
///
/// This is the trade record, not diagnostics; diagnostics go through
/// `tracing`. The writer is explicitly constructed and passed to the
/// components that journal, never reached through a global.
#[derive(Debug)]
pub struct ExecutionLog {
    writer: Mutex<BufWriter<File>>,
}

impl ExecutionLog {
    /// Open (or create) the journal file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one event line. Write failures are reported to the caller once
    /// and never panic.
    pub fn log(&self, message: &str) -> io::Result<()> {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut writer = self.writer.lock();
        writeln!(writer, "{} | {}", ts, message)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let path = std::env::temp_dir().join("tickcore_exec_log_test.txt");
        std::fs::remove_file(&path).ok();

        let log = ExecutionLog::open(&path).unwrap();
        log.log("sent order 1").unwrap();
        log.log("order 1 filled").unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            // 2025-01-01 00:00:00.000 | message
            let (ts, msg) = line.split_once(" | ").unwrap();
            assert_eq!(ts.len(), 23);
            assert!(!msg.is_empty());
        }
        assert!(lines[0].ends_with("sent order 1"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_append_only() {
        let path = std::env::temp_dir().join("tickcore_exec_log_append_test.txt");
        std::fs::remove_file(&path).ok();

        {
            let log = ExecutionLog::open(&path).unwrap();
            log.log("first session").unwrap();
        }
        {
            let log = ExecutionLog::open(&path).unwrap();
            log.log("second session").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        std::fs::remove_file(&path).ok();
    }
}
