//! Timestamped logging to console and a log file.
//!
//! A `Logger` is constructed once in `main` and passed by reference to
//! every component that reports progress or warnings. Writing to the log
//! file is best-effort: a failed append never interrupts processing.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub struct Logger {
    file_path: Option<PathBuf>,
}

impl Logger {
    /// Creates a logger that mirrors output to the given file.
    /// The parent directory is created if it does not exist.
    pub fn new(file_path: PathBuf) -> Self {
        if let Some(parent) = file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Logger {
            file_path: Some(file_path),
        }
    }

    /// Creates a console-only logger (used in tests).
    pub fn console_only() -> Self {
        Logger { file_path: None }
    }

    pub fn info(&self, msg: &str) {
        self.write("INFO", msg);
    }

    pub fn warn(&self, msg: &str) {
        self.write("WARN", msg);
    }

    pub fn error(&self, msg: &str) {
        self.write("ERROR", msg);
    }

    fn write(&self, level: &str, msg: &str) {
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let line = format!("[{}] [{}] {}\n", timestamp, level, msg);
        print!("{}", line);
        if let Some(path) = &self.file_path {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::new(path.clone());

        logger.info("first");
        logger.warn("second");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[INFO] first"));
        assert!(content.contains("[WARN] second"));
    }

    #[test]
    fn test_console_only_does_not_panic() {
        let logger = Logger::console_only();
        logger.error("no file attached");
    }
}
