/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging utilities for
    Syn-Gate-Core operations, scoped per catalog request.

  Security / Safety Notes:
    License ids and credential material pass through `redact`
    before they are written; only short prefixes survive.

  Dependencies:
    std::fs::File, std::sync::Mutex, sha2 for integrity hashing.

  Operational Scope:
    Shared by the orchestrator, strategies, and collaborators to
    emit RFC-3339 UTC stamped entries and session digests.

  Revision History:
    2024-11-04 COD  Established logging module for Syn-Syu-Core.
    2025-11-12 COD  Added request scopes and redaction.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{GatewayError, Result};

/// Structured log level for Syn-Gate-Core events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Shared logger that emits append-only entries in Synavera format.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    verbose: bool,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = if let Some(ref file_path) = path {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    GatewayError::Config(format!(
                        "Failed to create log directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .map_err(|err| {
                    GatewayError::Config(format!(
                        "Failed to open log file {}: {err}",
                        file_path.display()
                    ))
                })?;
            Some(Mutex::new(BufWriter::new(file)))
        } else {
            None
        };

        Ok(Self {
            file,
            path,
            verbose,
        })
    }

    /// Logger that only reports warnings and errors to stderr.
    pub fn quiet() -> Self {
        Self {
            file: None,
            path: None,
            verbose: false,
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = format!(
            "{timestamp} [{}] [{}] {}",
            level.as_str(),
            code,
            message.as_ref()
        );

        if self.verbose || level == LogLevel::Error || level == LogLevel::Warn {
            eprintln!("{payload}");
        }

        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                if writeln!(guard, "{payload}").is_err() || guard.flush().is_err() {
                    eprintln!(
                        "{} [{}] [{}] {}",
                        timestamp,
                        LogLevel::Error.as_str(),
                        "LOGGER",
                        "Failed to write to log file"
                    );
                }
            }
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Borrow a view that tags every entry with a request id.
    pub fn scope<'a>(&'a self, request_id: &'a str) -> RequestLog<'a> {
        RequestLog {
            logger: self,
            request_id,
        }
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        if let Some(path) = self.path() {
            let data = std::fs::read(path)?;
            let mut hasher = Sha256::new();
            hasher.update(&data);
            let digest = hasher.finalize();
            let mut hash_os = path.as_os_str().to_os_string();
            hash_os.push(".hash");
            let hash_path = PathBuf::from(hash_os);
            let mut file = File::create(&hash_path)?;
            writeln!(
                file,
                "{:x}  {}",
                digest,
                path.file_name().unwrap_or_default().to_string_lossy()
            )?;
        }
        Ok(())
    }
}

/// Request-scoped view over the shared [`Logger`].
#[derive(Clone, Copy)]
pub struct RequestLog<'a> {
    logger: &'a Logger,
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    fn tagged<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        self.logger.log(
            level,
            code,
            format!("req={} {}", self.request_id, message.as_ref()),
        );
    }

    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.tagged(LogLevel::Info, code, message);
    }

    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.tagged(LogLevel::Warn, code, message);
    }

    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.tagged(LogLevel::Error, code, message);
    }

    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.tagged(LogLevel::Debug, code, message);
    }
}

/// Mask a secret-bearing value, keeping a four character prefix.
pub fn redact(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let prefix: String = value.chars().take(4).collect();
    if prefix.chars().count() == value.chars().count() {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_short_prefix_only() {
        assert_eq!(redact("tmns-1234-abcd"), "tmns****");
        assert_eq!(redact("abc"), "****");
        assert_eq!(redact(""), "");
    }

    #[test]
    fn scoped_entries_land_in_file_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("gate.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        logger.scope("req-42").info("VERSIONS", "resolved 16.2.5");
        logger.finalize().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[INFO] [VERSIONS] req=req-42 resolved 16.2.5"));
        let digest = std::fs::read_to_string(dir.path().join("logs").join("gate.log.hash")).unwrap();
        assert!(digest.trim_end().ends_with("gate.log"));
    }
}
