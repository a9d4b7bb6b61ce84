//! Command-facing logger.
use std::path::{Path, PathBuf};

use super::utils::log_file_path;

/// Thin facade over [`tracing`] used by command handlers.
///
/// Every message also lands in `$XDG_CACHE_HOME/modfs/<command>.log`
/// (default `~/.cache/modfs/<command>.log`) through the file layer installed
/// by [`init_subscriber`](super::subscriber::init_subscriber), with
/// timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

#[allow(clippy::unused_self)]
impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers the log file path; the file itself is created by the
    /// subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Path of the persistent log file, if the cache directory is usable.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "modfs::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only with `--verbose`).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use crate::logging::isolated_logger;
    use std::fs;

    fn log_contents(log: &super::Logger) -> String {
        fs::read_to_string(log.log_path().expect("log path")).unwrap()
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists());
        assert!(path.ends_with("modfs/test.log"));
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = log_contents(&log);
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn warn_and_error_are_tagged() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("careful");
        log.error("broken");
        let contents = log_contents(&log);
        assert!(contents.contains("[warn] careful"));
        assert!(contents.contains("[error] broken"));
    }

    #[test]
    fn stage_written_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Activating");
        assert!(log_contents(&log).contains("==> Activating"));
    }
}
