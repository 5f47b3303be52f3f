//! Tracing subscriber setup
//!
//! stdout carries the protocol, so logs go to the configured file or to
//! stderr. The file rolls daily and keeps `retained_files` generations.
//! `RUST_LOG` overrides the configured level.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::settings::{resolve_relative, LoggingSettings};

const DEFAULT_FILE_PREFIX: &str = "netwrix-auditor-mcp";

/// Filter from `RUST_LOG`, else the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. The returned guard flushes buffered file
/// output on drop and must outlive all logging.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(&settings.level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .compact();

    match rolling_appender(settings)? {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = builder.with_ansi(false).with_writer(writer).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set tracing subscriber")?;
            Ok(None)
        }
    }
}

/// Daily-rolling file writer for the configured path; `None` when file
/// logging is off. `logs/server.log` rolls to `logs/server.<date>.log`.
pub fn rolling_appender(settings: &LoggingSettings) -> Result<Option<RollingFileAppender>> {
    let Some(path) = settings.file.as_deref().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(None);
    };
    let path = resolve_relative(path);
    let dir = log_directory(&path)?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILE_PREFIX);
    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(settings.retained_files.max(1));
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        builder = builder.filename_suffix(ext);
    }

    let appender = builder
        .build(&dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
    Ok(Some(appender))
}

fn log_directory(path: &Path) -> Result<PathBuf> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn settings(file: Option<PathBuf>) -> LoggingSettings {
        LoggingSettings {
            file,
            ..LoggingSettings::default()
        }
    }

    #[test]
    fn test_rolling_appender_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs").join("nested");
        let mut appender = rolling_appender(&settings(Some(log_dir.join("server.log"))))
            .unwrap()
            .unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = fs::read_dir(&log_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("server."));
        assert!(names[0].ends_with(".log"));
        assert_ne!(names[0], "server.log");
    }

    #[test]
    fn test_blank_or_missing_file_logs_to_stderr() {
        assert!(rolling_appender(&settings(None)).unwrap().is_none());
        assert!(rolling_appender(&settings(Some(PathBuf::new()))).unwrap().is_none());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // Must not panic on junk directives.
        let _ = env_filter("not a [valid level");
    }
}
