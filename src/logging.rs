//! Logging initialization and the size-rotating log file.
//!
//! Console output and the log file share one filter. The file is rotated
//! when it would grow past the configured size, keeping a fixed number of
//! numbered backups (`pipeline.log.1` is the most recent).

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{PipelineError, PipelineResult};

/// A log file that rotates by size.
pub struct SizeRotatingWriter {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl SizeRotatingWriter {
    /// Opens (or creates) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the parent directory cannot be created or
    /// the file cannot be opened.
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
            backups,
        })
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            let oldest = self.backup_path(self.backups);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.backups).rev() {
                let from = self.backup_path(index);
                if from.exists() {
                    fs::rename(&from, self.backup_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
        }

        self.file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0
            && self.written > 0
            && self.written + buf.len() as u64 > self.max_bytes
        {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the configured level; `verbose` forces `debug`.
/// When a log file is configured, records also go to a
/// [`SizeRotatingWriter`] without ANSI colors.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> PipelineResult<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let file_layer = match &config.file {
        Some(path) => {
            let writer = SizeRotatingWriter::open(path, config.max_file_size, config.backup_count)
                .map_err(|e| PipelineError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(writer)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose))
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::InvalidConfig {
            field: "logging".to_string(),
            message: e.to_string(),
        })?;

    debug!(level = %config.level, file = ?config.file, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_append_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.log");
        fs::write(&path, "old\n").unwrap();

        let mut writer = SizeRotatingWriter::open(&path, 1024, 2).unwrap();
        writer.write_all(b"new\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_rotates_when_size_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("pipeline.log");

        let mut writer = SizeRotatingWriter::open(&path, 10, 2).unwrap();
        writer.write_all(b"first-line\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.write_all(b"third-line\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "third-line\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("logs/pipeline.log.1")).unwrap(),
            "second\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("logs/pipeline.log.2")).unwrap(),
            "first-line\n"
        );
    }

    #[test]
    fn test_oldest_backup_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.log");

        let mut writer = SizeRotatingWriter::open(&path, 4, 1).unwrap();
        for line in [b"aaaa", b"bbbb", b"cccc"] {
            writer.write_all(line).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "cccc");
        assert_eq!(
            fs::read_to_string(dir.path().join("pipeline.log.1")).unwrap(),
            "bbbb"
        );
        assert!(!dir.path().join("pipeline.log.2").exists());
    }

    #[test]
    fn test_zero_backups_truncates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.log");

        let mut writer = SizeRotatingWriter::open(&path, 4, 0).unwrap();
        writer.write_all(b"aaaa").unwrap();
        writer.write_all(b"bb").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "bb");
        assert_eq!(writer.path(), path.as_path());
    }
}
