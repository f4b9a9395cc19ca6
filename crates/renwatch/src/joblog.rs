//! Render log scanning.
//!
//! Each job folder carries a plain-text log written by the render nodes.
//! Error detection is a line-by-line substring scan for the manager's
//! `ERR` marker; the offending lines travel with the render attempt so
//! operators see them in the tracking system without opening the farm.

use std::path::Path;

use crate::error::ScanError;

/// Marker substring the render manager writes on error lines.
const ERROR_MARKER: &str = "ERR";

/// Outcome of scanning one job log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogScan {
    pub has_error: bool,
    pub error_text: String,
}

/// Scan the log at `path`. Logs are read lossily; render hosts
/// occasionally write non-UTF-8 bytes into them.
pub fn scan_log(path: &Path) -> Result<LogScan, ScanError> {
    let bytes = std::fs::read(path).map_err(|e| ScanError::ReadLog {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(scan_text(&String::from_utf8_lossy(&bytes)))
}

fn scan_text(text: &str) -> LogScan {
    let mut offending = Vec::new();
    for line in text.lines() {
        if line.contains(ERROR_MARKER) {
            offending.push(line.trim());
        }
    }
    LogScan {
        has_error: !offending.is_empty(),
        error_text: offending.join("\n"),
    }
}
