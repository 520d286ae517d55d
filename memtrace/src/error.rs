// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Errors that abort a scan.
//!
//! Lines that do not match any known shape are never errors; only failing to
//! get at the input is.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// The `ScanError` is returned when the log cannot be read.
#[derive(Debug)]
pub enum ScanError {
    /// The log file could not be opened.
    Open {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Reading failed part way through the log.
    Read {
        /// 1-based number of the line being read when the failure occurred.
        line: usize,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanError::Open { path, source } => {
                write!(f, "Error: unable to open {}: {source}", path.display())
            }
            ScanError::Read { line, source } => {
                write!(f, "Error: failed reading line {line}: {source}")
            }
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScanError::Open { source, .. } | ScanError::Read { source, .. } => Some(source),
        }
    }
}

/// The result of a complete scan.
pub type ScanResult<T> = Result<T, ScanError>;
