//! Error types for watching and scanning

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Watch subsystem errors
///
/// Every variant is fatal during setup. After setup, failures are logged
/// where they occur and never surface as `WatchError`.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize inotify: {0}")]
    Init(#[source] io::Error),

    #[error("failed to watch device directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list device directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to watch device {path}: {source}")]
    Device {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Process table scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to enumerate process table {root}: {source}")]
    ProcessTable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}
