//! Video device presence monitoring
//!
//! This crate watches a device directory with inotify and turns the raw
//! stream of open/close/create events into presence transitions:
//! - Directory and per-device watch registration with bounded re-arm
//! - Trailing-edge debouncing of open/close bursts
//! - Process table scanning to decide whether a device is held
//! - A single event loop that fires hooks with the scan result

pub mod backend;
pub mod debounce;
pub mod error;
pub mod monitor;
pub mod registrar;
pub mod scanner;

pub use backend::{open_inotify, FsEvent, InotifyBackend, WatchBackend, WatchTable};
pub use debounce::Debouncer;
pub use error::{ScanError, WatchError};
pub use monitor::{Hooks, Monitor, MonitorState};
pub use registrar::{RearmState, RetryPolicy, WatchRegistrar, DEVICE_MASK, DIRECTORY_MASK};
pub use scanner::{Descriptors, Pids, ProcFs, ProcessScanner, ProcessSource};

// Re-exported so downstream crates can build events and masks without
// depending on inotify directly
pub use inotify::{EventMask, WatchMask};
