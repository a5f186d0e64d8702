//! Process table scanning
//!
//! Answers whether any process holds a video device open by walking every
//! process's descriptor links. The table changes under our feet while we
//! read it, so a process or descriptor vanishing mid-scan is skipped rather
//! than reported.

use crate::error::ScanError;
use camwatch_core::{DeviceClass, DeviceHolder, Presence};
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Iterator over process identifiers
pub type Pids<'a> = Box<dyn Iterator<Item = u32> + 'a>;

/// Iterator over descriptor link targets; `Err` items are skipped
pub type Descriptors<'a> = Box<dyn Iterator<Item = io::Result<PathBuf>> + 'a>;

/// Read access to a process table
pub trait ProcessSource: Send + Sync {
    /// Every process identifier in the table
    ///
    /// Failure here aborts the scan.
    fn pids(&self) -> Result<Pids<'_>, ScanError>;

    /// Link targets of a process's open descriptors
    ///
    /// Failure here skips the process.
    fn descriptors(&self, pid: u32) -> io::Result<Descriptors<'_>>;
}

/// Process table backed by a procfs mount
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcessSource for ProcFs {
    fn pids(&self) -> Result<Pids<'_>, ScanError> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| ScanError::ProcessTable {
            root: self.root.clone(),
            source,
        })?;

        Ok(Box::new(entries.filter_map(|entry| {
            let entry = entry.ok()?;
            entry.file_name().to_str()?.parse::<u32>().ok()
        })))
    }

    fn descriptors(&self, pid: u32) -> io::Result<Descriptors<'_>> {
        let fd_dir = self.root.join(pid.to_string()).join("fd");
        let entries = std::fs::read_dir(fd_dir)?;

        Ok(Box::new(entries.map(|entry| {
            let entry = entry?;
            std::fs::read_link(entry.path())
        })))
    }
}

/// Finds processes holding video devices
pub struct ProcessScanner<S> {
    source: S,
    class: DeviceClass,
}

impl<S: ProcessSource> ProcessScanner<S> {
    pub fn new(source: S, class: DeviceClass) -> Self {
        Self { source, class }
    }

    /// First process found holding a video device, if any
    ///
    /// Processes that exit mid-scan, and descriptors whose link cannot be
    /// read, are skipped without a warning. Both race with every scan on a
    /// live system, so only a failure to list processes is an error.
    pub fn find_holder(&self) -> Result<Option<DeviceHolder>, ScanError> {
        for pid in self.source.pids()? {
            let descriptors = match self.source.descriptors(pid) {
                Ok(descriptors) => descriptors,
                Err(e) => {
                    debug!(pid, error = %e, "Skipping unreadable process.");
                    continue;
                }
            };

            for target in descriptors.filter_map(Result::ok) {
                if self.class.is_video_device(&target) {
                    info!(device = %target.display(), pid, "Found reference to device.");
                    return Ok(Some(DeviceHolder { device: target, pid }));
                }
            }
        }

        Ok(None)
    }

    /// Whether any process holds a video device
    pub fn scan(&self) -> Result<bool, ScanError> {
        Ok(self.find_holder()?.is_some())
    }

    /// Current presence state
    ///
    /// An unreadable process table counts as closed.
    pub fn presence(&self) -> Presence {
        info!("Checking for references to video devices.");
        match self.find_holder() {
            Ok(Some(holder)) => Presence::Opened(holder),
            Ok(None) => {
                info!("No references to video devices found.");
                Presence::Closed
            }
            Err(e) => {
                error!(error = %e, "Process scan failed, assuming devices are closed.");
                Presence::Closed
            }
        }
    }
}
