//! Video device classification
//!
//! Two path shapes reach the classifier: bare names from the directory
//! watch (`video0`) and absolute paths from device watches or descriptor
//! links (`/dev/video0`). Both must classify the same way.

use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Directory where the kernel exposes device nodes
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// Base name prefix of video capture device nodes
pub const DEFAULT_DEVICE_PREFIX: &str = "video";

/// Predicate over paths naming video device nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceClass {
    /// Directory that holds the device nodes
    dir: PathBuf,
    /// Required prefix of the node's file name
    prefix: String,
}

impl DeviceClass {
    /// Create a classifier for the given device directory and name prefix
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Device directory being classified against
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name prefix of video devices
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Check whether `path` names a video device node
    ///
    /// Absolute paths must live under the device directory. Relative
    /// paths are judged by their final component only.
    pub fn is_video_device(&self, path: &Path) -> bool {
        if path.is_absolute() && !path.starts_with(&self.dir) {
            return false;
        }

        path.file_name()
            .is_some_and(|name| name.as_bytes().starts_with(self.prefix.as_bytes()))
    }

    /// Absolute path of a node name relative to the device directory
    pub fn device_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }
}

impl Default for DeviceClass {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_DIR, DEFAULT_DEVICE_PREFIX)
    }
}
