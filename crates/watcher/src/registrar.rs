//! Watch registration for the device directory and device nodes
//!
//! Device nodes come and go with hot-plug, sometimes faster than a watch
//! can be placed on them. A creation event in the device directory is the
//! signal to (re)attach the per-device watch, with a bounded number of
//! attempts to cover the window where the node exists but cannot be
//! watched yet.

use crate::backend::WatchBackend;
use crate::error::WatchError;
use camwatch_core::DeviceClass;
use inotify::WatchMask;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Events watched on the device directory
pub const DIRECTORY_MASK: WatchMask = WatchMask::CREATE;

/// Events watched on each device node
pub const DEVICE_MASK: WatchMask = WatchMask::OPEN.union(WatchMask::CLOSE);

/// Bounds for re-arming a device watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total add attempts, including the first
    pub max_attempts: u32,
    /// Pause between failed attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Progress of a single re-arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RearmState {
    /// About to make attempt number `attempt` (1-based)
    Attempting { attempt: u32 },
    /// Watch added on attempt `attempts`
    Succeeded { attempts: u32 },
    /// Every attempt failed
    Exhausted { attempts: u32 },
}

impl RearmState {
    pub fn start() -> Self {
        RearmState::Attempting { attempt: 1 }
    }

    /// Transition after the current attempt succeeded
    pub fn succeed(self) -> Self {
        match self {
            RearmState::Attempting { attempt } => RearmState::Succeeded { attempts: attempt },
            done => done,
        }
    }

    /// Transition after the current attempt failed
    pub fn fail(self, policy: &RetryPolicy) -> Self {
        match self {
            RearmState::Attempting { attempt } if attempt >= policy.max_attempts => {
                RearmState::Exhausted { attempts: attempt }
            }
            RearmState::Attempting { attempt } => RearmState::Attempting {
                attempt: attempt + 1,
            },
            done => done,
        }
    }

    pub fn is_done(&self) -> bool {
        !matches!(self, RearmState::Attempting { .. })
    }
}

/// Owner of every watch on the device directory and its nodes
pub struct WatchRegistrar<B> {
    backend: B,
    class: DeviceClass,
    policy: RetryPolicy,
    directory_watched: bool,
}

impl<B: WatchBackend> WatchRegistrar<B> {
    pub fn new(backend: B, class: DeviceClass, policy: RetryPolicy) -> Self {
        Self {
            backend,
            class,
            policy,
            directory_watched: false,
        }
    }

    pub fn class(&self) -> &DeviceClass {
        &self.class
    }

    /// Watch the device directory for node creation
    ///
    /// Only the first call registers a watch.
    pub fn watch_directory(&mut self, path: &Path, mask: WatchMask) -> Result<(), WatchError> {
        if self.directory_watched {
            return Ok(());
        }

        self.backend
            .add_watch(path, mask)
            .map_err(|source| WatchError::Directory {
                path: path.to_path_buf(),
                source,
            })?;
        self.directory_watched = true;
        debug!(directory = %path.display(), "Watching device directory.");
        Ok(())
    }

    /// Watch a single device node, one attempt
    pub fn watch_device(&mut self, path: &Path, mask: WatchMask) -> Result<(), WatchError> {
        self.backend
            .add_watch(path, mask)
            .map_err(|source| WatchError::Device {
                path: path.to_path_buf(),
                source,
            })?;
        info!(device = %path.display(), "Added watch for device.");
        Ok(())
    }

    /// Watch the device directory, then every video device already in it
    ///
    /// Returns the number of device watches placed. Any failure is fatal.
    pub fn initialize(&mut self) -> Result<usize, WatchError> {
        let dir = self.class.dir().to_path_buf();
        self.watch_directory(&dir, DIRECTORY_MASK)?;

        let entries = std::fs::read_dir(&dir).map_err(|source| WatchError::List {
            path: dir.clone(),
            source,
        })?;

        let mut watched = 0;
        for entry in entries {
            let entry = entry.map_err(|source| WatchError::List {
                path: dir.clone(),
                source,
            })?;

            let name = entry.file_name();
            if !self.class.is_video_device(Path::new(&name)) {
                continue;
            }

            self.watch_device(&entry.path(), DEVICE_MASK)?;
            watched += 1;
        }

        Ok(watched)
    }

    /// Drop any watch on `path`; absent watches are fine
    fn unwatch(&mut self, path: &Path) {
        if let Err(e) = self.backend.remove_watch(path) {
            debug!(device = %path.display(), error = %e, "No watch to remove.");
        }
    }

    /// Replace the watch on a freshly created device node
    ///
    /// Each attempt removes the old watch before adding a new one. Failed
    /// attempts are retried after the policy delay until the attempt budget
    /// is spent, after which the node stays unwatched until its next
    /// creation event.
    pub async fn rearm(&mut self, path: &Path, mask: WatchMask) -> RearmState {
        let mut state = RearmState::start();

        while let RearmState::Attempting { attempt } = state {
            self.unwatch(path);

            match self.backend.add_watch(path, mask) {
                Ok(()) => {
                    info!(device = %path.display(), attempt, "Added watch for device.");
                    state = state.succeed();
                }
                Err(e) => {
                    state = state.fail(&self.policy);
                    if state.is_done() {
                        error!(device = %path.display(), attempt, error = %e, "Giving up on device watch.");
                    } else {
                        warn!(device = %path.display(), attempt, error = %e, "Failed to add watch for device.");
                        tokio::time::sleep(self.policy.delay).await;
                        info!(device = %path.display(), "Retrying...");
                    }
                }
            }
        }

        state
    }
}
