//! Kernel watch facility
//!
//! The registrar talks to a [`WatchBackend`] keyed by path. The inotify
//! implementation keeps a descriptor table shared with its event stream so
//! raw `(wd, name)` events come out as device paths.

use crate::error::WatchError;
use futures::{future, Stream, StreamExt};
use inotify::{Event, EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Size of the inotify read buffer
const EVENT_BUFFER_SIZE: usize = 4096;

/// Path-keyed watch registration
pub trait WatchBackend: Send {
    /// Watch `path` for the event kinds in `mask`
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<()>;

    /// Drop the watch on `path`
    ///
    /// Returns `NotFound` when no watch is registered for the path.
    fn remove_watch(&mut self, path: &Path) -> io::Result<()>;
}

/// A filesystem notification attributed to a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Watched path the event refers to. `None` for events without a
    /// target such as queue overflow.
    pub path: Option<PathBuf>,
    /// Event kinds; several bits may be set at once
    pub mask: EventMask,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, mask: EventMask) -> Self {
        Self {
            path: Some(path.into()),
            mask,
        }
    }
}

/// Descriptor <-> path table shared by the backend and its event stream
#[derive(Debug, Clone, Default)]
pub struct WatchTable {
    inner: Arc<Mutex<TableInner>>,
}

#[derive(Debug, Default)]
struct TableInner {
    by_wd: HashMap<WatchDescriptor, PathBuf>,
    by_path: HashMap<PathBuf, WatchDescriptor>,
}

impl WatchTable {
    fn insert(&self, wd: WatchDescriptor, path: PathBuf) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.by_path.insert(path.clone(), wd.clone()) {
            if old != wd {
                inner.by_wd.remove(&old);
            }
        }
        inner.by_wd.insert(wd, path);
    }

    fn take_path(&self, path: &Path) -> Option<WatchDescriptor> {
        let mut inner = self.inner.lock();
        let wd = inner.by_path.remove(path)?;
        inner.by_wd.remove(&wd);
        Some(wd)
    }

    /// Forget a descriptor the kernel has dropped
    fn forget(&self, wd: &WatchDescriptor) -> Option<PathBuf> {
        let mut inner = self.inner.lock();
        let path = inner.by_wd.remove(wd)?;
        if inner.by_path.get(&path) == Some(wd) {
            inner.by_path.remove(&path);
        }
        Some(path)
    }

    /// Attribute a raw event to a path
    ///
    /// Directory watches report the entry name, which is joined onto the
    /// directory. Watches on a file report no name.
    fn resolve(&self, event: Event<OsString>) -> Option<FsEvent> {
        if event.mask.contains(EventMask::Q_OVERFLOW) {
            return Some(FsEvent {
                path: None,
                mask: event.mask,
            });
        }

        let base = if event.mask.contains(EventMask::IGNORED) {
            let path = self.forget(&event.wd);
            debug!(path = ?path, "Kernel dropped watch.");
            path?
        } else {
            self.inner.lock().by_wd.get(&event.wd).cloned()?
        };

        let path = match event.name {
            Some(name) => base.join(name),
            None => base,
        };

        Some(FsEvent {
            path: Some(path),
            mask: event.mask,
        })
    }

    /// Number of live watches
    pub fn len(&self) -> usize {
        self.inner.lock().by_wd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// inotify-backed watch registration
pub struct InotifyBackend {
    watches: Watches,
    table: WatchTable,
}

impl InotifyBackend {
    /// Watch table shared with the event stream
    pub fn table(&self) -> &WatchTable {
        &self.table
    }
}

impl WatchBackend for InotifyBackend {
    fn add_watch(&mut self, path: &Path, mask: WatchMask) -> io::Result<()> {
        let wd = self.watches.add(path, mask)?;
        self.table.insert(wd, path.to_path_buf());
        Ok(())
    }

    fn remove_watch(&mut self, path: &Path) -> io::Result<()> {
        let wd = self.table.take_path(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no watch registered for {}", path.display()),
            )
        })?;
        self.watches.remove(wd)
    }
}

/// Open the inotify subsystem
///
/// Returns the registration half and the event stream. The inotify file
/// descriptor is closed once both halves are dropped.
pub fn open_inotify(
) -> Result<(InotifyBackend, impl Stream<Item = io::Result<FsEvent>>), WatchError> {
    let inotify = Inotify::init().map_err(WatchError::Init)?;
    let watches = inotify.watches();
    let stream = inotify
        .into_event_stream([0u8; EVENT_BUFFER_SIZE])
        .map_err(WatchError::Init)?;

    let table = WatchTable::default();
    let events = {
        let table = table.clone();
        stream.filter_map(move |item| {
            let resolved = match item {
                Ok(event) => table.resolve(event).map(Ok),
                Err(e) => Some(Err(e)),
            };
            future::ready(resolved)
        })
    };

    Ok((InotifyBackend { watches, table }, events))
}
