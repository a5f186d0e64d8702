//! Presence state and hook actions

use std::fmt;
use std::path::PathBuf;

/// A process found holding a video device open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHolder {
    /// Resolved device path of the descriptor
    pub device: PathBuf,
    /// Process identifier owning the descriptor
    pub pid: u32,
}

/// Derived open/closed status of the monitored device class
///
/// Recomputed from the process table on every scan, never tracked
/// incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Some process holds a video device open
    Opened(DeviceHolder),
    /// No process references any video device
    Closed,
}

impl Presence {
    /// Whether any video device is in use
    pub fn is_open(&self) -> bool {
        matches!(self, Presence::Opened(_))
    }

    /// Hook action corresponding to this state
    pub fn action(&self) -> HookAction {
        match self {
            Presence::Opened(_) => HookAction::Open,
            Presence::Closed => HookAction::Close,
        }
    }
}

impl From<Option<DeviceHolder>> for Presence {
    fn from(holder: Option<DeviceHolder>) -> Self {
        holder.map_or(Presence::Closed, Presence::Opened)
    }
}

/// Action passed to hook scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    /// A video device was opened
    Open,
    /// All video devices are closed
    Close,
}

impl HookAction {
    /// Value exported to hook scripts
    pub fn as_env_value(&self) -> &'static str {
        match self {
            HookAction::Open => "OPEN",
            HookAction::Close => "CLOSE",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_value())
    }
}
