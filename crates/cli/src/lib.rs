//! Camwatch CLI library
//!
//! Pieces of the `camwatch` binary that are worth testing on their own:
//! hook script execution, settings resolution and log setup.

pub mod hooks;
pub mod logging;
pub mod settings;

pub use hooks::ScriptHooks;
