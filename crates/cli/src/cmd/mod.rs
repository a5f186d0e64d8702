//! CLI command implementations

pub mod config;
pub mod scan;
pub mod watch;
