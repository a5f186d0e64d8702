//! Camwatch Core - shared primitives for video device presence detection
//!
//! This crate provides:
//! - Video device classification (pure path predicate)
//! - Presence state and hook action types
//! - TOML configuration with validation

pub mod config;
pub mod device;
pub mod presence;

// Re-export main types for convenience
pub use config::{Config, ConfigError};
pub use device::{DeviceClass, DEFAULT_DEVICE_DIR, DEFAULT_DEVICE_PREFIX};
pub use presence::{DeviceHolder, HookAction, Presence};
