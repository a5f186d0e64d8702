//! Configuration command
//!
//! Shows the effective configuration, where it is read from, or an
//! example file to start from.

use anyhow::{Context, Result};
use camwatch_core::Config;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path().context("Could not determine config file path"),
    }
}

/// List all effective configuration values
pub fn run_list(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let path = config_path(explicit)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };

    println!("{}", "Camwatch Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), source.dimmed());

    println!("{}", "[devices]".yellow());
    println!(
        "  {} = {}",
        "directory".cyan(),
        config.devices.directory.display()
    );
    println!("  {} = {}", "prefix".cyan(), config.devices.prefix);

    println!("\n{}", "[scan]".yellow());
    println!(
        "  {} = {}",
        "proc_root".cyan(),
        config.scan.proc_root.display()
    );
    println!(
        "  {} = {} {}",
        "debounce_ms".cyan(),
        config.scan.debounce_ms,
        format!("({:?})", config.debounce()).dimmed()
    );

    println!("\n{}", "[rearm]".yellow());
    println!("  {} = {}", "max_attempts".cyan(), config.rearm.max_attempts);
    println!(
        "  {} = {} {}",
        "retry_delay_ms".cyan(),
        config.rearm.retry_delay_ms,
        format!("({:?})", config.retry_delay()).dimmed()
    );

    println!("\n{}", "[hooks]".yellow());
    if config.hooks.scripts.is_empty() {
        println!(
            "  {} = {}",
            "scripts".cyan(),
            "(none, device access is only logged)".dimmed()
        );
    } else {
        println!("  {} =", "scripts".cyan());
        for script in &config.hooks.scripts {
            println!("    {}", script.display());
        }
    }
    println!("  {} = {}", "action_var".cyan(), config.hooks.action_var);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 10-60,000");
    println!("  max_attempts: 1-100");
    println!("  retry_delay_ms: 0-60,000");

    Ok(())
}

/// Print the config file location
pub fn run_path(explicit: Option<&Path>) -> Result<()> {
    println!("{}", config_path(explicit)?.display());
    Ok(())
}

/// Print an example config file with every default spelled out
pub fn run_example() -> Result<()> {
    print!("{}", Config::example());
    Ok(())
}
