//! One-shot process table scan

use anyhow::{Context, Result};
use camwatch_core::Config;
use owo_colors::OwoColorize;
use watcher::{ProcFs, ProcessScanner};

pub async fn run(config: &Config) -> Result<()> {
    let scanner = ProcessScanner::new(ProcFs::new(&config.scan.proc_root), config.device_class());

    let holder = tokio::task::spawn_blocking(move || scanner.find_holder())
        .await
        .context("Scan task failed")?
        .context("Failed to scan process table")?;

    match holder {
        Some(holder) => println!(
            "{} {} (pid {})",
            "opened".green().bold(),
            holder.device.display(),
            holder.pid
        ),
        None => println!("{}", "closed".yellow().bold()),
    }

    Ok(())
}
