//! Hook script execution
//!
//! Every configured script runs once per transition, in order, with the
//! parent environment plus the action variable. Output goes straight to
//! our stdout/stderr. A script that fails to start or exits non-zero is
//! logged and the next one still runs.

use async_trait::async_trait;
use camwatch_core::HookAction;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, warn};
use watcher::Hooks;

/// Runs external scripts on presence transitions
#[derive(Debug, Clone)]
pub struct ScriptHooks {
    scripts: Vec<PathBuf>,
    action_var: String,
}

impl ScriptHooks {
    pub fn new(scripts: Vec<PathBuf>, action_var: impl Into<String>) -> Self {
        Self {
            scripts,
            action_var: action_var.into(),
        }
    }

    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    async fn run_script(&self, script: &Path, action: HookAction) {
        info!(script = %script.display(), "Running script {}...", script.display());

        let status = Command::new(script)
            .env(&self.action_var, action.as_env_value())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                warn!(script = %script.display(), status = %status, "Script exited with failure.");
            }
            Err(e) => {
                error!(script = %script.display(), error = %e, "Failed to run script.");
            }
        }
    }
}

#[async_trait]
impl Hooks for ScriptHooks {
    async fn fire(&self, action: HookAction) {
        match action {
            HookAction::Open => info!("Triggering device opened hook."),
            HookAction::Close => info!("Triggering device closed hook."),
        }

        for script in &self.scripts {
            self.run_script(script, action).await;
        }
    }
}
