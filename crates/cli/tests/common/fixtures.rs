//! Test environment with a fake device directory and process table

use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated config home, device directory and procfs tree
pub struct TestEnv {
    root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["config", "dev", "proc"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Value for `XDG_CONFIG_HOME`
    pub fn config_home(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn dev_dir(&self) -> PathBuf {
        self.path().join("dev")
    }

    pub fn proc_root(&self) -> PathBuf {
        self.path().join("proc")
    }

    /// Create a device node placeholder
    pub fn add_device(&self, name: &str) -> PathBuf {
        let path = self.dev_dir().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    /// Add a process whose descriptors link to `targets`
    pub fn add_process(&self, pid: u32, targets: &[&str]) {
        let fd_dir = self.proc_root().join(pid.to_string()).join("fd");
        std::fs::create_dir_all(&fd_dir).unwrap();
        for (fd, target) in targets.iter().enumerate() {
            symlink(target, fd_dir.join(fd.to_string())).unwrap();
        }
    }

    /// Write an executable shell script
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Write the config file at its default location under the config home
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let dir = self.config_home().join("camwatch");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let contents = format!(
            "[devices]\ndirectory = \"{}\"\n\n[scan]\nproc_root = \"{}\"\ndebounce_ms = 50\n\n{}",
            self.dev_dir().display(),
            self.proc_root().display(),
            extra
        );
        std::fs::write(&path, contents).unwrap();
        path
    }
}
