//! Single-instance guard backed by a PID file

use crate::HarvestError;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Whether a process with this PID is running
pub fn is_process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Holds the PID file for the lifetime of a command
///
/// Dropping the guard removes the file, unless another process has since
/// written its own PID there.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
    pid: u32,
}

impl PidGuard {
    /// Claims the PID file for the current process
    ///
    /// # Returns
    ///
    /// * `Ok(PidGuard)` - The file now holds our PID
    /// * `Err(HarvestError::AlreadyRunning)` - A live process owns the file
    /// * `Err(HarvestError::Io)` - The file could not be written
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        Self::acquire_as(path.into(), std::process::id())
    }

    fn acquire_as(path: PathBuf, pid: u32) -> Result<Self, HarvestError> {
        if let Some(existing) = read_pid(&path) {
            if existing != pid && is_process_alive(existing) {
                return Err(HarvestError::AlreadyRunning { pid: existing });
            }
            tracing::warn!(
                "Removing stale PID file {} (PID {})",
                path.display(),
                existing
            );
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, pid.to_string())?;
        tracing::debug!("PID file {} written", path.display());

        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(self.pid) {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove PID file {}: {}", self.path.display(), e);
            }
        }
    }
}
