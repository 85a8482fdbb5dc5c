//! Output directory run lock.

use crate::constants::{LOCK_FILE_NAME, LOCK_STALE_AFTER};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Lock file content for debugging.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that holds the lock.
    pub pid: u32,
    /// Hostname of the machine.
    pub hostname: String,
    /// When the lock was acquired.
    pub started: DateTime<Utc>,
}

/// RAII guard that keeps other runs out of an output directory.
#[derive(Debug)]
pub struct RunLock {
    lock_path: PathBuf,
}

impl RunLock {
    /// Acquire the lock for `output_dir`.
    ///
    /// A lock left behind by a run that died without cleaning up is
    /// removed and acquisition is retried once.
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        match Self::try_create(output_dir) {
            Err(Error::RunLocked { path }) if Self::is_stale(output_dir, LOCK_STALE_AFTER) => {
                match Self::holder(output_dir) {
                    Some(info) => warn!(
                        "Removing stale lock {} left by pid {} on {} (started {})",
                        path.display(),
                        info.pid,
                        info.hostname,
                        info.started.to_rfc3339()
                    ),
                    None => warn!("Removing stale lock {}", path.display()),
                }
                Self::remove_stale(output_dir)?;
                Self::try_create(output_dir)
            }
            other => other,
        }
    }

    fn try_create(output_dir: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(output_dir);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path);

        match file {
            Ok(mut f) => {
                let info = LockInfo {
                    pid: std::process::id(),
                    hostname: current_hostname(),
                    started: Utc::now(),
                };

                let json = serde_json::to_string_pretty(&info).unwrap_or_else(|_| "{}".to_string());
                if let Err(e) = f.write_all(json.as_bytes()).and_then(|()| f.sync_all()) {
                    drop(f);
                    let _ = fs::remove_file(&lock_path);
                    return Err(Error::LockCreate {
                        path: lock_path,
                        source: e,
                    });
                }

                register_lock(&lock_path);

                Ok(Self { lock_path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::RunLocked { path: lock_path })
            }
            Err(e) => Err(Error::LockCreate {
                path: lock_path,
                source: e,
            }),
        }
    }

    /// Lock file path for an output directory.
    pub fn lock_path_for(output_dir: &Path) -> PathBuf {
        output_dir.join(LOCK_FILE_NAME)
    }

    /// Whether `output_dir` is currently locked.
    pub fn is_locked(output_dir: &Path) -> bool {
        Self::lock_path_for(output_dir).exists()
    }

    /// Read the holder's details, if the lock file is readable.
    pub fn holder(output_dir: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(Self::lock_path_for(output_dir)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Check if a lock is stale: its holder ran on this host and is gone,
    /// or the file is older than `max_age`.
    pub fn is_stale(output_dir: &Path, max_age: Duration) -> bool {
        let lock_path = Self::lock_path_for(output_dir);

        if let Some(info) = Self::holder(output_dir)
            && info.hostname == current_hostname()
            && process_is_gone(info.pid)
        {
            return true;
        }

        if let Ok(metadata) = fs::metadata(&lock_path)
            && let Ok(modified) = metadata.modified()
        {
            return modified.elapsed().unwrap_or_default() > max_age;
        }
        false
    }

    /// Remove a stale lock.
    pub fn remove_stale(output_dir: &Path) -> Result<()> {
        let lock_path = Self::lock_path_for(output_dir);
        match fs::remove_file(&lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::LockRemove {
                path: lock_path,
                source: e,
            }),
        }
    }
}

fn current_hostname() -> String {
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

/// Whether `pid` is known not to be running. Platforms without `/proc`
/// never report a process as gone.
#[cfg(target_os = "linux")]
fn process_is_gone(pid: u32) -> bool {
    pid != std::process::id() && !Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_is_gone(_pid: u32) -> bool {
    false
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        unregister_lock(&self.lock_path);
    }
}

/// Global registry of active lock paths for cleanup on signal.
static ACTIVE_LOCKS: std::sync::LazyLock<std::sync::Mutex<Vec<PathBuf>>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(Vec::new()));

fn register_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.push(path.to_path_buf());
    }
}

fn unregister_lock(path: &Path) {
    if let Ok(mut locks) = ACTIVE_LOCKS.lock() {
        locks.retain(|p| p != path);
    }
}

/// Remove every lock this process holds. Called from the signal handler.
pub fn cleanup_all_locks() {
    if let Ok(locks) = ACTIVE_LOCKS.lock() {
        for lock_path in locks.iter() {
            let _ = fs::remove_file(lock_path);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_released_on_drop() {
        let temp_dir = TempDir::new().unwrap();

        let lock = RunLock::acquire(temp_dir.path()).unwrap();
        assert!(RunLock::is_locked(temp_dir.path()));
        let info = RunLock::holder(temp_dir.path()).unwrap();
        assert_eq!(info.pid, std::process::id());

        drop(lock);
        assert!(!RunLock::is_locked(temp_dir.path()));
    }

    #[test]
    fn test_second_run_is_refused() {
        let temp_dir = TempDir::new().unwrap();

        let _held = RunLock::acquire(temp_dir.path()).unwrap();
        let err = RunLock::acquire(temp_dir.path()).unwrap_err();
        assert!(matches!(err, Error::RunLocked { .. }));
        assert!(!RunLock::is_stale(temp_dir.path(), LOCK_STALE_AFTER));
    }

    fn write_lock(dir: &Path, pid: u32, hostname: &str) {
        let info = LockInfo {
            pid,
            hostname: hostname.to_string(),
            started: Utc::now(),
        };
        fs::write(
            RunLock::lock_path_for(dir),
            serde_json::to_string(&info).unwrap(),
        )
        .unwrap();
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_dead_holder_lock_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        // Above the kernel's pid_max, so never a live process.
        write_lock(temp_dir.path(), u32::MAX - 1, &current_hostname());
        assert!(RunLock::is_stale(temp_dir.path(), LOCK_STALE_AFTER));

        let _lock = RunLock::acquire(temp_dir.path()).unwrap();
        let info = RunLock::holder(temp_dir.path()).unwrap();
        assert_eq!(info.pid, std::process::id());
    }

    #[test]
    fn test_lock_from_other_host_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        write_lock(temp_dir.path(), u32::MAX - 1, "some-other-host.invalid");

        let err = RunLock::acquire(temp_dir.path()).unwrap_err();
        assert!(matches!(err, Error::RunLocked { .. }));
        assert!(RunLock::is_locked(temp_dir.path()));
    }

    #[test]
    fn test_remove_stale_missing_lock_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        RunLock::remove_stale(temp_dir.path()).unwrap();
    }
}
