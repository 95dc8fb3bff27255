//! Cross-process non-blocking exclusive lock for the Scheduler tick (spec
//! §4.10 step 1: "attempt non-blocking exclusive file lock at a well-known
//! path... if another process holds it, skip silently").
//!
//! Grounded on `kafclaw-audit::AuditChain`'s use of `fs2::FileExt` for the
//! audit append lock — same crate, same non-stealing discipline, applied
//! here to a tick-scoped advisory lock instead of an append-only file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::SchedulerResult;

/// A held exclusive lock, released on drop.
pub struct TickLock {
    file: File,
}

impl Drop for TickLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Try to acquire the scheduler's process-level tick lock at `path`.
///
/// Returns `Ok(None)` (never an error) if another process currently holds
/// the lock — the scheduler tick skips silently, per spec §4.10; it never
/// blocks or steals the lock from its holder.
///
/// # Errors
///
/// Returns an error if the lock file cannot be opened or created.
pub fn try_acquire(path: &Path) -> SchedulerResult<Option<TickLock>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).write(true).open(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(TickLock { file })),
        Err(_) => Ok(None),
    }
}

/// Default well-known lock file path relative to a base directory.
#[must_use]
pub fn default_lock_path(base_dir: &Path) -> PathBuf {
    base_dir.join("scheduler.lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquirer_is_skipped_not_blocked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sched.lock");

        let first = try_acquire(&path).unwrap();
        assert!(first.is_some());

        let second = try_acquire(&path).unwrap();
        assert!(second.is_none(), "contended lock must be skipped, not blocked on");
    }

    #[test]
    fn lock_is_reacquirable_after_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sched.lock");

        {
            let _held = try_acquire(&path).unwrap();
        }
        assert!(try_acquire(&path).unwrap().is_some());
    }
}
