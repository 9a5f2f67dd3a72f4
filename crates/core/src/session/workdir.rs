use std::path::{Path, PathBuf};

use crate::error::Result;

/// Scoped change of the process working directory
///
/// The previous directory is restored when the guard drops, on every exit
/// path including errors and unwinding panics.
#[derive(Debug)]
pub struct WorkdirGuard {
    saved: PathBuf,
}

impl WorkdirGuard {
    /// Remember the current directory and move to `root`
    ///
    /// An empty `root` keeps the current directory.
    pub fn enter(root: &Path) -> Result<Self> {
        let saved = std::env::current_dir()?;
        if !root.as_os_str().is_empty() {
            std::env::set_current_dir(root)?;
            tracing::debug!(from = %saved.display(), to = %root.display(), "entered session root");
        }
        Ok(Self { saved })
    }

    /// The directory restored on drop
    pub fn saved(&self) -> &Path {
        &self.saved
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.saved) {
            tracing::warn!(dir = %self.saved.display(), "unable to restore working directory: {e}");
        }
    }
}

/// Serializes tests that move the process working directory
#[cfg(test)]
pub(crate) fn cwd_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
