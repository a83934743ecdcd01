//! Process-external named locks backed by exclusive OS file locks.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::infrastructure::error::{InfraError, InfraResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_NAME_LEN: usize = 64;

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct NamedLock {
    name: String,
    path: PathBuf,
    file: Option<File>,
}

impl NamedLock {
    /// Polls for the lock named `name` under `lock_dir` until `timeout` elapses.
    #[instrument(level = "debug", skip(lock_dir))]
    pub fn acquire(lock_dir: &Path, name: &str, timeout: Duration) -> InfraResult<Self> {
        fs::create_dir_all(lock_dir)
            .map_err(|e| InfraError::io(format!("create {}", lock_dir.display()), e))?;

        let path = lock_dir.join(format!("{}.lock", lock_file_stem(name)));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| InfraError::io(format!("open {}", path.display()), e))?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("acquired lock '{}' at {}", name, path.display());
                    return Ok(Self {
                        name: name.to_string(),
                        path,
                        file: Some(file),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || is_contended(&e) => {
                    if Instant::now() >= deadline {
                        return Err(InfraError::LockTimeout {
                            name: name.to_string(),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(InfraError::io(format!("lock {}", path.display()), e));
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(&mut self) -> InfraResult<()> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| InfraError::io(format!("unlock {}", self.path.display()), e))?;
            debug!("released lock '{}'", self.name);
        }
        Ok(())
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("failed to release lock '{}': {}", self.name, e);
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// File-system safe stem for a lock name; long names keep a prefix and get
/// a SHA-256 suffix so distinct names stay distinct.
pub fn lock_file_stem(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.len() <= MAX_NAME_LEN && sanitized == name {
        return sanitized;
    }
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    let prefix: String = sanitized.chars().take(MAX_NAME_LEN - 17).collect();
    format!("{}-{}", prefix, &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_plain_name_is_kept() {
        assert_eq!(lock_file_stem("tree-structure"), "tree-structure");
    }

    #[test]
    fn test_unsafe_or_long_names_get_hash_suffix() {
        let stem = lock_file_stem("a/b");
        assert!(stem.starts_with("a_b-"));
        assert_ne!(stem, lock_file_stem("a_b"));

        let long = "x".repeat(200);
        assert!(lock_file_stem(&long).len() <= MAX_NAME_LEN);
    }
}
