use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Advisory lock that keeps a second writer process away from the same
/// database file. Held for the lifetime of the value.
pub struct InstanceLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Lock file path for a database: `<db>.writer.lock` next to it
    pub fn lock_path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(".writer.lock");
        PathBuf::from(name)
    }

    /// Take the writer lock for `db_path`, failing if another process holds it
    pub fn for_database(db_path: &Path) -> Result<Self> {
        let lock_path = Self::lock_path_for(db_path);

        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let fd = lock_file.as_raw_fd();
            let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if result != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    anyhow::bail!(
                        "Another writer already holds the database. Lock file: {}",
                        lock_path.display()
                    );
                } else {
                    return Err(err).context("Failed to acquire lock");
                }
            }
        }

        // Record our PID only once the lock is ours
        let pid = std::process::id();
        lock_file.set_len(0).context("Failed to truncate lock file")?;
        let mut handle = lock_file
            .try_clone()
            .context("Failed to clone file handle")?;
        writeln!(handle, "{}", pid).context("Failed to write PID to lock file")?;

        info!("Acquired writer lock at {}", lock_path.display());
        debug!("Process ID: {}", pid);

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether some process currently holds the writer lock for `db_path`
    pub fn is_locked(db_path: &Path) -> Result<bool> {
        let lock_path = Self::lock_path_for(db_path);

        if !lock_path.exists() {
            return Ok(false);
        }

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let lock_file = match OpenOptions::new().read(true).open(&lock_path) {
                Ok(file) => file,
                Err(_) => return Ok(false),
            };

            let fd = lock_file.as_raw_fd();
            let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };

            if result != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    return Ok(true);
                }
            }

            unsafe {
                libc::flock(fd, libc::LOCK_UN);
            }

            Ok(false)
        }

        #[cfg(not(unix))]
        {
            Ok(lock_path.exists())
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let fd = self.lock_file.as_raw_fd();
            unsafe {
                libc::flock(fd, libc::LOCK_UN);
            }
        }

        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            eprintln!("Failed to remove lock file: {}", e);
        } else {
            debug!("Released writer lock at {}", self.lock_path.display());
        }
    }
}
