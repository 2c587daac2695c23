//! Per-signature advisory file locks.
//!
//! On unix the lock is `flock(LOCK_EX)` on `{root}/{signature}.lock`. flock
//! locks belong to the open file description, so two threads of one process
//! opening the file separately exclude each other exactly like two processes
//! do. The kernel drops the lock when the descriptor closes, including on
//! process death, so an abandoned build never wedges the signature.
//!
//! Lock files are never deleted: unlinking a lock file while another caller
//! holds a descriptor to it would let a third caller lock a fresh inode.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Held exclusive lock; released on drop.
#[derive(Debug)]
pub(crate) struct SignatureLock {
    #[cfg(unix)]
    _file: File,
    #[cfg(not(unix))]
    held: std::path::PathBuf,
}

fn open(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(unix)]
impl SignatureLock {
    /// Blocks until the lock at `path` is acquired.
    pub(crate) fn acquire(path: &Path) -> io::Result<Self> {
        let file = open(path)?;
        flock(&file, libc::LOCK_EX)?;
        Ok(Self { _file: file })
    }

    /// Acquires the lock if it is free; `None` if someone else holds it.
    pub(crate) fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        let file = open(path)?;
        match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
            Ok(()) => Ok(Some(Self { _file: file })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn flock(file: &File, op: libc::c_int) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: the descriptor is owned by `file` and open for this call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

// Without flock the lock is a `<name>.held` file created exclusively. It is
// removed on drop but not on process death.
#[cfg(not(unix))]
impl SignatureLock {
    pub(crate) fn acquire(path: &Path) -> io::Result<Self> {
        let mut pause = std::time::Duration::from_millis(5);
        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }
            std::thread::sleep(pause);
            pause = (pause * 2).min(std::time::Duration::from_millis(200));
        }
    }

    pub(crate) fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
        drop(open(path)?);
        let held = path.with_extension("lock.held");
        match OpenOptions::new().write(true).create_new(true).open(&held) {
            Ok(_) => Ok(Some(Self { held })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(not(unix))]
impl Drop for SignatureLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.held);
    }
}
