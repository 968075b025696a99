//! Per-build file locks.
//!
//! Two invocations building the same key would race on the same store folder,
//! so the key doubles as the lock name: `<store>/locks/<key>.lock`. Locks are
//! exclusive and never wait. A second builder fails immediately and reports
//! who holds the lock.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::util::hash::ObjectHash;

const LOCKS_DIR: &str = "locks";

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub key: String,
}

#[derive(Debug, Error)]
pub enum BuildLockError {
  #[error(
    "build {key} is locked by another process: {command} (PID {pid}, started at Unix time {started_at_unix})\n\
     If you're sure no qtmd process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    key: String,
    command: String,
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error(
    "build is locked (could not read lock metadata)\n\
     If you're sure no qtmd process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one build key, released on drop.
#[derive(Debug)]
pub struct BuildLock {
  file: File,
  lock_path: PathBuf,
}

impl BuildLock {
  pub fn lock_path_for(store: &Path, key: &ObjectHash) -> PathBuf {
    store.join(LOCKS_DIR).join(format!("{key}.lock"))
  }

  pub fn acquire(store: &Path, key: &ObjectHash, command: &str) -> Result<Self, BuildLockError> {
    let lock_path = Self::lock_path_for(store, key);
    if let Some(parent) = lock_path.parent() {
      std::fs::create_dir_all(parent).map_err(BuildLockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(BuildLockError::OpenFile)?;

    if let Err(err) = try_lock_exclusive(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::contention_error(&lock_path));
      }
      return Err(BuildLockError::LockFailed(err));
    }

    write_metadata(&file, command, key)?;
    debug!(key = %key, path = %lock_path.display(), "build lock acquired");

    Ok(BuildLock { file, lock_path })
  }

  /// Read the metadata through the held handle.
  ///
  /// Opening the file again would fail on Windows while the lock is held.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn contention_error(lock_path: &Path) -> BuildLockError {
    let metadata = std::fs::read_to_string(lock_path)
      .ok()
      .and_then(|contents| serde_json::from_str::<LockMetadata>(&contents).ok());

    match metadata {
      Some(metadata) => BuildLockError::Contention {
        key: metadata.key,
        command: metadata.command,
        pid: metadata.pid,
        started_at_unix: metadata.started_at_unix,
        lock_path: lock_path.to_path_buf(),
      },
      None => BuildLockError::ContentionUnknown {
        lock_path: lock_path.to_path_buf(),
      },
    }
  }
}

fn write_metadata(file: &File, command: &str, key: &ObjectHash) -> Result<(), BuildLockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    command: command.to_string(),
    key: key.to_string(),
  };

  file.set_len(0).map_err(BuildLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| BuildLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(BuildLockError::WriteMetadata)
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is plain data and valid when zeroed; the handle is owned by `file`.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    let err = io::Error::last_os_error();
    // ERROR_LOCK_VIOLATION
    if err.raw_os_error() == Some(33) {
      return Err(io::Error::new(io::ErrorKind::WouldBlock, err));
    }
    Err(err)
  } else {
    Ok(())
  }
}
