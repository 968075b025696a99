use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Environment variable overriding the build store location.
pub const STORE_ENV: &str = "QTMD_STORE";

/// Environment variable overriding the local registry location.
pub const REGISTRY_ENV: &str = "QTMD_REGISTRY";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| std::env::temp_dir())
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Root of the build store. Every build key gets a directory below `<store>/build`.
pub fn store_dir() -> PathBuf {
  match std::env::var(STORE_ENV) {
    Ok(path) if !path.is_empty() => PathBuf::from(path),
    _ => data_dir().join("store"),
  }
}

/// Root of the local package registry.
pub fn registry_dir() -> PathBuf {
  match std::env::var(REGISTRY_ENV) {
    Ok(path) if !path.is_empty() => PathBuf::from(path),
    _ => data_dir().join("registry"),
  }
}
