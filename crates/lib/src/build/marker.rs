use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::BUILD_COMPLETE_MARKER;
use crate::util::hash::{DirHashError, hash_directory};

use super::BuildLayout;

const MARKER_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum MarkerError {
  #[error("failed to read build marker: {message}")]
  Read { message: String },

  #[error("failed to parse build marker: {message}")]
  Parse { message: String },

  #[error("failed to write build marker: {message}")]
  Write { message: String },

  #[error(transparent)]
  Hash(#[from] DirHashError),
}

/// Contents of `.qtmd-complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMarker {
  pub version: u32,
  pub status: String,
  /// SHA-256 of the package folder.
  pub package_hash: String,
}

/// What the store holds for a build key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
  /// Verified package with a matching marker.
  Hit(BuildMarker),
  /// Leftovers of an interrupted or tampered build.
  Stale,
  Missing,
}

/// Hash the package folder and record it as complete.
pub fn write_marker(layout: &BuildLayout) -> Result<BuildMarker, MarkerError> {
  let marker = BuildMarker {
    version: MARKER_VERSION,
    status: "complete".to_string(),
    package_hash: hash_directory(&layout.package, &[])?.0,
  };

  let content = serde_json::to_string(&marker).map_err(|e| MarkerError::Write { message: e.to_string() })?;
  std::fs::write(layout.root.join(BUILD_COMPLETE_MARKER), format!("{content}\n"))
    .map_err(|e| MarkerError::Write { message: e.to_string() })?;

  Ok(marker)
}

pub fn read_marker(root: &Path) -> Result<Option<BuildMarker>, MarkerError> {
  let path = root.join(BUILD_COMPLETE_MARKER);
  if !path.exists() {
    return Ok(None);
  }

  let content = std::fs::read_to_string(&path).map_err(|e| MarkerError::Read { message: e.to_string() })?;
  let marker = serde_json::from_str(&content).map_err(|e| MarkerError::Parse { message: e.to_string() })?;
  Ok(Some(marker))
}

/// Inspect the store folder of a build.
pub fn cache_state(layout: &BuildLayout) -> CacheState {
  if !layout.root.exists() {
    return CacheState::Missing;
  }

  let marker = match read_marker(&layout.root) {
    Ok(Some(marker)) => marker,
    Ok(None) => {
      debug!(path = %layout.root.display(), "no completion marker");
      return CacheState::Stale;
    }
    Err(e) => {
      warn!(path = %layout.root.display(), error = %e, "unreadable completion marker");
      return CacheState::Stale;
    }
  };

  match hash_directory(&layout.package, &[]) {
    Ok(hash) if hash.0 == marker.package_hash => CacheState::Hit(marker),
    Ok(hash) => {
      warn!(
        path = %layout.package.display(),
        expected = %marker.package_hash,
        actual = %hash,
        "package contents changed since the build completed"
      );
      CacheState::Stale
    }
    Err(e) => {
      warn!(path = %layout.package.display(), error = %e, "failed to hash cached package");
      CacheState::Stale
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::settings::BuildType;
  use crate::util::hash::ObjectHash;
  use tempfile::TempDir;

  fn layout(store: &Path) -> BuildLayout {
    let layout = BuildLayout::new(store, &ObjectHash("a".repeat(20)), BuildType::Release);
    layout.create_dirs().unwrap();
    std::fs::create_dir_all(layout.package.join("lib")).unwrap();
    std::fs::write(layout.package.join("lib/libQtMarkdownParser.a"), b"archive").unwrap();
    layout
  }

  #[test]
  fn missing_folder_is_missing() {
    let store = TempDir::new().unwrap();
    let layout = BuildLayout::new(store.path(), &ObjectHash("b".repeat(20)), BuildType::Release);
    assert_eq!(cache_state(&layout), CacheState::Missing);
  }

  #[test]
  fn folder_without_marker_is_stale() {
    let store = TempDir::new().unwrap();
    assert_eq!(cache_state(&layout(store.path())), CacheState::Stale);
  }

  #[test]
  fn written_marker_is_a_hit() {
    let store = TempDir::new().unwrap();
    let layout = layout(store.path());
    let marker = write_marker(&layout).unwrap();

    assert_eq!(marker.package_hash.len(), 64);
    assert_eq!(cache_state(&layout), CacheState::Hit(marker));
  }

  #[test]
  fn tampered_package_is_stale() {
    let store = TempDir::new().unwrap();
    let layout = layout(store.path());
    write_marker(&layout).unwrap();

    std::fs::write(layout.package.join("lib/libQtMarkdownParser.a"), b"other").unwrap();
    assert_eq!(cache_state(&layout), CacheState::Stale);
  }

  #[test]
  fn garbage_marker_is_stale() {
    let store = TempDir::new().unwrap();
    let layout = layout(store.path());
    std::fs::write(layout.root.join(BUILD_COMPLETE_MARKER), "not json").unwrap();

    assert!(matches!(read_marker(&layout.root), Err(MarkerError::Parse { .. })));
    assert_eq!(cache_state(&layout), CacheState::Stale);
  }
}
