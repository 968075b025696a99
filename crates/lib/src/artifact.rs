//! Artifact description and verification.
//!
//! A recipe statically declares which include directories and libraries its
//! package provides. After installation the declaration is checked against the
//! package folder so a package that would fail to link downstream is never
//! described, cached or published.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::PACKAGE_INFO_FILE;
use crate::platform::os::Os;
use crate::settings::{Compiler, Settings};

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("package does not contain the declared artifacts: {}", missing.join(", "))]
  Mismatch { missing: Vec<String> },

  #[error("failed to write {path}: {message}")]
  Write { path: PathBuf, message: String },
}

/// Include directories and library names a package exposes to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
  #[serde(default)]
  pub include_dirs: Vec<String>,
  #[serde(default)]
  pub libs: Vec<String>,
}

impl PackageInfo {
  pub fn new(include_dirs: &[&str], libs: &[&str]) -> Self {
    Self {
      include_dirs: include_dirs.iter().map(|s| s.to_string()).collect(),
      libs: libs.iter().map(|s| s.to_string()).collect(),
    }
  }
}

/// File names under which a linkable library `name` may be installed.
pub fn library_file_names(name: &str, settings: &Settings, shared: bool) -> Vec<String> {
  let msvc = settings.compiler == Compiler::Msvc;

  match (settings.os, shared) {
    (Os::Windows, _) if msvc => vec![format!("{name}.lib")],
    (Os::Windows, true) => vec![format!("lib{name}.dll.a"), format!("{name}.lib")],
    (Os::Windows, false) => vec![format!("lib{name}.a"), format!("{name}.lib")],
    (Os::Linux, true) => vec![format!("lib{name}.so")],
    (Os::MacOs, true) => vec![format!("lib{name}.dylib")],
    (_, false) => vec![format!("lib{name}.a")],
  }
}

/// Check that every declared artifact exists under `package_dir`.
///
/// Returns the paths of the libraries found, in declaration order.
pub fn verify_artifacts(
  info: &PackageInfo,
  package_dir: &Path,
  settings: &Settings,
  shared: bool,
) -> Result<Vec<PathBuf>, ArtifactError> {
  let lib_dir = package_dir.join("lib");
  let mut found = Vec::with_capacity(info.libs.len());
  let mut missing = Vec::new();

  for include in &info.include_dirs {
    if !package_dir.join(include).is_dir() {
      missing.push(format!("include directory '{include}'"));
    }
  }

  for lib in &info.libs {
    let candidates = library_file_names(lib, settings, shared);
    match candidates.iter().map(|c| lib_dir.join(c)).find(|p| p.is_file()) {
      Some(path) => {
        debug!(lib = %lib, path = %path.display(), "found library");
        found.push(path);
      }
      None => missing.push(format!("library '{lib}' (looked for {} in lib/)", candidates.join(" or "))),
    }
  }

  if !missing.is_empty() {
    return Err(ArtifactError::Mismatch { missing });
  }

  info!(libs = found.len(), package = %package_dir.display(), "package artifacts verified");
  Ok(found)
}

/// Write `package_info.json` into the package folder.
pub fn write_package_info(info: &PackageInfo, package_dir: &Path) -> Result<PathBuf, ArtifactError> {
  let path = package_dir.join(PACKAGE_INFO_FILE);
  let write_err = |message: String| ArtifactError::Write {
    path: path.clone(),
    message,
  };

  let content = serde_json::to_string_pretty(info).map_err(|e| write_err(e.to_string()))?;
  std::fs::write(&path, format!("{content}\n")).map_err(|e| write_err(e.to_string()))?;
  Ok(path)
}

/// Read a package's `package_info.json`.
pub fn read_package_info(package_dir: &Path) -> Option<PackageInfo> {
  let content = std::fs::read_to_string(package_dir.join(PACKAGE_INFO_FILE)).ok()?;
  serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::arch::Arch;
  use tempfile::TempDir;

  fn settings(os: Os) -> Settings {
    Settings::new(os, Arch::X86_64)
  }

  fn info() -> PackageInfo {
    PackageInfo::new(&["include"], &["QtMarkdownParser", "QtMarkdownRender"])
  }

  fn install(dir: &Path, files: &[&str]) {
    std::fs::create_dir_all(dir.join("include")).unwrap();
    std::fs::create_dir_all(dir.join("lib")).unwrap();
    for file in files {
      std::fs::write(dir.join("lib").join(file), b"").unwrap();
    }
  }

  #[test]
  fn library_names_follow_platform_conventions() {
    assert_eq!(library_file_names("X", &settings(Os::Linux), false), vec!["libX.a"]);
    assert_eq!(library_file_names("X", &settings(Os::Linux), true), vec!["libX.so"]);
    assert_eq!(library_file_names("X", &settings(Os::MacOs), true), vec!["libX.dylib"]);
    assert_eq!(library_file_names("X", &settings(Os::Windows), true), vec!["X.lib"]);
    assert_eq!(library_file_names("X", &settings(Os::Windows), false), vec!["X.lib"]);

    let mingw = Settings {
      compiler: Compiler::Gcc,
      ..settings(Os::Windows)
    };
    assert_eq!(library_file_names("X", &mingw, true), vec!["libX.dll.a", "X.lib"]);
  }

  #[test]
  fn verify_succeeds_when_everything_is_installed() {
    let temp = TempDir::new().unwrap();
    install(temp.path(), &["libQtMarkdownParser.a", "libQtMarkdownRender.a"]);

    let found = verify_artifacts(&info(), temp.path(), &settings(Os::Linux), false).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found[0].ends_with("libQtMarkdownParser.a"));
  }

  #[test]
  fn verify_reports_every_missing_library() {
    let temp = TempDir::new().unwrap();
    install(temp.path(), &["libQtMarkdownParser.a"]);

    let err = verify_artifacts(&info(), temp.path(), &settings(Os::Linux), false).unwrap_err();
    match err {
      ArtifactError::Mismatch { missing } => {
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("QtMarkdownRender"));
      }
      other => panic!("expected mismatch, got {other:?}"),
    }
  }

  #[test]
  fn verify_rejects_static_library_when_shared_was_requested() {
    let temp = TempDir::new().unwrap();
    install(temp.path(), &["libQtMarkdownParser.a", "libQtMarkdownRender.a"]);

    let result = verify_artifacts(&info(), temp.path(), &settings(Os::Linux), true);
    assert!(matches!(result, Err(ArtifactError::Mismatch { .. })));
  }

  #[test]
  fn verify_requires_include_dirs() {
    let temp = TempDir::new().unwrap();
    install(temp.path(), &["libQtMarkdownParser.a", "libQtMarkdownRender.a"]);
    std::fs::remove_dir(temp.path().join("include")).unwrap();

    let err = verify_artifacts(&info(), temp.path(), &settings(Os::Linux), false).unwrap_err();
    assert!(err.to_string().contains("include directory 'include'"));
  }

  #[test]
  fn package_info_file_is_readable_back() {
    let temp = TempDir::new().unwrap();
    write_package_info(&info(), temp.path()).unwrap();
    assert_eq!(read_package_info(temp.path()), Some(info()));
  }
}
