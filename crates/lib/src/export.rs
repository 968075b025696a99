//! Source export.
//!
//! Copies the files a recipe exports from the caller's source tree into the
//! build's `source/` folder, so every build works from its own snapshot.
//! Patterns are matched against paths relative to the source root with `/`
//! separators, and `*` also matches across directories: `src/*` exports the
//! whole `src` tree.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("source directory not found: {0}")]
  SourceMissing(PathBuf),

  #[error("invalid export pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },

  #[error("failed to walk source directory: {message}")]
  Walk { message: String },

  #[error("failed to copy {from} to {to}: {message}")]
  Copy { from: PathBuf, to: PathBuf, message: String },
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

/// Copy every file under `source` matching one of `patterns` into `dest`.
///
/// Returns the exported paths relative to `source`, sorted.
pub fn export_sources(patterns: &[String], source: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExportError> {
  if !source.is_dir() {
    return Err(ExportError::SourceMissing(source.to_path_buf()));
  }
  let source = &dunce::canonicalize(source).map_err(|_| ExportError::SourceMissing(source.to_path_buf()))?;

  let compiled = patterns
    .iter()
    .map(|pattern| {
      Pattern::new(pattern).map_err(|e| ExportError::Pattern {
        pattern: pattern.clone(),
        message: e.to_string(),
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  let mut hits = vec![0usize; compiled.len()];
  let mut exported = Vec::new();

  for entry in WalkDir::new(source).sort_by_file_name() {
    let entry = entry.map_err(|e| ExportError::Walk { message: e.to_string() })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
    let rel_str = rel.to_string_lossy().replace('\\', "/");

    let mut matched = false;
    for (i, pattern) in compiled.iter().enumerate() {
      if pattern.matches_with(&rel_str, MATCH_OPTIONS) {
        hits[i] += 1;
        matched = true;
      }
    }
    if !matched {
      continue;
    }

    let target = dest.join(rel);
    let copy_err = |e: std::io::Error| ExportError::Copy {
      from: entry.path().to_path_buf(),
      to: target.clone(),
      message: e.to_string(),
    };
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent).map_err(copy_err)?;
    }
    std::fs::copy(entry.path(), &target).map_err(copy_err)?;

    debug!(file = %rel_str, "exported");
    exported.push(rel.to_path_buf());
  }

  for (pattern, count) in patterns.iter().zip(&hits) {
    if *count == 0 {
      warn!(pattern = %pattern, source = %source.display(), "export pattern matched no files");
    }
  }

  info!(files = exported.len(), "exported sources");
  Ok(exported)
}
