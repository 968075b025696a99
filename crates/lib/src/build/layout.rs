use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::settings::BuildType;
use crate::util::hash::ObjectHash;

pub const TOOLCHAIN_FILE: &str = "qtmd_toolchain.cmake";

/// Folders of one build inside the store.
///
/// ```text
/// <store>/build/<key>/
///   source/
///   build/<build_type>/
///   build/<build_type>/generators/qtmd_toolchain.cmake
///   package/
///   .qtmd-complete
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLayout {
  pub root: PathBuf,
  pub source: PathBuf,
  pub build: PathBuf,
  pub generators: PathBuf,
  pub package: PathBuf,
  pub toolchain: PathBuf,
}

impl BuildLayout {
  pub fn new(store: &Path, key: &ObjectHash, build_type: BuildType) -> Self {
    let root = store.join("build").join(&key.0);
    let build = root.join("build").join(build_type.as_str());
    let generators = build.join("generators");

    Self {
      source: root.join("source"),
      package: root.join("package"),
      toolchain: generators.join(TOOLCHAIN_FILE),
      generators,
      build,
      root,
    }
  }

  pub fn create_dirs(&self) -> std::io::Result<()> {
    for dir in [&self.source, &self.build, &self.generators, &self.package] {
      std::fs::create_dir_all(dir)?;
    }
    Ok(())
  }
}
