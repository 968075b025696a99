//! External build system integration.
//!
//! The engine does not compile anything itself. A [`BuildTool`] is driven
//! through four phases, each receiving the same [`BuildContext`]:
//!
//! - `generate` writes the toolchain file and per-dependency config files
//! - `configure`, `build` and `install` run the recipe's command templates
//!
//! [`CMakeTool`] is the only implementation shipped. Tests substitute their own.

mod cmake;
mod cmd;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::build::BuildLayout;
use crate::graph::DependencyGraph;
use crate::options::EffectiveOptions;
use crate::placeholder::{Folder, PlaceholderError, Resolver};
use crate::recipe::PackageDescriptor;
use crate::settings::Settings;

pub use cmake::{BuildCommands, CMakeTool};
pub use cmd::{CmdOutput, execute_cmd};

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("command failed with exit code {code:?}: {cmd}{}", format_output(.stdout, .stderr))]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  #[error(transparent)]
  Placeholder(#[from] PlaceholderError),

  #[error("failed to write {path}: {message}")]
  Write { path: PathBuf, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

fn format_output(stdout: &str, stderr: &str) -> String {
  let mut out = String::new();
  if !stdout.trim().is_empty() {
    out.push_str("\n--- stdout ---\n");
    out.push_str(stdout.trim_end());
  }
  if !stderr.trim().is_empty() {
    out.push_str("\n--- stderr ---\n");
    out.push_str(stderr.trim_end());
  }
  out
}

/// Files written by the generate phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainArtifacts {
  pub toolchain: PathBuf,
  /// One `<name>-config.cmake` per resolved dependency, in resolution order.
  pub dependency_configs: Vec<PathBuf>,
  pub dependencies_json: PathBuf,
}

/// Inputs shared by every phase of one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
  pub recipe: &'a PackageDescriptor,
  pub settings: &'a Settings,
  pub options: &'a EffectiveOptions,
  pub graph: &'a DependencyGraph,
  pub layout: &'a BuildLayout,
}

impl Resolver for BuildContext<'_> {
  fn resolve_folder(&self, folder: Folder) -> Result<&str, PlaceholderError> {
    let path = match folder {
      Folder::Source => &self.layout.source,
      Folder::Build => &self.layout.build,
      Folder::Generators => &self.layout.generators,
      Folder::Package => &self.layout.package,
      Folder::Toolchain => &self.layout.toolchain,
    };
    path.to_str().ok_or(PlaceholderError::UnresolvedFolder(folder))
  }

  fn resolve_setting(&self, name: &str) -> Result<&str, PlaceholderError> {
    match name {
      "os" => Ok(self.settings.os.as_str()),
      "compiler" => Ok(self.settings.compiler.as_str()),
      "build_type" => Ok(self.settings.build_type.as_str()),
      "arch" => Ok(self.settings.arch.as_str()),
      _ => Err(PlaceholderError::UnknownSetting(name.to_string())),
    }
  }

  fn resolve_option(&self, name: &str) -> Result<&str, PlaceholderError> {
    match self.options.get(name) {
      Some(true) => Ok("ON"),
      Some(false) => Ok("OFF"),
      None => Err(PlaceholderError::UnresolvedOption(name.to_string())),
    }
  }
}

/// An external build system.
#[async_trait]
pub trait BuildTool: Send + Sync {
  fn name(&self) -> &str;

  async fn generate(&self, ctx: &BuildContext<'_>) -> Result<ToolchainArtifacts, ToolError>;

  async fn configure(&self, ctx: &BuildContext<'_>) -> Result<(), ToolError>;

  async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), ToolError>;

  /// Install into the package folder and return it.
  async fn install(&self, ctx: &BuildContext<'_>) -> Result<PathBuf, ToolError>;
}
