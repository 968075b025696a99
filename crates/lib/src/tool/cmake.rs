use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::generate::write_generators;
use crate::placeholder::substitute;

use super::{BuildContext, BuildTool, ToolError, ToolchainArtifacts, execute_cmd};

/// Command templates for the configure, build and install phases.
///
/// Templates may use the placeholders described in [`crate::placeholder`].
/// An empty template skips its phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildCommands {
  pub configure: String,
  pub build: String,
  pub install: String,
  /// Extra environment for every command. Values may use placeholders.
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
  /// Shell used to run the commands instead of the platform default.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shell: Option<String>,
}

impl Default for BuildCommands {
  fn default() -> Self {
    Self {
      configure: concat!(
        "cmake -S \"$${source}\" -B \"$${build}\"",
        " -DCMAKE_TOOLCHAIN_FILE=\"$${toolchain}\"",
        " -DCMAKE_BUILD_TYPE=$${setting:build_type}"
      )
      .to_string(),
      build: "cmake --build \"$${build}\" --config $${setting:build_type}".to_string(),
      install: "cmake --install \"$${build}\" --config $${setting:build_type} --prefix \"$${package}\"".to_string(),
      env: BTreeMap::new(),
      shell: None,
    }
  }
}

/// Runs the recipe's command templates, CMake unless the recipe says otherwise.
#[derive(Debug, Clone, Default)]
pub struct CMakeTool;

impl CMakeTool {
  pub fn new() -> Self {
    Self
  }

  async fn run(&self, phase: &str, template: &str, ctx: &BuildContext<'_>, cwd: &Path) -> Result<(), ToolError> {
    if template.trim().is_empty() {
      debug!(phase, "no command for phase, skipping");
      return Ok(());
    }

    let commands = &ctx.recipe.build;
    let cmd = substitute(template, ctx)?;
    let env = commands
      .env
      .iter()
      .map(|(key, value)| Ok((key.clone(), substitute(value, ctx)?)))
      .collect::<Result<BTreeMap<_, _>, ToolError>>()?;

    info!(phase, "running phase command");
    execute_cmd(&cmd, &env, cwd, commands.shell.as_deref()).await?;
    Ok(())
  }
}

#[async_trait]
impl BuildTool for CMakeTool {
  fn name(&self) -> &str {
    "cmake"
  }

  async fn generate(&self, ctx: &BuildContext<'_>) -> Result<ToolchainArtifacts, ToolError> {
    write_generators(ctx)
  }

  async fn configure(&self, ctx: &BuildContext<'_>) -> Result<(), ToolError> {
    self
      .run("configure", &ctx.recipe.build.configure, ctx, &ctx.layout.build)
      .await
  }

  async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), ToolError> {
    self.run("build", &ctx.recipe.build.build, ctx, &ctx.layout.build).await
  }

  async fn install(&self, ctx: &BuildContext<'_>) -> Result<PathBuf, ToolError> {
    self
      .run("install", &ctx.recipe.build.install, ctx, &ctx.layout.build)
      .await?;
    Ok(ctx.layout.package.clone())
  }
}
