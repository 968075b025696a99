//! Toolchain and dependency config generation.
//!
//! The generate phase writes everything CMake needs to configure the package
//! against its resolved dependencies into the generators folder:
//!
//! - `qtmd_toolchain.cmake` carries the build type, the option values and the
//!   search paths.
//! - `<name>-config.cmake` per dependency, found by `find_package(<name> CONFIG)`.
//! - `dependencies.json` describes the same graph for non-CMake tools.
//!
//! Output depends only on the context, and entries are written in a stable
//! order, so regenerating an unchanged build produces identical files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::graph::ResolvedDependency;
use crate::tool::{BuildContext, ToolError, ToolchainArtifacts};

pub const DEPENDENCIES_FILE: &str = "dependencies.json";

/// Options with a dedicated CMake variable instead of a plain cache entry.
const SHARED_OPTION: &str = "shared";
const FPIC_OPTION: &str = "fPIC";

fn cmake_path(path: &Path) -> String {
  path.display().to_string().replace('\\', "/")
}

fn on_off(value: bool) -> &'static str {
  if value { "ON" } else { "OFF" }
}

/// Render the toolchain file.
pub fn render_toolchain(ctx: &BuildContext<'_>) -> String {
  let settings = ctx.settings;
  let mut lines = vec![
    format!("# Generated by qtmd for {}/{}. Do not edit.", ctx.recipe.name, ctx.recipe.version),
    format!("# {settings}"),
    String::new(),
  ];

  if settings.platform().is_cross() {
    lines.push(format!("set(CMAKE_SYSTEM_NAME {})", settings.os.cmake_system_name()));
    lines.push(format!("set(CMAKE_SYSTEM_PROCESSOR {})", settings.arch));
  }
  lines.push(format!(
    "set(CMAKE_BUILD_TYPE \"{}\" CACHE STRING \"\" FORCE)",
    settings.build_type
  ));

  if let Some(shared) = ctx.options.get(SHARED_OPTION) {
    lines.push(format!("set(BUILD_SHARED_LIBS {} CACHE BOOL \"\" FORCE)", on_off(shared)));
  }
  if let Some(fpic) = ctx.options.get(FPIC_OPTION) {
    lines.push(format!("set(CMAKE_POSITION_INDEPENDENT_CODE {})", on_off(fpic)));
  }

  lines.extend(
    ctx
      .options
      .iter()
      .filter(|(name, _)| *name != SHARED_OPTION && *name != FPIC_OPTION)
      .map(|(name, value)| format!("set({name} {} CACHE BOOL \"\" FORCE)", on_off(value))),
  );

  let generators = cmake_path(&ctx.layout.generators);
  lines.push(String::new());
  lines.push(format!("list(PREPEND CMAKE_PREFIX_PATH \"{generators}\")"));
  lines.push(format!("list(PREPEND CMAKE_MODULE_PATH \"{generators}\")"));

  lines.extend(ctx.graph.dependencies().filter_map(|dep| {
    dep
      .descriptor
      .package_folder
      .as_ref()
      .map(|folder| format!("list(APPEND CMAKE_PREFIX_PATH \"{}\")", cmake_path(folder)))
  }));

  finish(lines)
}

/// Render the config file consumed by `find_package(<name> CONFIG)`.
pub fn render_dependency_config(dep: &ResolvedDependency) -> String {
  let name = &dep.reference.name;
  let info = &dep.descriptor.package_info;
  let mut lines = vec![
    format!("# Generated by qtmd for {}. Do not edit.", dep.reference),
    format!("set({name}_FOUND TRUE)"),
    format!("set({name}_VERSION \"{}\")", dep.reference.version),
  ];

  match &dep.descriptor.package_folder {
    Some(folder) => {
      let folder = cmake_path(folder);
      let include_dirs: Vec<_> = info.include_dirs.iter().map(|d| format!("{folder}/{d}")).collect();
      lines.push(format!("set({name}_PACKAGE_FOLDER \"{folder}\")"));
      lines.push(format!("set({name}_INCLUDE_DIRS \"{}\")", include_dirs.join(";")));
      lines.push(format!("set({name}_LIB_DIRS \"{folder}/lib\")"));
    }
    None => lines.push(format!("set({name}_INCLUDE_DIRS \"\")")),
  }

  lines.push(format!("set({name}_LIBRARIES \"{}\")", info.libs.join(";")));
  lines.extend(
    dep
      .overrides
      .iter()
      .map(|(option, value)| format!("set({name}_OPTION_{option} {})", on_off(*value))),
  );

  finish(lines)
}

/// Join rendered lines, ending the file with a newline.
fn finish(lines: Vec<String>) -> String {
  let mut out = lines.join("\n");
  out.push('\n');
  out
}

#[derive(Serialize)]
struct DependencyEntry<'a> {
  reference: String,
  direct: bool,
  overrides: &'a std::collections::BTreeMap<String, bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  package_folder: Option<&'a Path>,
  include_dirs: &'a [String],
  libs: &'a [String],
}

/// Render `dependencies.json`, dependencies before their dependents.
pub fn render_dependencies_json(ctx: &BuildContext<'_>) -> Result<String, serde_json::Error> {
  let entries: Vec<_> = ctx
    .graph
    .topological_order()
    .into_iter()
    .map(|dep| DependencyEntry {
      reference: dep.reference.to_string(),
      direct: dep.direct,
      overrides: &dep.overrides,
      package_folder: dep.descriptor.package_folder.as_deref(),
      include_dirs: &dep.descriptor.package_info.include_dirs,
      libs: &dep.descriptor.package_info.libs,
    })
    .collect();

  serde_json::to_string_pretty(&entries)
}

fn write_file(path: PathBuf, content: &str) -> Result<PathBuf, ToolError> {
  std::fs::write(&path, content).map_err(|e| ToolError::Write {
    path: path.clone(),
    message: e.to_string(),
  })?;
  debug!(path = %path.display(), "generated file");
  Ok(path)
}

/// Write the toolchain file and dependency configs into the generators folder.
pub fn write_generators(ctx: &BuildContext<'_>) -> Result<ToolchainArtifacts, ToolError> {
  let generators = &ctx.layout.generators;
  std::fs::create_dir_all(generators)?;

  let toolchain = write_file(ctx.layout.toolchain.clone(), &render_toolchain(ctx))?;

  let mut dependency_configs = Vec::new();
  for dep in ctx.graph.dependencies() {
    let path = generators.join(format!("{}-config.cmake", dep.reference.name));
    dependency_configs.push(write_file(path, &render_dependency_config(dep))?);
  }

  let json = render_dependencies_json(ctx).map_err(|e| ToolError::Write {
    path: generators.join(DEPENDENCIES_FILE),
    message: e.to_string(),
  })?;
  let dependencies_json = write_file(generators.join(DEPENDENCIES_FILE), &format!("{json}\n"))?;

  info!(
    toolchain = %toolchain.display(),
    dependencies = dependency_configs.len(),
    "generated toolchain and dependency configs"
  );

  Ok(ToolchainArtifacts {
    toolchain,
    dependency_configs,
    dependencies_json,
  })
}
