//! End-to-end package creation.
//!
//! [`create_package`] runs the whole sequence for one recipe:
//!
//! 1. Validate the recipe and resolve its options for the target OS
//! 2. Resolve the dependency graph (nothing is built if this fails)
//! 3. Compute the build key and take its lock
//! 4. Return the cached package if the store holds a verified one
//! 5. Export sources, then drive generate/configure/build/install
//! 6. Verify the installed artifacts and mark the build complete
//!
//! Every failure is classified by [`FailureKind`] so callers can map it to an
//! exit code.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::artifact::{ArtifactError, PackageInfo, read_package_info, verify_artifacts, write_package_info};
use crate::build::{
  BuildLayout, BuildLock, BuildLockError, CacheState, MarkerError, build_key, cache_state, write_marker,
};
use crate::driver::{BuildDriver, DriverError, Phase};
use crate::export::{ExportError, export_sources};
use crate::graph::{DependencyGraph, GraphError, build_graph};
use crate::options::{EffectiveOptions, OptionOverrides, OptionTable, OptionsError, resolve_options};
use crate::recipe::{PackageDescriptor, RecipeError};
use crate::registry::{DependencyDescriptor, LocalRegistry, PackageRef, Registry, RegistryError};
use crate::settings::Settings;
use crate::tool::{BuildContext, BuildTool, ToolchainArtifacts};
use crate::util::hash::{HashError, ObjectHash};

/// Option deciding whether libraries are expected as shared objects.
const SHARED_OPTION: &str = "shared";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Recipe(#[from] RecipeError),

  #[error(transparent)]
  Options(#[from] OptionsError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("failed to compute build key: {0}")]
  Key(#[from] HashError),

  #[error(transparent)]
  Lock(#[from] BuildLockError),

  #[error(transparent)]
  Export(#[from] ExportError),

  #[error(transparent)]
  Driver(#[from] DriverError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error(transparent)]
  Marker(#[from] MarkerError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error("store error at {path}: {message}")]
  Store { path: PathBuf, message: String },
}

/// Coarse failure classes, one per exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  Usage,
  Resolution,
  Compile,
  Install,
  ArtifactMismatch,
  Cancelled,
  Other,
}

impl FailureKind {
  pub fn exit_code(&self) -> i32 {
    match self {
      FailureKind::Usage | FailureKind::Other => 1,
      FailureKind::Resolution => 2,
      FailureKind::Compile => 3,
      FailureKind::Install => 4,
      FailureKind::ArtifactMismatch => 5,
      FailureKind::Cancelled => 130,
    }
  }
}

impl PipelineError {
  pub fn kind(&self) -> FailureKind {
    match self {
      PipelineError::Recipe(_) | PipelineError::Options(_) => FailureKind::Usage,
      PipelineError::Graph(_) => FailureKind::Resolution,
      PipelineError::Driver(DriverError::Phase { phase: Phase::Install, .. }) => FailureKind::Install,
      PipelineError::Driver(DriverError::Phase { .. }) => FailureKind::Compile,
      PipelineError::Driver(DriverError::Cancelled { .. }) => FailureKind::Cancelled,
      PipelineError::Artifact(ArtifactError::Mismatch { .. }) => FailureKind::ArtifactMismatch,
      _ => FailureKind::Other,
    }
  }
}

/// Options and dependency graph of a recipe for one target.
#[derive(Debug)]
pub struct Resolution {
  pub options: EffectiveOptions,
  pub graph: DependencyGraph,
}

/// Validate `recipe` and resolve its options and dependency graph.
pub fn resolve(
  recipe: &PackageDescriptor,
  settings: &Settings,
  overrides: &OptionOverrides,
  registry: &impl Registry,
) -> Result<Resolution, PipelineError> {
  recipe.validate()?;
  let options = resolve_options(&recipe.options, settings.os, overrides)?;
  let graph = build_graph(recipe, &options, registry)?;
  Ok(Resolution { options, graph })
}

/// Everything needed to create one package.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub recipe: PackageDescriptor,
  pub settings: Settings,
  pub overrides: OptionOverrides,
  /// Directory sources are exported from. `None` skips the export.
  pub source_dir: Option<PathBuf>,
  pub store: PathBuf,
  /// Recorded in the lock so a contending process can report who holds it.
  pub command: String,
}

#[derive(Debug)]
pub struct BuildOutcome {
  pub reference: PackageRef,
  pub key: ObjectHash,
  pub layout: BuildLayout,
  pub settings: Settings,
  pub options: EffectiveOptions,
  pub graph: DependencyGraph,
  pub package_info: PackageInfo,
  /// Installed library files, in declaration order.
  pub libraries: Vec<PathBuf>,
  /// `None` for cache hits, which skip generation.
  pub toolchain: Option<ToolchainArtifacts>,
  pub cached: bool,
}

impl BuildOutcome {
  pub fn package_folder(&self) -> &Path {
    &self.layout.package
  }

  /// Describe the package for a registry, so other recipes can depend on it.
  pub fn descriptor(&self) -> DependencyDescriptor {
    let options = self
      .options
      .iter()
      .fold(OptionTable::new(), |table, (name, value)| table.declare(name, value));

    let mut descriptor = DependencyDescriptor::new(self.reference.clone(), options);
    descriptor.requires = self
      .graph
      .dependencies()
      .filter(|dep| dep.direct)
      .map(|dep| dep.reference.clone())
      .collect();
    descriptor.package_folder = Some(self.layout.package.clone());
    descriptor.package_info = self.package_info.clone();
    descriptor
  }
}

fn store_err(path: &Path) -> impl Fn(std::io::Error) -> PipelineError + '_ {
  move |e| PipelineError::Store {
    path: path.to_path_buf(),
    message: e.to_string(),
  }
}

/// Create the package described by `request`.
pub async fn create_package<R, T>(
  request: &BuildRequest,
  registry: &R,
  tool: &T,
  cancel: &CancellationToken,
) -> Result<BuildOutcome, PipelineError>
where
  R: Registry + ?Sized,
  T: BuildTool + ?Sized,
{
  let recipe = &request.recipe;
  let settings = request.settings;

  let Resolution { options, graph } = resolve(recipe, &settings, &request.overrides, &registry)?;
  let key = build_key(recipe, &settings, &options, &graph)?;
  let layout = BuildLayout::new(&request.store, &key, settings.build_type);
  let shared = options.is_enabled(SHARED_OPTION);

  info!(package = %recipe.reference(), key = %key, settings = %settings, "creating package");

  let _lock = BuildLock::acquire(&request.store, &key, &request.command)?;

  let mut outcome = BuildOutcome {
    reference: recipe.reference(),
    key,
    layout,
    settings,
    options,
    graph,
    package_info: recipe.package_info.clone(),
    libraries: Vec::new(),
    toolchain: None,
    cached: false,
  };

  // A package built from an older declaration must be rebuilt and re-verified.
  let declared = Some(&recipe.package_info);
  let state = match cache_state(&outcome.layout) {
    CacheState::Hit(_) if read_package_info(&outcome.layout.package).as_ref() != declared => CacheState::Stale,
    state => state,
  };

  match state {
    CacheState::Hit(_) => {
      outcome.libraries = verify_artifacts(&recipe.package_info, &outcome.layout.package, &settings, shared)?;
      outcome.cached = true;
      info!(key = %outcome.key, "package already built, using cache");
      return Ok(outcome);
    }
    CacheState::Stale => {
      warn!(path = %outcome.layout.root.display(), "removing incomplete build");
      std::fs::remove_dir_all(&outcome.layout.root).map_err(store_err(&outcome.layout.root))?;
    }
    CacheState::Missing => {}
  }

  outcome
    .layout
    .create_dirs()
    .map_err(store_err(&outcome.layout.root))?;

  if let Some(source_dir) = &request.source_dir {
    export_sources(&recipe.exports_sources, source_dir, &outcome.layout.source)?;
  }

  let ctx = BuildContext {
    recipe,
    settings: &settings,
    options: &outcome.options,
    graph: &outcome.graph,
    layout: &outcome.layout,
  };
  let output = BuildDriver::new(tool).run(&ctx, cancel).await?;

  outcome.libraries = verify_artifacts(&recipe.package_info, &output.package_folder, &settings, shared)?;
  write_package_info(&recipe.package_info, &output.package_folder)?;
  write_marker(&outcome.layout)?;
  outcome.toolchain = Some(output.toolchain);

  info!(key = %outcome.key, libs = outcome.libraries.len(), "package created");
  Ok(outcome)
}

/// Publish a created package into a local registry.
pub fn publish(outcome: &BuildOutcome, registry: &LocalRegistry) -> Result<PathBuf, PipelineError> {
  Ok(registry.publish(&outcome.descriptor())?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::arch::Arch;
  use crate::platform::os::Os;
  use crate::recipe::qtmarkdown;
  use crate::registry::MemoryRegistry;
  use crate::tool::ToolError;
  use crate::util::testutil::qtmarkdown_registry;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tempfile::TempDir;

  #[derive(Default)]
  struct CountingTool {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl BuildTool for CountingTool {
    fn name(&self) -> &str {
      "counting"
    }

    async fn generate(&self, _ctx: &BuildContext<'_>) -> Result<ToolchainArtifacts, ToolError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(ToolchainArtifacts::default())
    }

    async fn configure(&self, _ctx: &BuildContext<'_>) -> Result<(), ToolError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    async fn build(&self, _ctx: &BuildContext<'_>) -> Result<(), ToolError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    async fn install(&self, ctx: &BuildContext<'_>) -> Result<PathBuf, ToolError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(ctx.layout.package.clone())
    }
  }

  fn request(store: &Path, overrides: &[&str]) -> BuildRequest {
    BuildRequest {
      recipe: qtmarkdown(),
      settings: Settings::new(Os::Linux, Arch::X86_64),
      overrides: OptionOverrides::parse(overrides).unwrap(),
      source_dir: None,
      store: store.to_path_buf(),
      command: "qtmd build".to_string(),
    }
  }

  #[tokio::test]
  async fn unresolved_dependency_never_reaches_the_tool() {
    let store = TempDir::new().unwrap();
    let registry = MemoryRegistry::new();
    let tool = CountingTool::default();

    let err = create_package(&request(store.path(), &[]), &registry, &tool, &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(matches!(
      &err,
      PipelineError::Graph(GraphError::DependencyUnresolved { name, version, .. })
        if name == "microtex" && version == "1.0.0"
    ));
    assert_eq!(err.kind(), FailureKind::Resolution);
    assert_eq!(err.kind().exit_code(), 2);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    assert!(!store.path().join("build").exists());
  }

  #[tokio::test]
  async fn unknown_option_is_a_usage_error() {
    let store = TempDir::new().unwrap();
    let tool = CountingTool::default();

    let err = create_package(
      &request(store.path(), &["with_tests=True"]),
      &qtmarkdown_registry(),
      &tool,
      &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Usage);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn missing_artifacts_fail_and_leave_no_marker() {
    let store = TempDir::new().unwrap();
    let tool = CountingTool::default();
    let request = request(store.path(), &[]);

    let err = create_package(&request, &qtmarkdown_registry(), &tool, &CancellationToken::new())
      .await
      .unwrap_err();

    assert_eq!(err.kind(), FailureKind::ArtifactMismatch);
    assert_eq!(err.kind().exit_code(), 5);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 4);

    let resolution = resolve(&request.recipe, &request.settings, &request.overrides, &qtmarkdown_registry()).unwrap();
    let key = build_key(&request.recipe, &request.settings, &resolution.options, &resolution.graph).unwrap();
    let layout = BuildLayout::new(store.path(), &key, request.settings.build_type);
    assert_eq!(cache_state(&layout), CacheState::Stale);
  }

  #[tokio::test]
  async fn cancelled_build_maps_to_130() {
    let store = TempDir::new().unwrap();
    let tool = CountingTool::default();
    let token = CancellationToken::new();
    token.cancel();

    let err = create_package(&request(store.path(), &[]), &qtmarkdown_registry(), &tool, &token)
      .await
      .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Cancelled);
    assert_eq!(err.kind().exit_code(), 130);
  }

  #[test]
  fn driver_failures_map_to_phase_exit_codes() {
    let failure = |phase| {
      PipelineError::Driver(DriverError::Phase {
        phase,
        reached: phase.requires(),
        source: ToolError::CmdFailed {
          cmd: "cmake".to_string(),
          code: Some(1),
          stdout: String::new(),
          stderr: String::new(),
        },
      })
    };

    assert_eq!(failure(Phase::Generate).kind().exit_code(), 3);
    assert_eq!(failure(Phase::Configure).kind().exit_code(), 3);
    assert_eq!(failure(Phase::Build).kind().exit_code(), 3);
    assert_eq!(failure(Phase::Install).kind().exit_code(), 4);
  }

  #[cfg(unix)]
  mod shell {
    use super::*;
    use crate::tool::CMakeTool;
    use crate::util::testutil::fake_build_commands;

    const LIBS: [&str; 5] = [
      "QtMarkdownParser",
      "QtMarkdownRender",
      "QtMarkdownEditorCore",
      "QtWidgetMarkdownEditor",
      "QtQuickMarkdownEditor",
    ];

    fn fake_request(store: &Path, overrides: &[&str]) -> BuildRequest {
      let mut request = request(store, overrides);
      request.recipe.build = fake_build_commands(&LIBS);
      request
    }

    #[tokio::test]
    async fn second_run_is_a_cache_hit_with_same_artifacts() {
      let store = TempDir::new().unwrap();
      let request = fake_request(store.path(), &["shared=False"]);
      let registry = qtmarkdown_registry();

      let first = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();
      assert!(!first.cached);
      assert!(first.toolchain.is_some());
      assert!(first.layout.package.join("package_info.json").is_file());

      let second = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();
      assert!(second.cached);
      assert_eq!(first.key, second.key);
      assert_eq!(first.libraries, second.libraries);
      assert_eq!(second.libraries.len(), 5);
    }

    #[tokio::test]
    async fn scenario_with_conan_qt_on_linux() {
      let store = TempDir::new().unwrap();
      let request = fake_request(store.path(), &["shared=False", "fPIC=True", "USE_CONAN_QT=True"]);

      let outcome = create_package(&request, &qtmarkdown_registry(), &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();

      let microtex = outcome.graph.get("microtex").unwrap();
      assert_eq!(microtex.overrides.get("HAVE_LOG"), Some(&false));
      assert_eq!(microtex.overrides.get("QT"), Some(&true));
      assert_eq!(outcome.graph.get("qt").unwrap().overrides.get("shared"), Some(&true));
      assert_eq!(outcome.package_info.libs.len(), 5);

      let toolchain = outcome.toolchain.unwrap();
      assert_eq!(toolchain.dependency_configs.len(), 3);
      assert!(outcome.layout.build.join("built.txt").is_file());
    }

    #[tokio::test]
    async fn tampered_cache_is_rebuilt() {
      let store = TempDir::new().unwrap();
      let request = fake_request(store.path(), &[]);
      let registry = qtmarkdown_registry();

      let first = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();
      std::fs::write(first.layout.package.join("lib/libQtMarkdownParser.a"), b"tampered").unwrap();

      let second = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();
      assert!(!second.cached);
    }

    #[tokio::test]
    async fn newly_declared_library_is_checked_not_served_from_cache() {
      let store = TempDir::new().unwrap();
      let mut request = fake_request(store.path(), &[]);
      let registry = qtmarkdown_registry();

      let first = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap();
      assert_eq!(first.libraries.len(), 5);

      request.recipe.package_info.libs.push("QtMarkdownExtra".to_string());
      let err = create_package(&request, &registry, &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap_err();

      assert!(matches!(err, PipelineError::Artifact(ArtifactError::Mismatch { .. })));
      assert_eq!(err.kind(), FailureKind::ArtifactMismatch);
      assert!(err.to_string().contains("QtMarkdownExtra"));
    }

    #[tokio::test]
    async fn failing_configure_is_a_compile_failure() {
      let store = TempDir::new().unwrap();
      let mut request = fake_request(store.path(), &[]);
      request.recipe.build.configure = "echo 'CMake Error at CMakeLists.txt:1' >&2; exit 1".to_string();

      let err = create_package(&request, &qtmarkdown_registry(), &CMakeTool::new(), &CancellationToken::new())
        .await
        .unwrap_err();

      assert_eq!(err.kind(), FailureKind::Compile);
      assert!(err.to_string().contains("CMake Error at CMakeLists.txt:1"));
    }

    #[tokio::test]
    async fn published_package_resolves_from_local_registry() {
      let store = TempDir::new().unwrap();
      let registry_dir = TempDir::new().unwrap();
      let local = LocalRegistry::new(registry_dir.path());

      let outcome = create_package(
        &fake_request(store.path(), &[]),
        &qtmarkdown_registry(),
        &CMakeTool::new(),
        &CancellationToken::new(),
      )
      .await
      .unwrap();
      publish(&outcome, &local).unwrap();

      let found = local.lookup(&PackageRef::new("QtMarkdown", "0.1")).unwrap().unwrap();
      assert_eq!(found.package_folder.as_deref(), Some(outcome.package_folder()));
      assert_eq!(found.package_info.libs.len(), 5);
      assert!(found.options.contains("fPIC"));
      assert_eq!(
        found.requires,
        vec![
          PackageRef::new("microtex", "1.0.0").with_channel("demo", "testing"),
          PackageRef::new("magic_enum", "0.7.3"),
        ]
      );
    }
  }
}
