//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

const MICROTEX: &str = r#"
reference = "microtex/1.0.0@demo/testing"

[options]
QT = false
USE_CONAN_QT = false
HAVE_LOG = true
shared = false
"#;

const MAGIC_ENUM: &str = "reference = \"magic_enum/0.7.3\"\n";

const QT: &str = r#"
reference = "qt/6.2.3"

[options]
shared = false
"#;

/// Recipe with the QtMarkdown options and requirements and two libraries.
///
/// The build section is left for the caller, so tests decide what each phase does.
const RECIPE_HEAD: &str = r#"
name = "QtMarkdown"
version = "0.1"
exports_sources = ["CMakeLists.txt", "src/*"]

[options]
shared = false
USE_CONAN_QT = false

[options.fPIC]
default = true
unsupported_on = ["windows"]

[[requires]]
reference = "microtex/1.0.0@demo/testing"
[requires.overrides]
QT = true
HAVE_LOG = false
USE_CONAN_QT = { inherit = "USE_CONAN_QT" }

[[requires]]
reference = "qt/6.2.3"
when = "USE_CONAN_QT"
overrides = { shared = true }

[package_info]
include_dirs = ["include"]
libs = ["QtMarkdownParser", "QtMarkdownRender"]
"#;

/// Phase commands that fake a CMake build with the shell.
pub struct Phases<'a> {
  pub configure: &'a str,
  pub build: &'a str,
  pub install: &'a str,
}

impl Default for Phases<'_> {
  fn default() -> Self {
    Self {
      configure: r#"test -f "$${toolchain}" && test -f "$${source}/CMakeLists.txt" && echo ok > "$${build}/configured.txt""#,
      build: r#"test -f "$${build}/configured.txt""#,
      install: r#"mkdir -p "$${package}/include" "$${package}/lib" && touch "$${package}/lib/libQtMarkdownParser.a" "$${package}/lib/libQtMarkdownRender.a""#,
    }
  }
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory with an isolated store,
/// registry and source tree.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn store_path(&self) -> PathBuf {
    self.temp.path().join("store")
  }

  pub fn registry_path(&self) -> PathBuf {
    self.temp.path().join("registry")
  }

  pub fn source_path(&self) -> PathBuf {
    self.temp.path().join("source")
  }

  /// Register every package the QtMarkdown recipe can require.
  pub fn with_dependencies(self) -> Self {
    self.write_file("registry/qt/6.2.3/_/_/package.toml", QT);
    self.with_dependencies_except_qt()
  }

  /// Register everything but `qt`, which is only required with `USE_CONAN_QT`.
  pub fn with_dependencies_except_qt(self) -> Self {
    self.write_file("registry/microtex/1.0.0/demo/testing/package.toml", MICROTEX);
    self.write_file("registry/magic_enum/0.7.3/_/_/package.toml", MAGIC_ENUM);
    self
  }

  /// Write a source tree plus `recipe.toml` at its root, and return the recipe path.
  pub fn with_recipe(&self, phases: &Phases<'_>) -> PathBuf {
    self.write_file("source/CMakeLists.txt", "project(QtMarkdown)\n");
    self.write_file("source/src/parser/Parser.cpp", "// parser\n");
    self.write_file("source/README.md", "# QtMarkdown\n");

    let recipe = format!(
      "{RECIPE_HEAD}\n[build]\nconfigure = '{}'\nbuild = '{}'\ninstall = '{}'\n",
      phases.configure, phases.build, phases.install
    );
    self.write_file("source/recipe.toml", &recipe)
  }

  /// Build directories in the store that carry a completion marker.
  pub fn completed_builds(&self) -> Vec<PathBuf> {
    let build_root = self.store_path().join("build");
    let Ok(entries) = std::fs::read_dir(&build_root) else {
      return Vec::new();
    };
    let mut builds: Vec<PathBuf> = entries
      .flatten()
      .map(|entry| entry.path())
      .filter(|path| path.join(".qtmd-complete").is_file())
      .collect();
    builds.sort();
    builds
  }

  /// Get a pre-configured Command for the qtmd binary.
  ///
  /// Sets `QTMD_STORE` and `QTMD_REGISTRY` to the isolated paths and clears
  /// `RUST_LOG` so log output stays predictable.
  pub fn qtmd_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("qtmd");
    cmd.env("QTMD_STORE", self.store_path());
    cmd.env("QTMD_REGISTRY", self.registry_path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
  serde_json::from_slice(&output.stdout)
    .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", String::from_utf8_lossy(&output.stdout)))
}
