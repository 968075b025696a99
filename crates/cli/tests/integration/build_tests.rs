//! Build command integration tests.
//!
//! Phases run through `/bin/sh`, so these only run on Unix.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::{Phases, TestEnv, stdout_json};

#[test]
fn build_creates_verified_package() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built QtMarkdown/0.1"))
    .stdout(predicate::str::contains("Libraries: 2"));

  let builds = env.completed_builds();
  assert_eq!(builds.len(), 1);

  let build = &builds[0];
  assert!(build.join("source/CMakeLists.txt").is_file());
  assert!(build.join("source/src/parser/Parser.cpp").is_file());
  assert!(!build.join("source/README.md").exists());
  assert!(!build.join("source/recipe.toml").exists());
  assert!(build.join("package/package_info.json").is_file());
}

#[test]
fn second_build_is_a_cache_hit_with_same_artifacts() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  let run = || {
    let output = env
      .qtmd_cmd()
      .arg("build")
      .arg("--recipe")
      .arg(&recipe)
      .args(["--format", "json"])
      .output()
      .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    stdout_json(&output)
  };

  let first = run();
  let second = run();

  assert_eq!(first["cached"], false);
  assert_eq!(second["cached"], true);
  assert_eq!(first["key"], second["key"]);
  assert_eq!(first["libraries"], second["libraries"]);
  assert_eq!(first["libraries"].as_array().unwrap().len(), 2);
  assert_eq!(env.completed_builds().len(), 1);
}

#[test]
fn different_options_get_a_different_build() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  for with_qt in ["false", "true"] {
    env
      .qtmd_cmd()
      .arg("build")
      .arg("--recipe")
      .arg(&recipe)
      .arg("-o")
      .arg(format!("USE_CONAN_QT={with_qt}"))
      .assert()
      .success();
  }

  assert_eq!(env.completed_builds().len(), 2);
}

#[test]
fn toolchain_carries_options_and_dependencies() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .args(["-o", "USE_CONAN_QT=true", "-s", "build_type=Debug"])
    .assert()
    .success();

  let build = &env.completed_builds()[0];
  let generators = build.join("build/Debug/generators");
  let toolchain = std::fs::read_to_string(generators.join("qtmd_toolchain.cmake")).unwrap();
  assert!(toolchain.contains("CMAKE_BUILD_TYPE"));
  assert!(toolchain.contains("USE_CONAN_QT"));

  let deps = std::fs::read_to_string(generators.join("dependencies.json")).unwrap();
  assert!(deps.contains("microtex/1.0.0@demo/testing"));
  assert!(deps.contains("qt/6.2.3"));
}

#[test]
fn source_defaults_to_recipe_directory() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  env
    .qtmd_cmd()
    .current_dir(env.temp.path())
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .assert()
    .success();

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .arg("--source")
    .arg(env.source_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("cached"));
}

#[test]
fn failing_configure_exits_with_compile_code() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases {
    configure: "echo cmake exploded >&2; exit 7",
    ..Phases::default()
  });

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .assert()
    .code(3)
    .stderr(predicate::str::contains("configure"))
    .stderr(predicate::str::contains("cmake exploded"));

  assert!(env.completed_builds().is_empty());
}

#[test]
fn failing_install_exits_with_install_code() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases {
    install: "exit 1",
    ..Phases::default()
  });

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .assert()
    .code(4);
}

#[test]
fn missing_library_is_an_artifact_mismatch() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases {
    install: r#"mkdir -p "$${package}/include" "$${package}/lib" && touch "$${package}/lib/libQtMarkdownParser.a""#,
    ..Phases::default()
  });

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .arg("--publish")
    .assert()
    .code(5)
    .stderr(predicate::str::contains("QtMarkdownRender"));

  assert!(env.completed_builds().is_empty());
  assert!(!env.registry_path().join("QtMarkdown").exists());
}

#[test]
fn unresolved_dependency_never_runs_phases() {
  let env = TestEnv::new();
  let recipe = env.with_recipe(&Phases::default());

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .assert()
    .code(2)
    .stderr(predicate::str::contains("dependency unresolved"));

  assert!(!env.store_path().join("build").exists());
}

#[test]
fn publish_registers_the_package() {
  let env = TestEnv::new().with_dependencies();
  let recipe = env.with_recipe(&Phases::default());

  env
    .qtmd_cmd()
    .arg("build")
    .arg("--recipe")
    .arg(&recipe)
    .arg("--publish")
    .assert()
    .success()
    .stdout(predicate::str::contains("Published"));

  let descriptor = env.registry_path().join("QtMarkdown/0.1/_/_/package.toml");
  let content = std::fs::read_to_string(descriptor).unwrap();
  assert!(content.contains("reference = \"QtMarkdown/0.1\""));
  assert!(content.contains("package_folder"));
  assert!(content.contains("QtMarkdownParser"));
}
