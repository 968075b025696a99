//! Graph command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, stdout_json};

#[test]
fn graph_lists_microtex_with_forced_options() {
  let env = TestEnv::new().with_dependencies();

  env
    .qtmd_cmd()
    .args(["graph", "-s", "os=linux"])
    .assert()
    .success()
    .stdout(predicate::str::contains("microtex/1.0.0@demo/testing"))
    .stdout(predicate::str::contains("QT=true"))
    .stdout(predicate::str::contains("HAVE_LOG=false"))
    .stdout(predicate::str::contains("magic_enum/0.7.3"));
}

#[test]
fn graph_without_conan_qt_has_no_qt_node() {
  let env = TestEnv::new().with_dependencies();

  let output = env
    .qtmd_cmd()
    .args(["graph", "--format", "json", "-s", "os=linux", "-o", "USE_CONAN_QT=false"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output);
  let deps: Vec<&str> = json["dependencies"]
    .as_array()
    .unwrap()
    .iter()
    .map(|dep| dep["reference"].as_str().unwrap())
    .collect();
  assert!(deps.iter().all(|dep| !dep.starts_with("qt/")));
  assert!(deps.contains(&"microtex/1.0.0@demo/testing"));
}

#[test]
fn conan_qt_forces_shared_qt() {
  let env = TestEnv::new().with_dependencies();

  let output = env
    .qtmd_cmd()
    .args([
      "graph", "--format", "json", "-s", "os=linux", "-o", "USE_CONAN_QT=true", "-o", "shared=false",
    ])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output);
  assert_eq!(json["options"]["shared"], false);
  assert_eq!(json["options"]["fPIC"], true);

  let deps = json["dependencies"].as_array().unwrap();
  let qt = deps.iter().find(|dep| dep["reference"] == "qt/6.2.3").unwrap();
  assert_eq!(qt["overrides"]["shared"], true);

  let microtex = deps
    .iter()
    .find(|dep| dep["reference"] == "microtex/1.0.0@demo/testing")
    .unwrap();
  assert_eq!(microtex["overrides"]["USE_CONAN_QT"], true);
  assert_eq!(microtex["overrides"]["HAVE_LOG"], false);
}

#[test]
fn windows_graph_has_no_fpic() {
  let env = TestEnv::new().with_dependencies();

  let output = env
    .qtmd_cmd()
    .args(["graph", "--format", "json", "-s", "os=windows", "-o", "fPIC=true"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output);
  assert!(json["options"].get("fPIC").is_none());
  assert_eq!(json["settings"]["compiler"], "msvc");
}

#[test]
fn missing_qt_fails_only_when_required() {
  let env = TestEnv::new().with_dependencies_except_qt();

  env.qtmd_cmd().args(["graph", "-s", "os=linux"]).assert().success();

  env
    .qtmd_cmd()
    .args(["graph", "-s", "os=linux", "-o", "USE_CONAN_QT=true"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("qt/6.2.3"));
}

#[test]
fn override_of_undeclared_dependency_option_is_a_conflict() {
  let env = TestEnv::new();
  env.write_file(
    "registry/microtex/1.0.0/demo/testing/package.toml",
    "reference = \"microtex/1.0.0@demo/testing\"\n\n[options]\nQT = false\n",
  );

  env
    .qtmd_cmd()
    .args(["graph", "-s", "os=linux"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("option conflict"));
}

#[test]
fn build_order_puts_dependencies_first() {
  let env = TestEnv::new().with_dependencies();
  env.write_file(
    "registry/microtex/1.0.0/demo/testing/package.toml",
    concat!(
      "reference = \"microtex/1.0.0@demo/testing\"\n",
      "requires = [\"magic_enum/0.7.3\"]\n\n",
      "[options]\nQT = false\nUSE_CONAN_QT = false\nHAVE_LOG = true\n",
    ),
  );

  let output = env
    .qtmd_cmd()
    .args(["graph", "--format", "json", "-s", "os=linux"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output);
  let order: Vec<&str> = json["build_order"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r.as_str().unwrap())
    .collect();
  assert_eq!(order, vec!["magic_enum/0.7.3", "microtex/1.0.0@demo/testing"]);
}
