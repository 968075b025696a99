//! Test helpers: registries and build commands that stand in for a real toolchain.

use crate::options::OptionTable;
use crate::registry::{DependencyDescriptor, MemoryRegistry, PackageRef};
use crate::tool::BuildCommands;

/// Registry with every package the QtMarkdown recipe can require.
pub fn qtmarkdown_registry() -> MemoryRegistry {
  MemoryRegistry::new()
    .with(DependencyDescriptor::new(
      PackageRef::new("microtex", "1.0.0").with_channel("demo", "testing"),
      OptionTable::from([("QT", false), ("USE_CONAN_QT", false), ("HAVE_LOG", true), ("shared", false)]),
    ))
    .with(DependencyDescriptor::new(
      PackageRef::new("magic_enum", "0.7.3"),
      OptionTable::new(),
    ))
    .with(DependencyDescriptor::new(
      PackageRef::new("qt", "6.2.3"),
      OptionTable::from([("shared", false)]),
    ))
}

/// Shell commands that fake a CMake build by creating the expected static
/// libraries under `lib/` and an `include/` directory.
#[cfg(unix)]
pub fn fake_build_commands(libs: &[&str]) -> BuildCommands {
  let touches: Vec<String> = libs
    .iter()
    .map(|lib| format!("touch \"$${{package}}/lib/lib{lib}.a\""))
    .collect();

  BuildCommands {
    configure: "test -f \"$${toolchain}\" && echo configured > \"$${build}/configured.txt\"".to_string(),
    build: "test -f \"$${build}/configured.txt\" && echo built > \"$${build}/built.txt\"".to_string(),
    install: format!(
      "mkdir -p \"$${{package}}/include\" \"$${{package}}/lib\" && {}",
      touches.join(" && ")
    ),
    ..BuildCommands::default()
  }
}
