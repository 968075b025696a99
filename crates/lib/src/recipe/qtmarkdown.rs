use crate::artifact::PackageInfo;
use crate::options::OptionTable;
use crate::platform::os::Os;
use crate::registry::PackageRef;
use crate::tool::BuildCommands;

use super::{DependencyDeclaration, PackageDescriptor};

/// Option enabling the externally built Qt from the registry.
pub const USE_CONAN_QT: &str = "USE_CONAN_QT";

/// The QtMarkdown recipe: parser, renderer and editor libraries for Qt.
///
/// - `microtex` is always required, with its Qt renderer enabled, logging
///   disabled and its own `USE_CONAN_QT` following ours.
/// - `qt` is required only with `USE_CONAN_QT`, and always as a shared build.
/// - `fPIC` does not exist on Windows.
pub fn qtmarkdown() -> PackageDescriptor {
  PackageDescriptor {
    name: "QtMarkdown".to_string(),
    version: "0.1".to_string(),
    license: None,
    author: Some("PikachuHy <pikachuhy@163.com>".to_string()),
    url: None,
    description: Some("Markdown parser, renderer and editor components for Qt".to_string()),
    topics: ["markdown", "parser"].into_iter().map(String::from).collect(),
    exports_sources: ["CMakeLists.txt", "src/*", "example/*", "assets/*", "MarkdownInstall.cmake"]
      .into_iter()
      .map(String::from)
      .collect(),
    options: OptionTable::new()
      .declare("shared", false)
      .declare_except("fPIC", true, &[Os::Windows])
      .declare(USE_CONAN_QT, false),
    requires: vec![
      DependencyDeclaration::new(PackageRef::new("microtex", "1.0.0").with_channel("demo", "testing"))
        .force("QT", true)
        .inherit(USE_CONAN_QT, USE_CONAN_QT)
        .force("HAVE_LOG", false),
      DependencyDeclaration::new(PackageRef::new("magic_enum", "0.7.3")),
      DependencyDeclaration::new(PackageRef::new("qt", "6.2.3"))
        .when(USE_CONAN_QT)
        .force("shared", true),
    ],
    package_info: PackageInfo::new(
      &["include"],
      &[
        "QtMarkdownParser",
        "QtMarkdownRender",
        "QtMarkdownEditorCore",
        "QtWidgetMarkdownEditor",
        "QtQuickMarkdownEditor",
      ],
    ),
    build: BuildCommands::default(),
  }
}
