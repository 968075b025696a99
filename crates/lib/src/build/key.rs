use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::PackageInfo;
use crate::graph::DependencyGraph;
use crate::options::EffectiveOptions;
use crate::recipe::PackageDescriptor;
use crate::settings::Settings;
use crate::tool::BuildCommands;
use crate::util::hash::{HashError, Hashable, ObjectHash};

/// Everything that decides the binary a build produces.
#[derive(Debug, Serialize)]
struct BuildKeyInput<'a> {
  name: &'a str,
  version: &'a str,
  settings: &'a Settings,
  options: &'a EffectiveOptions,
  dependencies: Vec<(String, BTreeMap<String, bool>)>,
  commands: &'a BuildCommands,
  exports_sources: &'a [String],
  package_info: &'a PackageInfo,
}

impl Hashable for BuildKeyInput<'_> {}

/// Compute the key naming a build's store folder and lock.
pub fn build_key(
  recipe: &PackageDescriptor,
  settings: &Settings,
  options: &EffectiveOptions,
  graph: &DependencyGraph,
) -> Result<ObjectHash, HashError> {
  BuildKeyInput {
    name: &recipe.name,
    version: &recipe.version,
    settings,
    options,
    dependencies: graph.fingerprint(),
    commands: &recipe.build,
    exports_sources: &recipe.exports_sources,
    package_info: &recipe.package_info,
  }
  .compute_hash()
}
