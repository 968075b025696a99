//! Dependency graph resolution.
//!
//! Turns a recipe's requirements into a resolved graph of packages:
//!
//! 1. Requirements whose `when` option is disabled are dropped
//! 2. Override values are computed from the effective options
//! 3. Every reference is looked up in the registry; a miss aborts resolution
//! 4. Overrides are validated against the dependency's declared options
//! 5. Requirements of resolved packages are followed breadth first
//! 6. The graph is checked for cycles and sorted topologically
//!
//! Node order follows declaration order, so the same inputs always yield the
//! same graph, which keeps build keys stable.

use std::collections::{BTreeMap, HashMap, VecDeque};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::options::EffectiveOptions;
use crate::recipe::{DependencyDeclaration, OverrideValue, PackageDescriptor};
use crate::registry::{DependencyDescriptor, PackageRef, Registry, RegistryError};

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("dependency unresolved: {reference} (name '{name}', version '{version}') not found in registry")]
  DependencyUnresolved {
    name: String,
    version: String,
    reference: PackageRef,
  },

  #[error("option conflict: dependency '{dependency}' does not declare option '{option}'")]
  OptionConflict { dependency: String, option: String },

  #[error("version conflict for '{name}': {existing} already in graph, {requested} also required")]
  VersionConflict {
    name: String,
    existing: PackageRef,
    requested: PackageRef,
  },

  #[error("dependency cycle detected at '{package}'")]
  Cycle { package: String },

  #[error(transparent)]
  Registry(#[from] RegistryError),
}

/// A dependency after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
  pub reference: PackageRef,
  /// Options forced on the dependency by the recipe, already resolved to values.
  pub overrides: BTreeMap<String, bool>,
  /// Declared by the recipe itself rather than pulled in transitively.
  pub direct: bool,
  #[serde(skip)]
  pub descriptor: DependencyDescriptor,
}

/// Resolved dependencies with edges from dependents to their dependencies.
#[derive(Debug, Default)]
pub struct DependencyGraph {
  graph: DiGraph<ResolvedDependency, ()>,
  by_name: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
  /// Dependencies in resolution order: direct requirements in declaration
  /// order, then transitive ones breadth first.
  pub fn dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
    self.graph.node_indices().map(|idx| &self.graph[idx])
  }

  pub fn get(&self, name: &str) -> Option<&ResolvedDependency> {
    self.by_name.get(name).map(|&idx| &self.graph[idx])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.by_name.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Packages required directly by `name`.
  pub fn requires_of(&self, name: &str) -> Vec<&PackageRef> {
    let Some(&idx) = self.by_name.get(name) else {
      return Vec::new();
    };
    let mut requires: Vec<_> = self
      .graph
      .neighbors(idx)
      .map(|dep| &self.graph[dep].reference)
      .collect();
    requires.sort();
    requires
  }

  /// Dependencies ordered so that every package comes after the packages it requires.
  pub fn topological_order(&self) -> Vec<&ResolvedDependency> {
    // Cycles are rejected when the graph is built.
    let mut order = toposort(&self.graph, None).unwrap_or_default();
    order.reverse();
    order.into_iter().map(|idx| &self.graph[idx]).collect()
  }

  /// `(reference, overrides)` pairs in resolution order, for hashing.
  pub fn fingerprint(&self) -> Vec<(String, BTreeMap<String, bool>)> {
    self
      .dependencies()
      .map(|dep| (dep.reference.to_string(), dep.overrides.clone()))
      .collect()
  }
}

struct Pending {
  reference: PackageRef,
  parent: Option<NodeIndex>,
  overrides: BTreeMap<String, bool>,
  direct: bool,
}

fn resolve_overrides(declaration: &DependencyDeclaration, options: &EffectiveOptions) -> BTreeMap<String, bool> {
  let mut resolved = BTreeMap::new();

  for (option, value) in &declaration.overrides {
    let value = match value {
      OverrideValue::Fixed(value) => Some(*value),
      OverrideValue::Inherit { inherit } => options.get(inherit),
    };

    match value {
      Some(value) => {
        resolved.insert(option.clone(), value);
      }
      None => debug!(
        dependency = %declaration.reference,
        option = %option,
        "inherited option does not exist on this platform, not propagating"
      ),
    }
  }

  resolved
}

/// Resolve the dependency graph of `recipe` for the given effective options.
pub fn build_graph(
  recipe: &PackageDescriptor,
  options: &EffectiveOptions,
  registry: &impl Registry,
) -> Result<DependencyGraph, GraphError> {
  let mut graph = DependencyGraph::default();
  let mut queue = VecDeque::new();

  for declaration in &recipe.requires {
    if let Some(condition) = &declaration.when
      && !options.is_enabled(condition)
    {
      debug!(dependency = %declaration.reference, condition = %condition, "condition disabled, skipping requirement");
      continue;
    }

    queue.push_back(Pending {
      reference: declaration.reference.clone(),
      parent: None,
      overrides: resolve_overrides(declaration, options),
      direct: true,
    });
  }

  while let Some(pending) = queue.pop_front() {
    let name = pending.reference.name.clone();

    if name == recipe.name {
      return Err(GraphError::Cycle { package: name });
    }

    if let Some(&existing) = graph.by_name.get(&name) {
      let existing_ref = &graph.graph[existing].reference;
      if *existing_ref != pending.reference {
        return Err(GraphError::VersionConflict {
          name,
          existing: existing_ref.clone(),
          requested: pending.reference,
        });
      }
      if let Some(parent) = pending.parent {
        graph.graph.update_edge(parent, existing, ());
      }
      trace!(dependency = %pending.reference, "already resolved");
      continue;
    }

    let descriptor = registry
      .lookup(&pending.reference)?
      .ok_or_else(|| GraphError::DependencyUnresolved {
        name: pending.reference.name.clone(),
        version: pending.reference.version.clone(),
        reference: pending.reference.clone(),
      })?;

    if let Some(option) = pending.overrides.keys().find(|option| !descriptor.options.contains(option)) {
      return Err(GraphError::OptionConflict {
        dependency: pending.reference.to_string(),
        option: option.clone(),
      });
    }

    debug!(dependency = %pending.reference, direct = pending.direct, "resolved dependency");
    let requires = descriptor.requires.clone();
    let idx = graph.graph.add_node(ResolvedDependency {
      reference: pending.reference,
      overrides: pending.overrides,
      direct: pending.direct,
      descriptor,
    });
    graph.by_name.insert(name, idx);

    if let Some(parent) = pending.parent {
      graph.graph.update_edge(parent, idx, ());
    }

    for requirement in requires {
      queue.push_back(Pending {
        reference: requirement,
        parent: Some(idx),
        overrides: BTreeMap::new(),
        direct: false,
      });
    }
  }

  if let Err(cycle) = toposort(&graph.graph, None) {
    return Err(GraphError::Cycle {
      package: graph.graph[cycle.node_id()].reference.name.clone(),
    });
  }

  info!(dependencies = graph.len(), "dependency graph resolved");
  Ok(graph)
}
