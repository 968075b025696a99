//! Implementation of the `qtmd graph` command.
//!
//! Resolves effective options and the dependency graph against the local
//! registry without touching the store.

use std::collections::BTreeMap;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use qtmd_lib::graph::DependencyGraph;
use qtmd_lib::options::EffectiveOptions;
use qtmd_lib::pipeline::resolve;
use qtmd_lib::registry::LocalRegistry;
use qtmd_lib::settings::Settings;

use super::{Dirs, Selection};
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols};

#[derive(Serialize)]
struct GraphNode {
  reference: String,
  direct: bool,
  overrides: BTreeMap<String, bool>,
  requires: Vec<String>,
}

#[derive(Serialize)]
struct GraphReport<'a> {
  reference: String,
  settings: &'a Settings,
  options: &'a EffectiveOptions,
  dependencies: Vec<GraphNode>,
  /// Dependencies first, dependents last.
  build_order: Vec<String>,
}

fn nodes(graph: &DependencyGraph) -> Vec<GraphNode> {
  graph
    .dependencies()
    .map(|dep| GraphNode {
      reference: dep.reference.to_string(),
      direct: dep.direct,
      overrides: dep.overrides.clone(),
      requires: graph
        .requires_of(&dep.reference.name)
        .into_iter()
        .map(ToString::to_string)
        .collect(),
    })
    .collect()
}

pub fn cmd_graph(selection: &Selection, dirs: &Dirs, format: OutputFormat) -> Result<()> {
  let recipe = selection.recipe()?;
  let settings = selection.settings()?;
  let overrides = selection.overrides()?;
  let registry = LocalRegistry::new(dirs.registry.clone());

  let resolution = resolve(&recipe, &settings, &overrides, &registry)?;

  if format.is_json() {
    return print_json(&GraphReport {
      reference: recipe.reference().to_string(),
      settings: &settings,
      options: &resolution.options,
      dependencies: nodes(&resolution.graph),
      build_order: resolution
        .graph
        .topological_order()
        .into_iter()
        .map(|dep| dep.reference.to_string())
        .collect(),
    });
  }

  print_success(&format!("Resolved {}", recipe.reference()));
  print_stat("Settings", &settings.to_string());
  println!();

  println!("Options:");
  for (name, value) in resolution.options.iter() {
    println!("  {name} = {value}");
  }

  println!();
  println!("Dependencies:");
  if resolution.graph.is_empty() {
    println!("  (none)");
  }
  for node in nodes(&resolution.graph) {
    let marker = if node.direct { symbols::ARROW } else { symbols::INFO };
    println!(
      "  {} {}",
      marker.if_supports_color(Stream::Stdout, |s| s.cyan()),
      node.reference
    );
    for (option, value) in &node.overrides {
      println!(
        "      {}",
        format!("{option}={value}").if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
    for required in &node.requires {
      println!("      requires {required}");
    }
  }

  Ok(())
}
