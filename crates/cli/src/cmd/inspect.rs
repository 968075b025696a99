//! Implementation of the `qtmd inspect` command.

use anyhow::Result;
use serde::Serialize;

use qtmd_lib::artifact::{PackageInfo, library_file_names};
use qtmd_lib::options::{EffectiveOptions, resolve_options};
use qtmd_lib::recipe::PackageDescriptor;
use qtmd_lib::settings::Settings;

use super::Selection;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

const SHARED_OPTION: &str = "shared";

#[derive(Serialize)]
struct InspectReport<'a> {
  recipe: &'a PackageDescriptor,
  settings: &'a Settings,
  options: &'a EffectiveOptions,
  package_info: &'a PackageInfo,
  /// Library file names expected under `lib/` for these settings.
  library_files: Vec<String>,
}

pub fn cmd_inspect(selection: &Selection, format: OutputFormat) -> Result<()> {
  let recipe = selection.recipe()?;
  let settings = selection.settings()?;
  let options = resolve_options(&recipe.options, settings.os, &selection.overrides()?)?;
  let shared = options.is_enabled(SHARED_OPTION);

  let library_files: Vec<String> = recipe
    .package_info
    .libs
    .iter()
    .flat_map(|lib| library_file_names(lib, &settings, shared))
    .collect();

  if format.is_json() {
    return print_json(&InspectReport {
      recipe: &recipe,
      settings: &settings,
      options: &options,
      package_info: &recipe.package_info,
      library_files,
    });
  }

  print_success(&recipe.reference().to_string());
  if let Some(description) = &recipe.description {
    print_stat("Description", description);
  }
  if let Some(author) = &recipe.author {
    print_stat("Author", author);
  }
  if let Some(license) = &recipe.license {
    print_stat("License", license);
  }
  if let Some(url) = &recipe.url {
    print_stat("URL", url);
  }
  if !recipe.topics.is_empty() {
    print_stat("Topics", &recipe.topics.iter().cloned().collect::<Vec<_>>().join(", "));
  }
  print_stat("Settings", &settings.to_string());

  println!();
  println!("Options:");
  for (name, decl) in recipe.options.iter() {
    match options.get(name) {
      Some(value) => println!("  {name} = {value} (default {})", decl.default),
      None => println!("  {name} (not available on {})", settings.os),
    }
  }

  println!();
  println!("Requires:");
  if recipe.requires.is_empty() {
    println!("  (none)");
  }
  for requirement in &recipe.requires {
    match &requirement.when {
      Some(option) => println!("  {} (when {option})", requirement.reference),
      None => println!("  {}", requirement.reference),
    }
  }

  println!();
  println!("Package info:");
  print_stat("Include dirs", &recipe.package_info.include_dirs.join(", "));
  print_stat("Libraries", &recipe.package_info.libs.join(", "));
  print_stat("Library files", &library_files.join(", "));

  Ok(())
}
