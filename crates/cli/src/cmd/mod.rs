mod build;
mod graph;
mod info;
mod inspect;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use qtmd_lib::options::OptionOverrides;
use qtmd_lib::recipe::{PackageDescriptor, load_recipe, qtmarkdown};
use qtmd_lib::settings::Settings;

pub use build::{BuildArgs, cmd_build};
pub use graph::cmd_graph;
pub use info::cmd_info;
pub use inspect::cmd_inspect;

/// Store and registry locations after flags and environment are applied.
#[derive(Debug, Clone)]
pub struct Dirs {
  pub store: PathBuf,
  pub registry: PathBuf,
}

/// Which recipe to use and for which target.
#[derive(Args, Debug, Clone)]
pub struct Selection {
  /// Recipe file (TOML). The built-in QtMarkdown recipe is used when omitted
  #[arg(long, value_name = "FILE")]
  pub recipe: Option<PathBuf>,

  /// Option override, e.g. `-o shared=true`
  #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
  pub options: Vec<String>,

  /// Setting override, e.g. `-s build_type=Debug`
  #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
  pub settings: Vec<String>,
}

impl Selection {
  pub fn recipe(&self) -> Result<PackageDescriptor> {
    match &self.recipe {
      Some(path) => Ok(load_recipe(path)?),
      None => Ok(qtmarkdown()),
    }
  }

  /// Host settings with `-s` overrides applied.
  pub fn settings(&self) -> Result<Settings> {
    let detected = Settings::detect().context("Failed to detect host settings")?;
    Ok(detected.with_overrides(&self.settings)?)
  }

  pub fn overrides(&self) -> Result<OptionOverrides> {
    Ok(OptionOverrides::parse(&self.options)?)
  }

  /// Directory holding the recipe file, if one was given.
  pub fn recipe_dir(&self) -> Option<PathBuf> {
    let path = self.recipe.as_deref()?;
    let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    path.parent().map(Path::to_path_buf)
  }
}
