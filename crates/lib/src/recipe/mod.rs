//! Package recipes.
//!
//! A recipe ([`PackageDescriptor`]) is the static description of one package:
//! metadata, the options it offers, the packages it requires (and which options
//! it forces on them), the sources it exports and the artifacts it provides.
//! Recipes are either built in ([`qtmarkdown`]) or loaded from TOML with
//! [`load_recipe`].

mod qtmarkdown;
mod types;

use std::path::Path;

use tracing::debug;

pub use qtmarkdown::qtmarkdown;
pub use types::*;

/// Load and validate a recipe from a TOML file.
pub fn load_recipe(path: &Path) -> Result<PackageDescriptor, RecipeError> {
  let content = std::fs::read_to_string(path).map_err(|source| RecipeError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let recipe = parse_recipe(&content).map_err(|e| match e {
    RecipeError::Parse { message, .. } => RecipeError::Parse {
      path: path.to_path_buf(),
      message,
    },
    other => other,
  })?;

  debug!(path = %path.display(), reference = %recipe.reference(), "loaded recipe");
  Ok(recipe)
}

/// Parse and validate a recipe from TOML text.
pub fn parse_recipe(content: &str) -> Result<PackageDescriptor, RecipeError> {
  let recipe: PackageDescriptor = toml::from_str(content).map_err(|e| RecipeError::Parse {
    path: Default::default(),
    message: e.to_string(),
  })?;
  recipe.validate()?;
  Ok(recipe)
}
