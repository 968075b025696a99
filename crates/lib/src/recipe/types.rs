use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::PackageInfo;
use crate::options::OptionTable;
use crate::registry::{PackageRef, RefParseError};
use crate::tool::BuildCommands;

#[derive(Debug, Error)]
pub enum RecipeError {
  #[error("failed to read recipe {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse recipe {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("invalid package name or version: {0}")]
  InvalidReference(#[from] RefParseError),

  #[error("requirement '{requirement}' refers to option '{option}' which the recipe does not declare")]
  UndeclaredOption { requirement: String, option: String },

  #[error("package '{0}' is required more than once")]
  DuplicateRequirement(String),
}

/// Value pushed into a dependency's option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
  /// Always this value.
  Fixed(bool),
  /// Whatever value the depending recipe's own option has.
  Inherit { inherit: String },
}

impl OverrideValue {
  pub fn inherit(option: &str) -> Self {
    Self::Inherit {
      inherit: option.to_string(),
    }
  }
}

/// One requirement of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
  pub reference: PackageRef,

  /// Recipe option that must be enabled for this requirement to exist.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub when: Option<String>,

  /// Options forced on the dependency, keyed by the dependency's option name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub overrides: BTreeMap<String, OverrideValue>,
}

impl DependencyDeclaration {
  pub fn new(reference: PackageRef) -> Self {
    Self {
      reference,
      when: None,
      overrides: BTreeMap::new(),
    }
  }

  pub fn when(mut self, option: &str) -> Self {
    self.when = Some(option.to_string());
    self
  }

  pub fn force(mut self, option: &str, value: bool) -> Self {
    self.overrides.insert(option.to_string(), OverrideValue::Fixed(value));
    self
  }

  pub fn inherit(mut self, option: &str, from: &str) -> Self {
    self.overrides.insert(option.to_string(), OverrideValue::inherit(from));
    self
  }
}

/// A package recipe: metadata, options, requirements and what the package provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
  pub name: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub license: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub topics: BTreeSet<String>,

  /// Glob patterns, relative to the source directory, of files copied into the build.
  #[serde(default)]
  pub exports_sources: Vec<String>,

  #[serde(default)]
  pub options: OptionTable,

  #[serde(default)]
  pub requires: Vec<DependencyDeclaration>,

  #[serde(default)]
  pub package_info: PackageInfo,

  /// Command templates for the external build system. Defaults to CMake.
  #[serde(default)]
  pub build: BuildCommands,
}

impl PackageDescriptor {
  pub fn reference(&self) -> PackageRef {
    PackageRef::new(&self.name, &self.version)
  }

  /// Check the recipe is internally consistent.
  ///
  /// Every option a requirement is conditioned on or inherits from must be one
  /// of the recipe's own options, and each package may be required once.
  pub fn validate(&self) -> Result<(), RecipeError> {
    format!("{}/{}", self.name, self.version).parse::<PackageRef>()?;

    let mut seen = BTreeSet::new();
    for requirement in &self.requires {
      let name = &requirement.reference.name;
      if !seen.insert(name.as_str()) {
        return Err(RecipeError::DuplicateRequirement(name.clone()));
      }

      let inherited = requirement.overrides.values().filter_map(|value| match value {
        OverrideValue::Inherit { inherit } => Some(inherit),
        OverrideValue::Fixed(_) => None,
      });

      for option in requirement.when.iter().chain(inherited) {
        if !self.options.contains(option) {
          return Err(RecipeError::UndeclaredOption {
            requirement: requirement.reference.to_string(),
            option: option.clone(),
          });
        }
      }
    }

    Ok(())
  }
}
