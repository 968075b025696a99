//! Recipe options and their resolution for a target platform.
//!
//! A recipe declares its options once in an [`OptionTable`]. For a build, the
//! table is narrowed to a [`PlatformSchema`] for the target OS (options that do
//! not exist on that OS, such as `fPIC` on Windows, are absent from the schema
//! rather than defaulted) and caller overrides are applied on top to produce the
//! [`EffectiveOptions`].
//!
//! Overrides that name an option the recipe never declared fail fast. Overrides
//! that name a declared option which is inapplicable on the target OS are
//! dropped with a warning.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::platform::os::Os;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
  #[error("unknown option '{0}'")]
  UnknownOption(String),

  #[error("malformed option override '{0}', expected name=value")]
  Malformed(String),

  #[error("invalid value '{value}' for option '{name}', expected true or false")]
  InvalidValue { name: String, value: String },
}

/// Declaration of a single option in a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OptionDeclRepr")]
pub struct OptionDecl {
  pub default: bool,
  /// Operating systems on which the option does not exist.
  #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
  pub unsupported_on: BTreeSet<Os>,
}

impl OptionDecl {
  pub fn new(default: bool) -> Self {
    Self {
      default,
      unsupported_on: BTreeSet::new(),
    }
  }

  pub fn applies_to(&self, os: Os) -> bool {
    !self.unsupported_on.contains(&os)
  }
}

/// Recipe files may write `shared = false` instead of `[options.shared] default = false`.
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionDeclRepr {
  Short(bool),
  Full {
    default: bool,
    #[serde(default)]
    unsupported_on: BTreeSet<Os>,
  },
}

impl From<OptionDeclRepr> for OptionDecl {
  fn from(repr: OptionDeclRepr) -> Self {
    match repr {
      OptionDeclRepr::Short(default) => OptionDecl::new(default),
      OptionDeclRepr::Full { default, unsupported_on } => OptionDecl { default, unsupported_on },
    }
  }
}

/// Every option a recipe declares, across all platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionTable(BTreeMap<String, OptionDecl>);

impl OptionTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare an option available on every OS.
  pub fn declare(mut self, name: &str, default: bool) -> Self {
    self.0.insert(name.to_string(), OptionDecl::new(default));
    self
  }

  /// Declare an option that does not exist on the listed operating systems.
  pub fn declare_except(mut self, name: &str, default: bool, unsupported_on: &[Os]) -> Self {
    self.0.insert(
      name.to_string(),
      OptionDecl {
        default,
        unsupported_on: unsupported_on.iter().copied().collect(),
      },
    );
    self
  }

  pub fn get(&self, name: &str) -> Option<&OptionDecl> {
    self.0.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionDecl)> {
    self.0.iter().map(|(name, decl)| (name.as_str(), decl))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Construct the schema of options that exist on `os`, with their defaults.
  pub fn schema_for(&self, os: Os) -> PlatformSchema {
    let defaults = self
      .0
      .iter()
      .filter(|(_, decl)| decl.applies_to(os))
      .map(|(name, decl)| (name.clone(), decl.default))
      .collect();

    PlatformSchema { os, defaults }
  }
}

impl<const N: usize> From<[(&str, bool); N]> for OptionTable {
  fn from(entries: [(&str, bool); N]) -> Self {
    entries
      .into_iter()
      .fold(OptionTable::new(), |table, (name, default)| table.declare(name, default))
  }
}

/// The options that exist for one target OS, with their default values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSchema {
  os: Os,
  defaults: BTreeMap<String, bool>,
}

impl PlatformSchema {
  pub fn os(&self) -> Os {
    self.os
  }

  pub fn contains(&self, name: &str) -> bool {
    self.defaults.contains_key(name)
  }

  pub fn defaults(&self) -> EffectiveOptions {
    EffectiveOptions(self.defaults.clone())
  }
}

/// Caller-supplied `name=value` overrides, in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionOverrides(Vec<(String, bool)>);

impl OptionOverrides {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(mut self, name: &str, value: bool) -> Self {
    self.0.push((name.to_string(), value));
    self
  }

  /// Parse overrides such as `shared=True` or `USE_CONAN_QT=off`.
  pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, OptionsError> {
    let mut overrides = Self::new();

    for item in raw {
      let item = item.as_ref();
      let (name, value) = item
        .split_once('=')
        .map(|(n, v)| (n.trim(), v.trim()))
        .filter(|(n, _)| !n.is_empty())
        .ok_or_else(|| OptionsError::Malformed(item.to_string()))?;

      let value = parse_bool(value).ok_or_else(|| OptionsError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
      })?;

      overrides = overrides.set(name, value);
    }

    Ok(overrides)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
    self.0.iter().map(|(name, value)| (name.as_str(), *value))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Parse the boolean spellings accepted on the command line and in recipes.
pub fn parse_bool(value: &str) -> Option<bool> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Some(true),
    "false" | "0" | "no" | "off" => Some(false),
    _ => None,
  }
}

/// The final option values of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveOptions(BTreeMap<String, bool>);

impl EffectiveOptions {
  pub fn get(&self, name: &str) -> Option<bool> {
    self.0.get(name).copied()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }

  /// True only when the option exists and is enabled.
  pub fn is_enabled(&self, name: &str) -> bool {
    self.get(name).unwrap_or(false)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
    self.0.iter().map(|(name, value)| (name.as_str(), *value))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<const N: usize> From<[(&str, bool); N]> for EffectiveOptions {
  fn from(entries: [(&str, bool); N]) -> Self {
    EffectiveOptions(
      entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect(),
    )
  }
}

/// Resolve the effective options of a build for `os`.
pub fn resolve_options(
  table: &OptionTable,
  os: Os,
  overrides: &OptionOverrides,
) -> Result<EffectiveOptions, OptionsError> {
  let schema = table.schema_for(os);
  let mut effective = schema.defaults();

  for (name, value) in overrides.iter() {
    if schema.contains(name) {
      debug!(option = name, value, "applying option override");
      effective.0.insert(name.to_string(), value);
    } else if table.contains(name) {
      warn!(option = name, os = %os, "option does not exist on this platform, ignoring override");
    } else {
      return Err(OptionsError::UnknownOption(name.to_string()));
    }
  }

  Ok(effective)
}
