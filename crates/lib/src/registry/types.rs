use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::PackageInfo;
use crate::options::OptionTable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid package reference '{reference}': {reason}")]
pub struct RefParseError {
  pub reference: String,
  pub reason: &'static str,
}

/// A package reference: `name/version[@user/channel]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
  pub name: String,
  pub version: String,
  pub user: Option<String>,
  pub channel: Option<String>,
}

impl PackageRef {
  pub fn new(name: &str, version: &str) -> Self {
    Self {
      name: name.to_string(),
      version: version.to_string(),
      user: None,
      channel: None,
    }
  }

  pub fn with_channel(mut self, user: &str, channel: &str) -> Self {
    self.user = Some(user.to_string());
    self.channel = Some(channel.to_string());
    self
  }

  /// `name/version` without the user/channel qualifier.
  pub fn short(&self) -> String {
    format!("{}/{}", self.name, self.version)
  }
}

impl fmt::Display for PackageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.name, self.version)?;
    if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
      write!(f, "@{}/{}", user, channel)?;
    }
    Ok(())
  }
}

fn valid_segment(segment: &str) -> bool {
  !segment.is_empty()
    && segment
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
}

impl FromStr for PackageRef {
  type Err = RefParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = |reason| RefParseError {
      reference: s.to_string(),
      reason,
    };

    let (base, qualifier) = match s.split_once('@') {
      Some((base, qualifier)) => (base, Some(qualifier)),
      None => (s, None),
    };

    let (name, version) = base.split_once('/').ok_or_else(|| err("missing '/version'"))?;
    if !valid_segment(name) || !valid_segment(version) {
      return Err(err("name and version must be non-empty and contain no separators"));
    }

    let mut reference = PackageRef::new(name, version);

    if let Some(qualifier) = qualifier {
      let (user, channel) = qualifier
        .split_once('/')
        .ok_or_else(|| err("qualifier must be 'user/channel'"))?;
      if !valid_segment(user) || !valid_segment(channel) {
        return Err(err("user and channel must be non-empty and contain no separators"));
      }
      reference = reference.with_channel(user, channel);
    }

    Ok(reference)
  }
}

impl TryFrom<String> for PackageRef {
  type Error = RefParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<PackageRef> for String {
  fn from(reference: PackageRef) -> Self {
    reference.to_string()
  }
}

/// What the registry knows about a package that can be depended on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
  pub reference: PackageRef,

  /// The dependency's own requirements.
  #[serde(default)]
  pub requires: Vec<PackageRef>,

  /// Where the dependency's built package lives, if it has been built.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_folder: Option<PathBuf>,

  /// Options the dependency declares. Overrides pushed into it must name one of these.
  #[serde(default)]
  pub options: OptionTable,

  #[serde(default)]
  pub package_info: PackageInfo,
}

impl DependencyDescriptor {
  pub fn new(reference: PackageRef, options: OptionTable) -> Self {
    Self {
      reference,
      requires: Vec::new(),
      package_folder: None,
      options,
      package_info: PackageInfo::default(),
    }
  }

  pub fn with_requires(mut self, requires: Vec<PackageRef>) -> Self {
    self.requires = requires;
    self
  }
}
