//! Target platforms and well-known paths.
//!
//! A build targets a [`Platform`] taken from its settings. When that differs
//! from the host the generated toolchain declares a cross build.

pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;
use std::str::FromStr;

use arch::Arch;
use os::Os;
use thiserror::Error;

/// A platform identifier that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct PlatformParseError {
  pub kind: &'static str,
  pub value: String,
}

impl PlatformParseError {
  pub(crate) fn new(kind: &'static str, value: &str) -> Self {
    Self {
      kind,
      value: value.to_string(),
    }
  }
}

/// CPU architecture and operating system, written `x86_64-linux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// The machine we are running on, if it is one we can build on.
  pub fn host() -> Option<Self> {
    Some(Self::new(Arch::current()?, Os::current()?))
  }

  /// Building for `self` needs a cross toolchain on this host.
  ///
  /// An undetectable host counts as cross, so the toolchain always names its system.
  pub fn is_cross(&self) -> bool {
    Self::host().is_none_or(|host| host != *self)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.arch, self.os)
  }
}

impl FromStr for Platform {
  type Err = PlatformParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (arch, os) = s.split_once('-').ok_or_else(|| PlatformParseError::new("platform", s))?;
    Ok(Self::new(arch.parse()?, os.parse()?))
  }
}
