//! Build settings: the `(os, compiler, build_type, arch)` tuple.
//!
//! Settings decide binary compatibility. Two builds of the same recipe with the
//! same options but different settings are different packages, so settings are
//! always part of the build key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::{Platform, PlatformParseError};
use crate::platform::arch::Arch;
use crate::platform::os::Os;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("host platform is not supported ({os}/{arch})")]
  UnsupportedHost { os: &'static str, arch: &'static str },

  #[error("malformed setting '{0}', expected key=value")]
  Malformed(String),

  #[error("unknown setting '{0}' (expected os, compiler, build_type or arch)")]
  UnknownSetting(String),

  #[error(transparent)]
  Parse(#[from] PlatformParseError),
}

/// Compiler family used for the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Compiler {
  Gcc,
  Clang,
  AppleClang,
  Msvc,
}

impl Compiler {
  /// The compiler a host of the given OS uses unless told otherwise.
  pub fn default_for(os: Os) -> Self {
    match os {
      Os::Linux => Self::Gcc,
      Os::MacOs => Self::AppleClang,
      Os::Windows => Self::Msvc,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gcc => "gcc",
      Self::Clang => "clang",
      Self::AppleClang => "apple-clang",
      Self::Msvc => "msvc",
    }
  }
}

impl fmt::Display for Compiler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Compiler {
  type Err = PlatformParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "gcc" | "g++" => Ok(Self::Gcc),
      "clang" | "clang++" => Ok(Self::Clang),
      "apple-clang" | "apple_clang" | "appleclang" => Ok(Self::AppleClang),
      "msvc" | "visual studio" | "cl" => Ok(Self::Msvc),
      _ => Err(PlatformParseError::new("compiler", s)),
    }
  }
}

impl TryFrom<String> for Compiler {
  type Error = PlatformParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Compiler> for String {
  fn from(compiler: Compiler) -> Self {
    compiler.as_str().to_string()
  }
}

/// CMake-style build configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuildType {
  Debug,
  #[default]
  Release,
  RelWithDebInfo,
  MinSizeRel,
}

impl BuildType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "Debug",
      Self::Release => "Release",
      Self::RelWithDebInfo => "RelWithDebInfo",
      Self::MinSizeRel => "MinSizeRel",
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for BuildType {
  type Err = PlatformParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "debug" => Ok(Self::Debug),
      "release" => Ok(Self::Release),
      "relwithdebinfo" => Ok(Self::RelWithDebInfo),
      "minsizerel" => Ok(Self::MinSizeRel),
      _ => Err(PlatformParseError::new("build_type", s)),
    }
  }
}

impl TryFrom<String> for BuildType {
  type Error = PlatformParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<BuildType> for String {
  fn from(build_type: BuildType) -> Self {
    build_type.as_str().to_string()
  }
}

/// The settings tuple for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
  pub os: Os,
  pub compiler: Compiler,
  pub build_type: BuildType,
  pub arch: Arch,
}

impl Settings {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self {
      os,
      compiler: Compiler::default_for(os),
      build_type: BuildType::default(),
      arch,
    }
  }

  /// The platform these settings build for.
  pub fn platform(&self) -> Platform {
    Platform::new(self.arch, self.os)
  }

  /// Settings of the machine we are running on, in `Release`.
  pub fn detect() -> Result<Self, SettingsError> {
    match (Os::current(), Arch::current()) {
      (Some(os), Some(arch)) => Ok(Self::new(os, arch)),
      _ => Err(SettingsError::UnsupportedHost {
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
      }),
    }
  }

  /// Apply `key=value` overrides such as `os=Windows` or `build_type=Debug`.
  ///
  /// Changing `os` without also naming a compiler switches the compiler to that
  /// OS's default, so `-s os=Windows` on a Linux host yields msvc.
  pub fn with_overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Result<Self, SettingsError> {
    let mut compiler_set = false;
    let mut os_changed = false;

    for raw in overrides {
      let raw = raw.as_ref();
      let (key, value) = raw
        .split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .ok_or_else(|| SettingsError::Malformed(raw.to_string()))?;

      match key {
        "os" => {
          let os = value.parse()?;
          os_changed |= os != self.os;
          self.os = os;
        }
        "compiler" => {
          self.compiler = value.parse()?;
          compiler_set = true;
        }
        "build_type" => self.build_type = value.parse()?,
        "arch" => self.arch = value.parse()?,
        other => return Err(SettingsError::UnknownSetting(other.to_string())),
      }
    }

    if os_changed && !compiler_set {
      self.compiler = Compiler::default_for(self.os);
    }

    Ok(self)
  }
}

impl fmt::Display for Settings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "os={} compiler={} build_type={} arch={}",
      self.os, self.compiler, self.build_type, self.arch
    )
  }
}
