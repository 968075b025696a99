//! Package registries.
//!
//! A registry answers one question: given a [`PackageRef`], what does the
//! package look like? The answer is a [`DependencyDescriptor`] listing the
//! options it declares, its own requirements and, once built, where its
//! package folder is.
//!
//! # Implementations
//!
//! - [`LocalRegistry`] - descriptors stored as TOML files on disk
//! - [`MemoryRegistry`] - in-process descriptors, for embedding and tests

mod local;
mod memory;
mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use local::LocalRegistry;
pub use memory::MemoryRegistry;
pub use types::*;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("failed to read descriptor {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse descriptor {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("descriptor {path} describes {found}, expected {expected}")]
  ReferenceMismatch {
    path: PathBuf,
    expected: PackageRef,
    found: PackageRef,
  },

  #[error("failed to write descriptor {path}: {message}")]
  Write { path: PathBuf, message: String },
}

/// Source of dependency descriptors.
pub trait Registry {
  /// Look up a package by reference.
  ///
  /// Returns `Ok(None)` when the registry has no such package.
  fn lookup(&self, reference: &PackageRef) -> Result<Option<DependencyDescriptor>, RegistryError>;
}

impl<R: Registry + ?Sized> Registry for &R {
  fn lookup(&self, reference: &PackageRef) -> Result<Option<DependencyDescriptor>, RegistryError> {
    (**self).lookup(reference)
  }
}
