use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::{DESCRIPTOR_FILE, REGISTRY_EMPTY_SEGMENT};

use super::{DependencyDescriptor, PackageRef, Registry, RegistryError};

/// A registry backed by a directory tree of TOML descriptors.
///
/// Layout: `<root>/<name>/<version>/<user>/<channel>/package.toml`, with `_`
/// standing in for a missing user or channel. A `package/` directory next to
/// the descriptor is used as the package folder when the descriptor names none.
#[derive(Debug, Clone)]
pub struct LocalRegistry {
  root: PathBuf,
}

impl LocalRegistry {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory holding the descriptor for `reference`.
  pub fn package_dir(&self, reference: &PackageRef) -> PathBuf {
    self
      .root
      .join(&reference.name)
      .join(&reference.version)
      .join(reference.user.as_deref().unwrap_or(REGISTRY_EMPTY_SEGMENT))
      .join(reference.channel.as_deref().unwrap_or(REGISTRY_EMPTY_SEGMENT))
  }

  pub fn descriptor_path(&self, reference: &PackageRef) -> PathBuf {
    self.package_dir(reference).join(DESCRIPTOR_FILE)
  }

  /// Write `descriptor` into the registry, replacing any previous one.
  pub fn publish(&self, descriptor: &DependencyDescriptor) -> Result<PathBuf, RegistryError> {
    let dir = self.package_dir(&descriptor.reference);
    let path = dir.join(DESCRIPTOR_FILE);
    let write_err = |message: String| RegistryError::Write {
      path: path.clone(),
      message,
    };

    std::fs::create_dir_all(&dir).map_err(|e| write_err(e.to_string()))?;
    let content = toml::to_string_pretty(descriptor).map_err(|e| write_err(e.to_string()))?;

    let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| write_err(e.to_string()))?;
    file
      .write_all(content.as_bytes())
      .map_err(|e| write_err(e.to_string()))?;
    file.persist(&path).map_err(|e| write_err(e.to_string()))?;

    info!(reference = %descriptor.reference, path = %path.display(), "published package descriptor");
    Ok(path)
  }
}

impl Registry for LocalRegistry {
  fn lookup(&self, reference: &PackageRef) -> Result<Option<DependencyDescriptor>, RegistryError> {
    let path = self.descriptor_path(reference);
    if !path.exists() {
      debug!(reference = %reference, path = %path.display(), "not in local registry");
      return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| RegistryError::Read {
      path: path.clone(),
      source,
    })?;
    let mut descriptor: DependencyDescriptor = toml::from_str(&content).map_err(|e| RegistryError::Parse {
      path: path.clone(),
      message: e.to_string(),
    })?;

    if descriptor.reference != *reference {
      return Err(RegistryError::ReferenceMismatch {
        path,
        expected: reference.clone(),
        found: descriptor.reference,
      });
    }

    if descriptor.package_folder.is_none() {
      let candidate = self.package_dir(reference).join("package");
      if candidate.is_dir() {
        descriptor.package_folder = Some(candidate);
      }
    }

    Ok(Some(descriptor))
  }
}
