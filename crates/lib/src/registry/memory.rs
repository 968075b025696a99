use std::collections::BTreeMap;

use super::{DependencyDescriptor, PackageRef, Registry, RegistryError};

/// A registry held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
  packages: BTreeMap<PackageRef, DependencyDescriptor>,
}

impl MemoryRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, descriptor: DependencyDescriptor) {
    self.packages.insert(descriptor.reference.clone(), descriptor);
  }

  pub fn with(mut self, descriptor: DependencyDescriptor) -> Self {
    self.insert(descriptor);
    self
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }
}

impl Registry for MemoryRegistry {
  fn lookup(&self, reference: &PackageRef) -> Result<Option<DependencyDescriptor>, RegistryError> {
    Ok(self.packages.get(reference).cloned())
  }
}
