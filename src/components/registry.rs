//! Active components of one session.

use super::{Component, ComponentCatalog, ComponentDescriptor, ComponentKind};
use crate::core::EngineError;
use crate::generator::Generator;
use crate::mount::MountPointFactory;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Ordered set of active components, one per implementation key.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: Vec<(ComponentDescriptor, Component)>,
}

impl ComponentRegistry {
    /// A registry with every built-in implementation of `catalog` active.
    pub fn with_builtins(catalog: &ComponentCatalog) -> Self {
        let mut registry = Self::default();
        let keys: Vec<String> = catalog.builtin_keys().map(str::to_string).collect();
        for key in keys {
            // Built-in keys always construct
            let _ = registry.activate(catalog, &key, None);
        }
        registry
    }

    /// Built-ins plus every persisted descriptor the catalog can construct.
    ///
    /// Descriptors naming unknown implementations are skipped with a warning;
    /// they come from content installed for a different host.
    pub fn from_descriptors(catalog: &ComponentCatalog, descriptors: &[ComponentDescriptor]) -> Self {
        let mut registry = Self::with_builtins(catalog);
        for descriptor in descriptors {
            if let Err(e) = registry.activate(catalog, &descriptor.implementation, descriptor.source.clone()) {
                warn!("Skipping registered component {}: {}", descriptor.id, e);
            }
        }
        registry
    }

    /// Constructs and activates `implementation`.
    ///
    /// Returns the new descriptor, or `None` if it was already active.
    pub fn activate(
        &mut self,
        catalog: &ComponentCatalog,
        implementation: &str,
        source: Option<String>,
    ) -> Result<Option<ComponentDescriptor>, EngineError> {
        if self.is_registered(implementation) {
            return Ok(None);
        }

        let component = catalog.construct(implementation).ok_or_else(|| {
            EngineError::UnknownImplementation {
                key: implementation.to_string(),
            }
        })?;
        let descriptor = ComponentDescriptor {
            id: component.id(),
            kind: component.kind(),
            implementation: implementation.to_string(),
            source,
        };
        self.entries.push((descriptor.clone(), component));
        Ok(Some(descriptor))
    }

    pub fn is_registered(&self, implementation: &str) -> bool {
        self.entries.iter().any(|(descriptor, _)| descriptor.implementation == implementation)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.entries.iter().map(|(descriptor, _)| descriptor)
    }

    /// Active generators in activation order.
    pub fn generators(&self) -> Vec<Arc<dyn Generator>> {
        self.entries
            .iter()
            .filter_map(|(_, component)| match component {
                Component::Generator(generator) => Some(Arc::clone(generator)),
                Component::MountPointFactory(_) => None,
            })
            .collect()
    }

    /// Active mount point factories in activation order.
    pub fn mount_point_factories(&self) -> Vec<Arc<dyn MountPointFactory>> {
        self.entries
            .iter()
            .filter_map(|(_, component)| match component {
                Component::MountPointFactory(factory) => Some(Arc::clone(factory)),
                Component::Generator(_) => None,
            })
            .collect()
    }

    pub fn generator(&self, id: Uuid) -> Option<Arc<dyn Generator>> {
        self.generators().into_iter().find(|g| g.id() == id)
    }

    pub fn mount_point_factory(&self, id: Uuid) -> Option<Arc<dyn MountPointFactory>> {
        self.mount_point_factories().into_iter().find(|f| f.id() == id)
    }

    /// Number of active components of `kind`.
    pub fn count(&self, kind: ComponentKind) -> usize {
        self.entries.iter().filter(|(d, _)| d.kind == kind).count()
    }
}
