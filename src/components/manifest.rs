//! `*.component.json` manifests declared by content roots.

use super::{ComponentCatalog, ComponentKind, ComponentRegistry};
use crate::core::EngineError;
use serde::Deserialize;

/// One implementation declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub kind: ComponentKind,
    pub implementation: String,
}

/// A loadable component unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentManifest {
    #[serde(default)]
    pub components: Vec<ManifestEntry>,
    /// Implementation keys that must be registered before this unit loads.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl ComponentManifest {
    /// Parses a manifest document.
    pub fn parse(path: &str, content: &[u8]) -> Result<Self, EngineError> {
        let manifest: Self = serde_json::from_slice(content).map_err(|e| {
            EngineError::InvalidComponentManifest {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;

        if manifest.components.is_empty() {
            return Err(EngineError::InvalidComponentManifest {
                path: path.to_string(),
                reason: "no components declared".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Rejects entries whose declared kind disagrees with the catalog.
    pub fn check_kinds(&self, path: &str, catalog: &ComponentCatalog) -> Result<(), EngineError> {
        for entry in &self.components {
            if let Some(kind) = catalog.kind_of(&entry.implementation)
                && kind != entry.kind
            {
                return Err(EngineError::InvalidComponentManifest {
                    path: path.to_string(),
                    reason: format!(
                        "'{}' is a {} implementation, not a {}",
                        entry.implementation, kind, entry.kind
                    ),
                });
            }
        }
        Ok(())
    }

    /// `true` once every requirement is registered and every implementation is known.
    pub fn is_resolvable(&self, catalog: &ComponentCatalog, registry: &ComponentRegistry) -> bool {
        self.requires.iter().all(|key| registry.is_registered(key))
            && self.components.iter().all(|entry| catalog.contains(&entry.implementation))
    }

    /// First implementation key the catalog does not know.
    pub fn unknown_implementation(&self, catalog: &ComponentCatalog) -> Option<&str> {
        self.components
            .iter()
            .map(|entry| entry.implementation.as_str())
            .find(|key| !catalog.contains(key))
    }
}
