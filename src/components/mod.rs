//! Component registration.
//!
//! Components are the pluggable capabilities of the engine: generators and
//! mount point factories. The host registers the implementations it ships in
//! a [`ComponentCatalog`] under string keys. Content roots can declare the
//! implementations they rely on in `*.component.json` manifests; the scanner
//! activates them in the [`ComponentRegistry`] and records them in the
//! settings document.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "components": [
//!     { "kind": "generator", "implementation": "json-template" }
//!   ],
//!   "requires": ["zip"]
//! }
//! ```
//!
//! A unit is resolvable once every key in `requires` is registered and every
//! declared implementation is known to the catalog.

mod catalog;
mod manifest;
mod registry;

pub use catalog::{
    BUILTIN_FILE_SYSTEM, BUILTIN_JSON_TEMPLATE, BUILTIN_ZIP, ComponentCatalog,
};
pub use manifest::{ComponentManifest, ManifestEntry};
pub use registry::ComponentRegistry;

use crate::generator::Generator;
use crate::mount::MountPointFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Capability a component provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Generator,
    MountPointFactory,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generator => write!(f, "generator"),
            Self::MountPointFactory => write!(f, "mount-point-factory"),
        }
    }
}

/// A constructed component.
#[derive(Clone)]
pub enum Component {
    Generator(Arc<dyn Generator>),
    MountPointFactory(Arc<dyn MountPointFactory>),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Generator(_) => ComponentKind::Generator,
            Self::MountPointFactory(_) => ComponentKind::MountPointFactory,
        }
    }

    /// Id the component reports for itself.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Generator(generator) => generator.id(),
            Self::MountPointFactory(factory) => factory.id(),
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component").field("kind", &self.kind()).field("id", &self.id()).finish()
    }
}

/// Persisted record of an activated component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub id: Uuid,
    pub kind: ComponentKind,
    /// Catalog key of the implementation.
    pub implementation: String,
    /// Directory the declaring manifest was loaded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
