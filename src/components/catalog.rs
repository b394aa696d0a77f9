//! Host-provided implementation constructors.

use super::{Component, ComponentKind};
use crate::generator::{Generator, JsonTemplateGenerator};
use crate::mount::{FileSystemMountPointFactory, MountPointFactory, ZipMountPointFactory};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Catalog key of the directory mount point factory.
pub const BUILTIN_FILE_SYSTEM: &str = "filesystem";
/// Catalog key of the zip archive mount point factory.
pub const BUILTIN_ZIP: &str = "zip";
/// Catalog key of the JSON template generator.
pub const BUILTIN_JSON_TEMPLATE: &str = "json-template";

type Constructor = Arc<dyn Fn() -> Component + Send + Sync>;

struct CatalogEntry {
    kind: ComponentKind,
    builtin: bool,
    construct: Constructor,
}

/// Implementation constructors keyed by implementation name.
///
/// Built-in entries are always active. Other entries become active only when a
/// scanned component manifest declares them.
#[derive(Default)]
pub struct ComponentCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ComponentCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with the built-in factories and generator.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.insert(BUILTIN_FILE_SYSTEM, ComponentKind::MountPointFactory, true, || {
            Component::MountPointFactory(Arc::new(FileSystemMountPointFactory))
        });
        catalog.insert(BUILTIN_ZIP, ComponentKind::MountPointFactory, true, || {
            Component::MountPointFactory(Arc::new(ZipMountPointFactory))
        });
        catalog.insert(BUILTIN_JSON_TEMPLATE, ComponentKind::Generator, true, || {
            Component::Generator(Arc::new(JsonTemplateGenerator))
        });
        catalog
    }

    fn insert(
        &mut self,
        key: &str,
        kind: ComponentKind,
        builtin: bool,
        construct: impl Fn() -> Component + Send + Sync + 'static,
    ) {
        self.entries.insert(
            key.to_string(),
            CatalogEntry {
                kind,
                builtin,
                construct: Arc::new(construct),
            },
        );
    }

    /// Registers a generator implementation activated by manifests.
    pub fn register_generator<F>(&mut self, key: &str, construct: F)
    where
        F: Fn() -> Arc<dyn Generator> + Send + Sync + 'static,
    {
        self.insert(key, ComponentKind::Generator, false, move || Component::Generator(construct()));
    }

    /// Registers a mount point factory implementation activated by manifests.
    pub fn register_mount_point_factory<F>(&mut self, key: &str, construct: F)
    where
        F: Fn() -> Arc<dyn MountPointFactory> + Send + Sync + 'static,
    {
        self.insert(key, ComponentKind::MountPointFactory, false, move || {
            Component::MountPointFactory(construct())
        });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Kind of the implementation registered under `key`.
    pub fn kind_of(&self, key: &str) -> Option<ComponentKind> {
        self.entries.get(key).map(|entry| entry.kind)
    }

    /// Constructs the implementation registered under `key`.
    pub fn construct(&self, key: &str) -> Option<Component> {
        self.entries.get(key).map(|entry| (entry.construct)())
    }

    /// Keys of the built-in implementations, sorted.
    pub fn builtin_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, entry)| entry.builtin).map(|(key, _)| key.as_str())
    }
}

impl std::fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
