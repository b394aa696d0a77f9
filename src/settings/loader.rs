//! Session access to the settings document, components and cache files.
//!
//! The [`SettingsLoader`] is the session-wide owner of the settings document.
//! Its state is loaded at most once unless [`SettingsLoader::reload`] is called;
//! reloading builds the new state completely and then swaps it in, so readers
//! never observe a partially applied change.
//!
//! # Concurrency
//!
//! Several processes may share one base directory. No file locks are taken:
//! every write replaces the whole document atomically, reads are retried while
//! another process replaces it, and probing path saves are re-applied to a
//! freshly reloaded document after a failed attempt.

use super::SettingsStore;
use crate::components::{ComponentCatalog, ComponentDescriptor, ComponentRegistry};
use crate::constants::{
    DEFAULT_EMPTY_CACHE_FILE_CONTENT, HOST_TEMPLATE_FILE_CONFIG_BASE_NAME,
    MAX_PROBING_PATH_SAVE_ATTEMPTS, MAX_SETTINGS_LOAD_ATTEMPTS, SETTINGS_READ_BACKOFF_MS,
    SETTINGS_SAVE_BACKOFF_MS, TEMPLATE_CACHE_FILE_BASE_NAME,
};
use crate::core::EngineError;
use crate::environment::EngineEnvironment;
use crate::generator::Generator;
use crate::install_unit::InstallUnitDescriptor;
use crate::mount::{
    EntryKind, MountEntry, MountGuard, MountPoint, MountPointFactory, MountPointInfo,
    MountPointManager, MountResolver,
};
use crate::paths::Paths;
use crate::template::{Template, TemplateInfo};
use crate::utils::exponential_backoff_with_delay;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

struct LoadedState {
    store: SettingsStore,
    registry: Arc<ComponentRegistry>,
}

/// Loads, mutates and persists the settings of one engine session.
pub struct SettingsLoader {
    environment: Arc<EngineEnvironment>,
    catalog: ComponentCatalog,
    mount_manager: Arc<MountPointManager>,
    state: RwLock<Option<Arc<LoadedState>>>,
    mutation: Mutex<()>,
}

impl SettingsLoader {
    pub fn new(environment: Arc<EngineEnvironment>, catalog: ComponentCatalog) -> Self {
        let mount_manager = MountPointManager::new(Arc::clone(&environment));
        Self {
            environment,
            catalog,
            mount_manager,
            state: RwLock::new(None),
            mutation: Mutex::new(()),
        }
    }

    pub fn environment(&self) -> &Arc<EngineEnvironment> {
        &self.environment
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn mount_manager(&self) -> &Arc<MountPointManager> {
        &self.mount_manager
    }

    fn paths(&self) -> &Paths {
        self.environment.paths()
    }

    /// Loads the settings document if it has not been loaded yet.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SettingsReadFailed`] when every read attempt failed
    /// - [`EngineError::SettingsParseError`] when the document is not valid
    pub fn ensure_loaded(&self) -> Result<()> {
        self.state().map(|_| ())
    }

    fn state(&self) -> Result<Arc<LoadedState>> {
        if let Some(state) = self.state.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(state));
        }

        let loaded = Arc::new(self.load_state()?);
        let mut slot = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished loading first
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }

    /// Discards the in-memory state and loads the document again.
    pub fn reload(&self) -> Result<()> {
        let loaded = Arc::new(self.load_state()?);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded);
        Ok(())
    }

    fn load_state(&self) -> Result<LoadedState> {
        let path = self.paths().settings_file();
        let content = self.read_settings_document()?;

        let mut store: SettingsStore = serde_json::from_str(&content).map_err(|e| {
            EngineError::SettingsParseError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        if store.probing_paths.is_empty() {
            store.probing_paths.insert(self.paths().content_dir().display().to_string());
        }

        let registry = Arc::new(ComponentRegistry::from_descriptors(&self.catalog, &store.components));
        debug!(
            "Loaded settings: {} mount points, {} components",
            store.mount_points.len(),
            store.components.len()
        );
        Ok(LoadedState {
            store,
            registry,
        })
    }

    fn read_settings_document(&self) -> Result<String> {
        let fs = self.environment.fs();
        let path = self.paths().settings_file();
        let mut attempt = 0;

        while attempt < MAX_SETTINGS_LOAD_ATTEMPTS {
            if !fs.file_exists(&path) {
                // First run
                return Ok(DEFAULT_EMPTY_CACHE_FILE_CONTENT.to_string());
            }

            match fs.read_all_text(&path) {
                Ok(content) => return Ok(content),
                Err(e) => {
                    debug!("Settings read attempt {} failed: {:#}", attempt + 1, e);
                    if attempt + 1 >= MAX_SETTINGS_LOAD_ATTEMPTS {
                        break;
                    }
                    attempt = exponential_backoff_with_delay(SETTINGS_READ_BACKOFF_MS, attempt);
                }
            }
        }

        Err(EngineError::SettingsReadFailed {
            path: path.display().to_string(),
            attempts: MAX_SETTINGS_LOAD_ATTEMPTS,
        }
        .into())
    }

    fn persist(&self, store: &SettingsStore) -> Result<()> {
        let content = serde_json::to_string_pretty(store).context("Failed to serialize settings")?;
        self.environment.fs().write_all_text(&self.paths().settings_file(), &content)
    }

    fn commit(&self, store: SettingsStore, registry: Arc<ComponentRegistry>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(LoadedState {
            store,
            registry,
        }));
    }

    /// Writes the current settings document.
    pub fn save(&self) -> Result<()> {
        let state = self.state()?;
        self.persist(&state.store)
    }

    fn mutate(&self, apply: impl FnOnce(&mut SettingsStore) -> bool) -> Result<bool> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.state()?;
        let mut store = state.store.clone();
        if !apply(&mut store) {
            return Ok(false);
        }

        self.persist(&store)?;
        self.commit(store, Arc::clone(&state.registry));
        Ok(true)
    }

    /// Records `path` as a component probing path.
    ///
    /// A path that is already present is a no-op. A failed save is retried on
    /// a freshly reloaded document.
    ///
    /// # Errors
    ///
    /// [`EngineError::SettingsSaveFailed`] once every attempt has failed.
    pub fn add_probing_path(&self, path: &str) -> Result<()> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let mut attempt = 0;

        loop {
            let state = self.state()?;
            if state.store.probing_paths.contains(path) {
                return Ok(());
            }

            let mut store = state.store.clone();
            store.probing_paths.insert(path.to_string());
            let error = match self.persist(&store) {
                Ok(()) => {
                    self.commit(store, Arc::clone(&state.registry));
                    return Ok(());
                }
                Err(e) => e,
            };

            warn!("Saving probing path '{}' failed (attempt {}): {:#}", path, attempt + 1, error);
            if attempt + 1 >= MAX_PROBING_PATH_SAVE_ATTEMPTS {
                return Err(EngineError::SettingsSaveFailed {
                    attempts: MAX_PROBING_PATH_SAVE_ATTEMPTS,
                    reason: format!("{error:#}"),
                }
                .into());
            }
            attempt = exponential_backoff_with_delay(SETTINGS_SAVE_BACKOFF_MS, attempt);
            self.reload()?;
        }
    }

    pub fn probing_paths(&self) -> Result<Vec<String>> {
        Ok(self.state()?.store.probing_paths.iter().cloned().collect())
    }

    /// Records a mount point. Returns `false` if its place and parent were known.
    pub fn add_mount_point(&self, mount: &dyn MountPoint) -> Result<bool> {
        let info = mount.info().clone();
        self.mutate(|store| store.add_mount_point(info))
    }

    pub fn remove_mount_point(&self, id: Uuid) -> Result<bool> {
        self.mutate(|store| store.remove_mount_point(id))
    }

    /// Records the package a mount point was installed from.
    pub fn set_install_unit_descriptor(&self, descriptor: InstallUnitDescriptor) -> Result<bool> {
        self.mutate(|store| store.set_install_unit_descriptor(descriptor))
    }

    pub fn install_unit_descriptors(&self) -> Result<Vec<InstallUnitDescriptor>> {
        Ok(self.state()?.store.install_unit_descriptors.clone())
    }

    pub fn try_get_install_unit_descriptor(&self, mount_point_id: Uuid) -> Result<Option<InstallUnitDescriptor>> {
        Ok(self.state()?.store.install_unit_descriptor(mount_point_id).cloned())
    }

    pub fn mount_points(&self) -> Result<Vec<MountPointInfo>> {
        Ok(self.state()?.store.mount_points.clone())
    }

    pub fn try_get_mount_point_info(&self, id: Uuid) -> Result<Option<MountPointInfo>> {
        Ok(self.state()?.store.mount_point(id).cloned())
    }

    /// Top-level mount point record at `place`, compared case-insensitively.
    pub fn try_get_mount_point_info_from_place(&self, place: &str) -> Result<Option<MountPointInfo>> {
        Ok(self.state()?.store.mount_point_from_place(place).cloned())
    }

    /// Acquires the top-level mount point at `place`, if one is recorded and reachable.
    pub fn try_get_mount_point_from_place(&self, place: &str) -> Result<Option<MountGuard>> {
        match self.try_get_mount_point_info_from_place(place)? {
            Some(info) => self.try_demand_mount_point(info.mount_point_id),
            None => Ok(None),
        }
    }

    /// Acquires mount point `id`, mounting it if needed.
    pub fn try_demand_mount_point(&self, id: Uuid) -> Result<Option<MountGuard>> {
        self.ensure_loaded()?;
        Ok(self.mount_manager.try_demand(id, self))
    }

    /// Activates a catalog implementation and records it.
    ///
    /// Returns `false` if it was already active.
    pub fn register_component(&self, implementation: &str, source: Option<String>) -> Result<bool> {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.state()?;

        let mut registry = (*state.registry).clone();
        let Some(descriptor) = registry.activate(&self.catalog, implementation, source)? else {
            return Ok(false);
        };

        let mut store = state.store.clone();
        store.add_component(descriptor.clone());
        self.persist(&store)?;
        self.commit(store, Arc::new(registry));
        info!("Registered {} component '{}'", descriptor.kind, implementation);
        Ok(true)
    }

    pub fn is_component_registered(&self, implementation: &str) -> Result<bool> {
        Ok(self.state()?.registry.is_registered(implementation))
    }

    /// Components recorded in the settings document.
    pub fn components(&self) -> Result<Vec<ComponentDescriptor>> {
        Ok(self.state()?.store.components.clone())
    }

    /// Snapshot of the active components.
    pub fn registry(&self) -> Result<Arc<ComponentRegistry>> {
        Ok(Arc::clone(&self.state()?.registry))
    }

    pub fn generators(&self) -> Result<Vec<Arc<dyn Generator>>> {
        Ok(self.state()?.registry.generators())
    }

    pub fn mount_point_factories(&self) -> Result<Vec<Arc<dyn MountPointFactory>>> {
        Ok(self.state()?.registry.mount_point_factories())
    }

    pub fn try_get_generator(&self, id: Uuid) -> Result<Option<Arc<dyn Generator>>> {
        Ok(self.state()?.registry.generator(id))
    }

    /// Contents of the file at `place` in mount point `id`, if both exist.
    pub fn try_get_file_from_id_and_path(&self, id: Uuid, place: &str) -> Result<Option<Vec<u8>>> {
        let Some(mount) = self.try_demand_mount_point(id)? else {
            return Ok(None);
        };
        let file = mount.file_info(place);
        if !file.exists() {
            return Ok(None);
        }
        file.read_to_vec().map(Some)
    }

    /// Reads the cache document for `locale` (`None` for culture neutral).
    ///
    /// Returns `(false, "{}")` when the document does not exist.
    pub fn try_read_template_cache_file(&self, locale: Option<&str>) -> Result<(bool, String)> {
        let fs = self.environment.fs();
        let path = self.paths().template_cache_file(locale);
        if !fs.file_exists(&path) {
            return Ok((false, DEFAULT_EMPTY_CACHE_FILE_CONTENT.to_string()));
        }

        let content = fs
            .read_all_text(&path)
            .with_context(|| format!("Failed to read template cache {}", path.display()))?;
        Ok((true, content))
    }

    /// Replaces the cache document for `locale`.
    pub fn write_template_cache_file(&self, locale: Option<&str>, content: &str) -> Result<()> {
        let path = self.paths().template_cache_file(locale);
        self.environment
            .fs()
            .write_all_text(&path, content)
            .with_context(|| format!("Failed to write template cache {}", path.display()))
    }

    /// Deletes the cache document for `locale` (`None` for culture neutral).
    pub fn delete_template_cache_for_locale(&self, locale: Option<&str>) -> Result<()> {
        self.environment.fs().delete_file(&self.paths().template_cache_file(locale))
    }

    /// Locales that have a cache document, sorted.
    pub fn locales_with_template_cache_files(&self) -> Result<Vec<String>> {
        let pattern = format!("*.{TEMPLATE_CACHE_FILE_BASE_NAME}");
        let files = self.environment.fs().enumerate_files(self.paths().base_dir(), &pattern, false)?;

        Ok(files
            .iter()
            .filter_map(|file| file.file_name())
            .filter_map(|name| Paths::locale_of_cache_file(&name.to_string_lossy()).map(str::to_string))
            .collect())
    }

    /// Loads the full template a cache entry describes.
    ///
    /// Returns `Ok(None)` when the generator or one of the mount points can no
    /// longer be resolved.
    pub fn load_template(&self, info: &TemplateInfo) -> Result<Option<Template>> {
        let Some(generator) = self.try_get_generator(info.generator_id)? else {
            debug!("Generator {} for '{}' is not registered", info.generator_id, info.identity);
            return Ok(None);
        };
        let Some(config_mount) = self.try_demand_mount_point(info.config_mount_point_id)? else {
            return Ok(None);
        };
        let config = config_mount.file_info(&info.config_place);
        if !config.exists() {
            return Ok(None);
        }

        let locale_mount = match info.locale_config_mount_point_id {
            Some(id) => match self.try_demand_mount_point(id)? {
                Some(mount) => Some(mount),
                None => return Ok(None),
            },
            None => None,
        };
        let locale_config = match (&locale_mount, &info.locale_config_place) {
            (Some(mount), Some(place)) => Some(mount.file_info(place)),
            _ => None,
        };

        let host_mount = match info.host_config_mount_point_id {
            Some(id) => self.try_demand_mount_point(id)?,
            None => None,
        };
        let host_config = match (&host_mount, &info.host_config_place) {
            (Some(mount), Some(place)) => Some(mount.file_info(place)).filter(MountEntry::exists),
            _ => self.host_template_config_file(&config),
        };

        generator.try_get_template_from_config(&config, locale_config.as_ref(), host_config.as_ref())
    }

    /// `<host>.host.json` beside `config`, trying fallback host identifiers in order.
    pub fn host_template_config_file<'a>(&self, config: &MountEntry<'a>) -> Option<MountEntry<'a>> {
        let dir = config.parent()?;
        let host = self.environment.host();

        std::iter::once(host.identifier())
            .chain(host.fallback_host_identifiers().iter().map(String::as_str))
            .map(|id| dir.child(&format!("{id}{HOST_TEMPLATE_FILE_CONFIG_BASE_NAME}"), EntryKind::File))
            .find(MountEntry::exists)
    }
}

impl MountResolver for SettingsLoader {
    fn mount_point_info(&self, id: Uuid) -> Option<MountPointInfo> {
        self.state().ok()?.store.mount_point(id).cloned()
    }

    fn factory(&self, factory_id: Uuid) -> Option<Arc<dyn MountPointFactory>> {
        self.state().ok()?.registry.mount_point_factory(factory_id)
    }
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("environment", &self.environment)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::user_friendly_error;
    use crate::environment::Host;
    use crate::mount::{FileSystemMountPointFactory, MountRequest};
    use crate::test_utils::{FlakyFileSystem, TemplateFixture, TestEnvironment};

    fn mount_templates(loader: &SettingsLoader, env: &TestEnvironment) -> Box<dyn MountPoint> {
        FileSystemMountPointFactory
            .try_mount(
                loader.environment(),
                &MountRequest {
                    id: Uuid::new_v4(),
                    parent: None,
                    place: &env.templates_dir().to_string_lossy(),
                },
            )
            .unwrap()
    }

    #[test]
    fn test_missing_settings_seed_content_probing_path() {
        let env = TestEnvironment::new().unwrap();
        let loader = env.loader();

        let probing = loader.probing_paths().unwrap();
        assert_eq!(probing, vec![env.base_dir.join("content").display().to_string()]);
        assert!(loader.mount_points().unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_settings_are_fatal() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(env.base_dir.join("settings.json"), "{ not json").unwrap();

        let err = env.loader().ensure_loaded().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::SettingsParseError { .. })
        ));
    }

    #[test]
    fn test_read_is_retried() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(env.base_dir.join("settings.json"), "{\"probingPaths\":[\"/x\"]}").unwrap();

        let fs = Arc::new(FlakyFileSystem::new(MAX_SETTINGS_LOAD_ATTEMPTS - 1, 0));
        let loader = SettingsLoader::new(
            env.environment_with(Host::new("scaffold"), fs.clone()),
            ComponentCatalog::with_builtins(),
        );
        assert_eq!(loader.probing_paths().unwrap(), vec!["/x".to_string()]);
        assert_eq!(fs.remaining_read_failures(), 0);
    }

    #[test]
    fn test_read_gives_up_after_max_attempts() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(env.base_dir.join("settings.json"), "{}").unwrap();

        let fs = Arc::new(FlakyFileSystem::new(MAX_SETTINGS_LOAD_ATTEMPTS, 0));
        let loader = SettingsLoader::new(
            env.environment_with(Host::new("scaffold"), fs),
            ComponentCatalog::with_builtins(),
        );
        let err = loader.ensure_loaded().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::SettingsReadFailed {
                attempts: MAX_SETTINGS_LOAD_ATTEMPTS,
                ..
            })
        ));
    }

    #[test]
    fn test_probing_path_save_is_retried() {
        let env = TestEnvironment::new().unwrap();
        let fs = Arc::new(FlakyFileSystem::new(0, 2));
        let loader = SettingsLoader::new(
            env.environment_with(Host::new("scaffold"), fs),
            ComponentCatalog::with_builtins(),
        );

        loader.add_probing_path("/components").unwrap();
        loader.add_probing_path("/components").unwrap();
        assert!(loader.probing_paths().unwrap().contains(&"/components".to_string()));

        let reloaded = env.loader();
        assert!(reloaded.probing_paths().unwrap().contains(&"/components".to_string()));
    }

    #[test]
    fn test_probing_path_save_gives_up() {
        let env = TestEnvironment::new().unwrap();
        let fs = Arc::new(FlakyFileSystem::new(0, MAX_PROBING_PATH_SAVE_ATTEMPTS));
        let loader = SettingsLoader::new(
            env.environment_with(Host::new("scaffold"), fs),
            ComponentCatalog::with_builtins(),
        );

        let err = loader.add_probing_path("/components").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::SettingsSaveFailed {
                attempts: MAX_PROBING_PATH_SAVE_ATTEMPTS,
                ..
            })
        ));

        let rendered = user_friendly_error(err);
        assert!(matches!(rendered.error, EngineError::SettingsSaveFailed { .. }));
        assert!(rendered.suggestion.unwrap().contains("writable"));
    }

    #[test]
    fn test_duplicate_mount_point_is_not_recorded() {
        let env = TestEnvironment::new().unwrap();
        let loader = env.loader();

        let first = mount_templates(&loader, &env);
        let second = mount_templates(&loader, &env);
        assert!(loader.add_mount_point(first.as_ref()).unwrap());
        assert!(!loader.add_mount_point(second.as_ref()).unwrap());
        assert_eq!(loader.mount_points().unwrap().len(), 1);

        let place = env.templates_dir().to_string_lossy().to_uppercase();
        let info = loader.try_get_mount_point_info_from_place(&place).unwrap().unwrap();
        assert_eq!(info.mount_point_id, first.info().mount_point_id);

        assert!(loader.remove_mount_point(info.mount_point_id).unwrap());
        assert!(env.loader().mount_points().unwrap().is_empty());
    }

    #[test]
    fn test_demand_recorded_mount_point() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(env.templates_dir().join("a.txt"), "a").unwrap();
        let loader = env.loader();
        let mount = mount_templates(&loader, &env);
        let id = mount.info().mount_point_id;
        loader.add_mount_point(mount.as_ref()).unwrap();

        let fresh = env.loader();
        let guard = fresh.try_demand_mount_point(id).unwrap().unwrap();
        assert_eq!(guard.info().mount_point_id, id);
        assert_eq!(fresh.try_get_file_from_id_and_path(id, "/a.txt").unwrap(), Some(b"a".to_vec()));
        assert_eq!(fresh.try_get_file_from_id_and_path(id, "/missing").unwrap(), None);
        assert!(fresh.try_demand_mount_point(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_template_cache_files() {
        let env = TestEnvironment::new().unwrap();
        let loader = env.loader();

        assert_eq!(loader.try_read_template_cache_file(None).unwrap(), (false, "{}".to_string()));
        loader.write_template_cache_file(None, "{\"templateInfo\":[]}").unwrap();
        loader.write_template_cache_file(Some("de-DE"), "{}").unwrap();
        loader.write_template_cache_file(Some("fr-FR"), "{}").unwrap();

        let (found, content) = loader.try_read_template_cache_file(None).unwrap();
        assert!(found);
        assert_eq!(content, "{\"templateInfo\":[]}");
        assert_eq!(loader.locales_with_template_cache_files().unwrap(), vec!["de-DE", "fr-FR"]);

        loader.delete_template_cache_for_locale(Some("de-DE")).unwrap();
        assert_eq!(loader.locales_with_template_cache_files().unwrap(), vec!["fr-FR"]);
        assert!(loader.try_read_template_cache_file(None).unwrap().0);
    }

    #[test]
    fn test_load_template_uses_fallback_host_file() {
        let env = TestEnvironment::new().unwrap();
        TemplateFixture::new("Web.App", "Web App")
            .host_file("ide", serde_json::json!({ "icon": "web" }))
            .write(&env.templates_dir().join("web"))
            .unwrap();

        let host = Host::new("scaffold").with_fallback_host_identifiers(vec!["ide".to_string()]);
        let loader = SettingsLoader::new(
            env.environment_with(host, Arc::new(crate::filesystem::PhysicalFileSystem)),
            ComponentCatalog::with_builtins(),
        );
        let mount = mount_templates(&loader, &env);
        loader.add_mount_point(mount.as_ref()).unwrap();

        let generator = loader.try_get_generator(crate::generator::JSON_TEMPLATE_GENERATOR_ID).unwrap().unwrap();
        let (templates, _) = generator.get_templates_and_langpacks(mount.as_ref()).unwrap();
        let template = loader.load_template(&templates[0]).unwrap().unwrap();

        assert_eq!(template.host_config.unwrap()["icon"], "web");
        assert_eq!(
            template.info.host_config_place.as_deref(),
            Some("/web/.template.config/ide.host.json")
        );
    }

    #[test]
    fn test_register_component_persists() {
        let env = TestEnvironment::new().unwrap();
        let mut catalog = ComponentCatalog::with_builtins();
        catalog.register_generator("custom", || Arc::new(crate::generator::JsonTemplateGenerator));
        let loader = SettingsLoader::new(env.environment(), catalog);

        assert!(loader.register_component("custom", Some("/content/lib".to_string())).unwrap());
        assert!(!loader.register_component("custom", None).unwrap());
        assert!(loader.is_component_registered("custom").unwrap());
        assert_eq!(loader.components().unwrap().len(), 1);
        assert!(loader.register_component("unknown", None).is_err());
    }
}
