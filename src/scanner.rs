//! Content root discovery.
//!
//! The [`Scanner`] turns a base location into mounted content roots, activates
//! the components those roots declare and collects the templates and
//! localization locators every active generator finds in them.
//!
//! # Base Locations
//!
//! A base location is a path relative to the working directory. Its last
//! segment may contain glob wildcards (`root/pkg-*`); every matching entry is
//! scanned as an independent root. A location matching nothing yields nothing.
//!
//! # Component Units
//!
//! Each `*.component.json` file found inside a root is one unit. The units of
//! every root in one scan form a single worklist, so a unit may require a
//! component provided by a root scanned after it. Every round activates the
//! units whose requirements are registered, and activation stops once a round
//! activates nothing. Units left over are reported and dropped. Templates are
//! collected only after the worklist settled, from every mounted root.

use crate::components::ComponentManifest;
use crate::constants::COMPONENT_MANIFEST_PATTERN;
use crate::core::EngineError;
use crate::install_unit::InstallUnitDescriptor;
use crate::mount::{MountEntry, MountGuard, MountRequest};
use crate::settings::SettingsLoader;
use crate::template::ScannedTemplateInfo;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const WILDCARD_CHARACTERS: [char; 3] = ['*', '?', '['];

struct PendingUnit {
    root: usize,
    path: String,
    manifest: ComponentManifest,
    load_dir: PathBuf,
}

struct MountedRoot {
    index: usize,
    guard: MountGuard,
    fresh: bool,
}

/// What one root contributed to a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootScanSummary {
    pub components: usize,
    pub templates: usize,
    pub localizations: usize,
}

impl RootScanSummary {
    /// `true` if the root produced neither components nor templates nor localizations.
    pub fn is_empty(&self) -> bool {
        self.components == 0 && self.templates == 0 && self.localizations == 0
    }
}

/// Error for a root no mount point factory accepted.
pub fn unmountable(root: &Path) -> EngineError {
    EngineError::MountFailed {
        place: root.display().to_string(),
        reason: "no mount point factory accepts it".to_string(),
    }
}

/// Scans content roots on behalf of one settings session.
pub struct Scanner<'a> {
    loader: &'a SettingsLoader,
}

impl<'a> Scanner<'a> {
    pub fn new(loader: &'a SettingsLoader) -> Self {
        Self {
            loader,
        }
    }

    /// Scans `base` and returns everything discovered.
    pub fn scan(&self, base: &str) -> Result<ScannedTemplateInfo> {
        let mut scanned = ScannedTemplateInfo::new();
        self.scan_into(base, &mut scanned)?;
        Ok(scanned)
    }

    /// Scans `base`, accumulating the discoveries into `scanned`.
    ///
    /// # Errors
    ///
    /// [`EngineError::MountFailed`] if `base` names entries but none of them
    /// can be mounted.
    pub fn scan_into(&self, base: &str, scanned: &mut ScannedTemplateInfo) -> Result<()> {
        self.loader.ensure_loaded()?;

        let roots = self.resolve_roots(base)?;
        if roots.is_empty() {
            debug!("'{}' matched no content roots", base);
            return Ok(());
        }

        let summaries = self.scan_roots(&roots, scanned)?;
        if summaries.iter().all(Option::is_none) {
            return Err(unmountable(&roots[0]).into());
        }
        Ok(())
    }

    /// Expands `base` into the existing entries it names.
    pub fn resolve_roots(&self, base: &str) -> Result<Vec<PathBuf>> {
        let fs = self.loader.environment().fs();
        let trimmed = base.trim().trim_end_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let target = fs.current_directory()?.join(trimmed);
        let leaf = target.file_name().map(|name| name.to_string_lossy().into_owned());
        let parent = target.parent();

        match (parent, leaf) {
            (Some(parent), Some(leaf)) if leaf.contains(WILDCARD_CHARACTERS) => {
                fs.enumerate_file_system_entries(parent, &leaf, false)
            }
            _ if fs.directory_exists(&target) || fs.file_exists(&target) => Ok(vec![target]),
            _ => Ok(Vec::new()),
        }
    }

    /// Scans one resolved root.
    pub fn scan_root(&self, root: &Path, scanned: &mut ScannedTemplateInfo) -> Result<RootScanSummary> {
        let summaries = self.scan_roots(&[root.to_path_buf()], scanned)?;
        Ok(summaries.into_iter().flatten().next().unwrap_or_default())
    }

    /// Scans resolved roots together.
    ///
    /// The result is aligned with `roots`; `None` marks a root that no mount
    /// point factory accepted.
    pub fn scan_roots(
        &self,
        roots: &[PathBuf],
        scanned: &mut ScannedTemplateInfo,
    ) -> Result<Vec<Option<RootScanSummary>>> {
        let mut mounted = Vec::new();
        for (index, root) in roots.iter().enumerate() {
            match self.mount_root(root)? {
                Some((guard, fresh)) => {
                    self.record_install_unit(&guard)?;
                    mounted.push(MountedRoot {
                        index,
                        guard,
                        fresh,
                    });
                }
                None => debug!("{}", unmountable(root)),
            }
        }

        let mut pending = Vec::new();
        for root in &mounted {
            pending.extend(self.collect_units(root)?);
        }
        let activated = self.activate_units(pending, roots.len())?;

        let mut summaries = vec![None; roots.len()];
        for root in &mounted {
            let (templates, localizations) = self.scan_for_templates(&root.guard, scanned)?;
            let summary = RootScanSummary {
                components: activated[root.index],
                templates,
                localizations,
            };
            let info = root.guard.info();

            if root.fresh && summary.is_empty() {
                debug!("Nothing found in {}, forgetting its mount point", info.place);
                self.loader.remove_mount_point(info.mount_point_id)?;
            } else {
                info!(
                    "Scanned {}: {} templates, {} localizations, {} component units",
                    info.place, summary.templates, summary.localizations, summary.components
                );
            }
            summaries[root.index] = Some(summary);
        }
        Ok(summaries)
    }

    fn record_install_unit(&self, guard: &MountGuard) -> Result<()> {
        if guard.is_disk_backed() {
            return Ok(());
        }
        let fs = self.loader.environment().fs();
        if let Some(descriptor) = InstallUnitDescriptor::from_mount_point(&**guard, fs)
            && self.loader.set_install_unit_descriptor(descriptor.clone())?
        {
            debug!("{} is install unit {}", guard.info().place, descriptor);
        }
        Ok(())
    }

    /// Mounts `root`, reusing a recorded mount point at the same place.
    ///
    /// Returns the guard and whether the mount point was newly recorded.
    fn mount_root(&self, root: &Path) -> Result<Option<(MountGuard, bool)>> {
        let place = root.display().to_string();
        if let Some(existing) = self.reuse_mount(&place)? {
            return Ok(Some((existing, false)));
        }

        let environment = self.loader.environment();
        let fs = environment.fs();

        for factory in self.loader.mount_point_factories()? {
            let request = MountRequest {
                id: Uuid::new_v4(),
                parent: None,
                place: &place,
            };
            let Some(mut mount) = factory.try_mount(environment, &request) else {
                continue;
            };

            // Archives outside the packages directory are copied into it
            if !mount.is_disk_backed()
                && let Some(name) = root.file_name()
            {
                let packages_dir = environment.paths().packages_dir();
                let target = packages_dir.join(name);
                if target != root {
                    fs.create_directory(&packages_dir)?;
                    fs.copy(root, &target)?;
                    let target_place = target.display().to_string();
                    if let Some(existing) = self.reuse_mount(&target_place)? {
                        return Ok(Some((existing, false)));
                    }

                    let request = MountRequest {
                        id: Uuid::new_v4(),
                        parent: None,
                        place: &target_place,
                    };
                    if let Some(copied) = factory.try_mount(environment, &request) {
                        mount = copied;
                    }
                }
            }

            let guard = self.loader.mount_manager().register(mount, None);
            self.loader.add_mount_point(&*guard)?;
            return Ok(Some((guard, true)));
        }

        Ok(None)
    }

    fn reuse_mount(&self, place: &str) -> Result<Option<MountGuard>> {
        let Some(info) = self.loader.try_get_mount_point_info_from_place(place)? else {
            return Ok(None);
        };
        match self.loader.try_demand_mount_point(info.mount_point_id)? {
            Some(guard) => Ok(Some(guard)),
            None => {
                warn!("Recorded mount point at '{}' can no longer be mounted, replacing it", place);
                self.loader.remove_mount_point(info.mount_point_id)?;
                Ok(None)
            }
        }
    }

    /// Reads the component units inside one mounted root.
    fn collect_units(&self, root: &MountedRoot) -> Result<Vec<PendingUnit>> {
        let manifests = root.guard.root().enumerate_files(COMPONENT_MANIFEST_PATTERN, true)?;

        let catalog = self.loader.catalog();
        let mut units = Vec::new();
        for entry in &manifests {
            let Some(unit) = self.load_unit(root, entry) else {
                continue;
            };
            match unit.manifest.check_kinds(&unit.path, catalog) {
                Ok(()) => units.push(unit),
                Err(e) => warn!("Skipping component unit: {}", e),
            }
        }
        Ok(units)
    }

    /// Activates `pending` to a fixed point. Returns the units activated per root.
    fn activate_units(&self, mut pending: Vec<PendingUnit>, roots: usize) -> Result<Vec<usize>> {
        let catalog = self.loader.catalog();
        let mut activated = vec![0; roots];

        while !pending.is_empty() {
            let registry = self.loader.registry()?;
            let (ready, waiting): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|unit| unit.manifest.is_resolvable(catalog, &registry));
            pending = waiting;
            if ready.is_empty() {
                break;
            }

            for unit in ready {
                let source = unit.load_dir.display().to_string();
                for entry in &unit.manifest.components {
                    self.loader.register_component(&entry.implementation, Some(source.clone()))?;
                }
                self.loader.add_probing_path(&source)?;
                debug!("Activated component unit {}", unit.path);
                activated[unit.root] += 1;
            }
        }

        for unit in pending {
            match unit.manifest.unknown_implementation(catalog) {
                Some(key) => warn!(
                    "Skipping component unit {}: {}",
                    unit.path,
                    EngineError::UnknownImplementation {
                        key: key.to_string(),
                    }
                ),
                None => warn!(
                    "Skipping component unit {}: requirements {:?} were never registered",
                    unit.path, unit.manifest.requires
                ),
            }
        }

        Ok(activated)
    }

    /// Reads one manifest and locates the directory its unit is loaded from.
    fn load_unit(&self, root: &MountedRoot, entry: &MountEntry<'_>) -> Option<PendingUnit> {
        let mount = &root.guard;
        let path = format!("{}{}", mount.info().place, entry.full_path());
        let content = match entry.read_to_vec() {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping component unit {}: {:#}", path, e);
                return None;
            }
        };
        let manifest = match ComponentManifest::parse(&path, &content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Skipping component unit: {}", e);
                return None;
            }
        };

        let dir = entry.parent()?;
        let load_dir = match dir.disk_path() {
            Some(disk_path) => disk_path,
            None => {
                // Units inside archives are loaded from a copy in the content directory
                let relative = dir.full_path().trim_start_matches('/');
                let target = self
                    .loader
                    .environment()
                    .paths()
                    .content_dir()
                    .join(mount.info().mount_point_id.to_string())
                    .join(relative);
                if let Err(e) = dir.copy_to(self.loader.environment().fs(), &target) {
                    warn!("Failed to copy component unit {} to {}: {:#}", path, target.display(), e);
                    return None;
                }
                target
            }
        };

        Some(PendingUnit {
            root: root.index,
            path,
            manifest,
            load_dir,
        })
    }

    /// Asks every active generator for the templates and locators in `mount`.
    fn scan_for_templates(
        &self,
        mount: &MountGuard,
        scanned: &mut ScannedTemplateInfo,
    ) -> Result<(usize, usize)> {
        let mut templates = 0;
        let mut localizations = 0;

        for generator in self.loader.generators()? {
            match generator.get_templates_and_langpacks(&**mount) {
                Ok((found, locators)) => {
                    templates += found.len();
                    localizations += locators.len();
                    for template in found {
                        scanned.add_template(template);
                    }
                    for locator in locators {
                        scanned.add_localization_locator(locator);
                    }
                }
                Err(e) => {
                    warn!("Generator {} failed on {}: {:#}", generator.id(), mount.info().place, e);
                }
            }
        }

        Ok((templates, localizations))
    }
}
