//! The persisted settings document.

use crate::components::ComponentDescriptor;
use crate::install_unit::InstallUnitDescriptor;
use crate::mount::MountPointInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Known mount points, probing paths and activated components.
///
/// Serialized as `settings.json` in the engine base directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsStore {
    pub mount_points: Vec<MountPointInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub install_unit_descriptors: Vec<InstallUnitDescriptor>,
    pub probing_paths: BTreeSet<String>,
    pub components: Vec<ComponentDescriptor>,
}

impl SettingsStore {
    /// Adds a mount point unless one with the same place and parent exists.
    ///
    /// Returns `true` if the store changed.
    pub fn add_mount_point(&mut self, info: MountPointInfo) -> bool {
        if self.mount_points.iter().any(|existing| existing.same_location(&info)) {
            return false;
        }
        self.mount_points.push(info);
        true
    }

    /// Removes the mount point `id` and its install unit. Returns `true` if it was present.
    pub fn remove_mount_point(&mut self, id: Uuid) -> bool {
        let before = self.mount_points.len();
        self.mount_points.retain(|info| info.mount_point_id != id);
        self.install_unit_descriptors.retain(|d| d.mount_point_id != id);
        self.mount_points.len() != before
    }

    /// Records `descriptor`, replacing the one of the same mount point.
    ///
    /// Returns `true` if the store changed.
    pub fn set_install_unit_descriptor(&mut self, descriptor: InstallUnitDescriptor) -> bool {
        if self.install_unit_descriptors.contains(&descriptor) {
            return false;
        }
        self.install_unit_descriptors.retain(|d| d.mount_point_id != descriptor.mount_point_id);
        self.install_unit_descriptors.push(descriptor);
        true
    }

    pub fn install_unit_descriptor(&self, mount_point_id: Uuid) -> Option<&InstallUnitDescriptor> {
        self.install_unit_descriptors.iter().find(|d| d.mount_point_id == mount_point_id)
    }

    pub fn mount_point(&self, id: Uuid) -> Option<&MountPointInfo> {
        self.mount_points.iter().find(|info| info.mount_point_id == id)
    }

    /// Top-level mount point at `place`, compared case-insensitively.
    pub fn mount_point_from_place(&self, place: &str) -> Option<&MountPointInfo> {
        self.mount_points
            .iter()
            .find(|info| info.parent_mount_point_id.is_none() && info.place.eq_ignore_ascii_case(place))
    }

    /// Adds a component unless its implementation is already recorded.
    pub fn add_component(&mut self, descriptor: ComponentDescriptor) -> bool {
        if self.components.iter().any(|c| c.implementation == descriptor.implementation) {
            return false;
        }
        self.components.push(descriptor);
        true
    }
}
