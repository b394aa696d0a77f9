//! Install units: the package a top-level archive mount point was installed from.
//!
//! A package archive carries a `*.nuspec` manifest at its root:
//!
//! ```xml
//! <package>
//!   <metadata>
//!     <id>Contoso.Templates</id>
//!     <version>1.2.0</version>
//!   </metadata>
//! </package>
//! ```
//!
//! When exactly one such manifest names both an id and a version, the mount
//! point gets an [`InstallUnitDescriptor`] recorded next to it in the settings
//! document. Directory mounts never have one.

use crate::constants::NUSPEC_FILE_PATTERN;
use crate::filesystem::FileSystem;
use crate::mount::MountPoint;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Package identity of one archive mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallUnitDescriptor {
    pub mount_point_id: Uuid,
    pub package_name: String,
    pub version: String,
}

impl InstallUnitDescriptor {
    /// Reads the descriptor of `mount`, if its place is a package file.
    pub fn from_mount_point(mount: &dyn MountPoint, fs: &dyn FileSystem) -> Option<Self> {
        let info = mount.info();
        if !fs.file_exists(Path::new(&info.place)) {
            return None;
        }

        let manifests = match mount.root().enumerate_files(NUSPEC_FILE_PATTERN, false) {
            Ok(manifests) => manifests,
            Err(e) => {
                debug!("Unable to list package manifests in {}: {:#}", info.place, e);
                return None;
            }
        };
        let [manifest] = manifests.as_slice() else {
            debug!("{} has {} package manifests, expected one", info.place, manifests.len());
            return None;
        };

        let content = manifest.read_to_string().ok()?;
        let (package_name, version) = parse_nuspec(&content)?;
        Some(Self {
            mount_point_id: info.mount_point_id,
            package_name,
            version,
        })
    }
}

impl fmt::Display for InstallUnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.package_name, self.version)
    }
}

/// Extracts `metadata/id` and `metadata/version` below the document element.
///
/// Namespaces are ignored. Returns `None` for malformed documents and when
/// either value is missing or blank.
pub fn parse_nuspec(content: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut id = None;
    let mut version = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => path.push(element.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(text)) if path.len() == 3 && path[1] == b"metadata" => {
                let value = text.unescape().ok()?.trim().to_string();
                match path[2].as_slice() {
                    b"id" => id = Some(value),
                    b"version" => version = Some(value),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Malformed package manifest: {}", e);
                return None;
            }
            Ok(_) => {}
        }
    }

    match (id, version) {
        (Some(id), Some(version)) if !id.is_empty() && !version.is_empty() => Some((id, version)),
        _ => None,
    }
}
