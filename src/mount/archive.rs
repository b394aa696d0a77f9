//! Mount points over zip archives, including archives nested in another mount.

use super::{
    EntryKind, MountPoint, MountPointFactory, MountPointInfo, MountRequest, normalize_path,
    parent_path,
};
use crate::environment::EngineEnvironment;
use crate::filesystem::ReadSeek;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;
use zip::ZipArchive;

/// Factory id of [`ZipMountPointFactory`].
pub const ZIP_MOUNT_POINT_FACTORY_ID: Uuid =
    Uuid::from_u128(0x94E92610_CF4C_4F6D_AEB6_9E276FDD0322);

/// Accepts places that open as zip archives.
///
/// Without a parent the place is a file on the local disk. With a parent the
/// place is a file inside the parent mount point, read fully into memory.
#[derive(Debug, Default)]
pub struct ZipMountPointFactory;

impl MountPointFactory for ZipMountPointFactory {
    fn id(&self) -> Uuid {
        ZIP_MOUNT_POINT_FACTORY_ID
    }

    fn try_mount(
        &self,
        environment: &Arc<EngineEnvironment>,
        request: &MountRequest<'_>,
    ) -> Option<Box<dyn MountPoint>> {
        let (reader, last_modified): (Box<dyn ReadSeek + Send>, _) = match request.parent {
            Some(parent) => {
                let path = normalize_path(request.place);
                if parent.entry_kind(&path) != Some(EntryKind::File) {
                    return None;
                }
                let bytes = parent.read_file(&path).ok()?;
                (Box::new(Cursor::new(bytes)), parent.info().last_modified)
            }
            None => {
                let fs = environment.fs();
                let path = PathBuf::from(request.place);
                if !fs.file_exists(&path) {
                    return None;
                }
                let reader = fs.open_read(&path).ok()?;
                (reader, fs.last_modified(&path).unwrap_or_else(|_| Utc::now()))
            }
        };

        let archive = match ZipArchive::new(reader) {
            Ok(archive) => archive,
            Err(e) => {
                debug!("'{}' is not a zip archive: {}", request.place, e);
                return None;
            }
        };

        let info = MountPointInfo {
            mount_point_id: request.id,
            mount_point_factory_id: ZIP_MOUNT_POINT_FACTORY_ID,
            parent_mount_point_id: request.parent.map(|p| p.info().mount_point_id),
            place: request.place.to_string(),
            last_modified,
        };
        Some(Box::new(ZipMountPoint::new(info, archive)))
    }
}

struct ZipMountPoint {
    info: MountPointInfo,
    archive: Mutex<ZipArchive<Box<dyn ReadSeek + Send>>>,
    entries: BTreeMap<String, (EntryKind, Option<usize>)>,
}

impl ZipMountPoint {
    fn new(info: MountPointInfo, archive: ZipArchive<Box<dyn ReadSeek + Send>>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("/".to_string(), (EntryKind::Directory, None));

        for index in 0..archive.len() {
            let Some(raw_name) = archive.name_for_index(index) else {
                continue;
            };
            let path = normalize_path(raw_name);
            let mut ancestor = parent_path(&path);
            while let Some(dir) = ancestor {
                entries.entry(dir.to_string()).or_insert((EntryKind::Directory, None));
                ancestor = parent_path(dir);
            }
            if raw_name.ends_with('/') {
                entries.entry(path).or_insert((EntryKind::Directory, None));
            } else {
                entries.insert(path, (EntryKind::File, Some(index)));
            }
        }

        Self {
            info,
            archive: Mutex::new(archive),
            entries,
        }
    }
}

impl MountPoint for ZipMountPoint {
    fn info(&self) -> &MountPointInfo {
        &self.info
    }

    fn is_disk_backed(&self) -> bool {
        false
    }

    fn disk_path(&self) -> Option<&Path> {
        None
    }

    fn entry_kind(&self, path: &str) -> Option<EntryKind> {
        self.entries.get(path).map(|(kind, _)| *kind)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let index = match self.entries.get(path) {
            Some((EntryKind::File, Some(index))) => *index,
            _ => return Err(anyhow!("File not found in archive {}: {}", self.info.place, path)),
        };

        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = archive
            .by_index(index)
            .with_context(|| format!("Failed to open {} in {}", path, self.info.place))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .with_context(|| format!("Failed to read {} in {}", path, self.info.place))?;
        Ok(content)
    }

    fn list_children(&self, path: &str) -> Result<Vec<(String, EntryKind)>> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };

        Ok(self
            .entries
            .range(prefix.clone()..)
            .take_while(|(candidate, _)| candidate.starts_with(&prefix))
            .filter(|(candidate, _)| {
                let rest = &candidate[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .map(|(candidate, (kind, _))| (candidate.clone(), *kind))
            .collect())
    }
}
