//! Mount points over local directories.

use super::{EntryKind, MountPoint, MountPointFactory, MountPointInfo, MountRequest, join_path};
use crate::environment::EngineEnvironment;
use crate::filesystem::FileSystem;
use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Factory id of [`FileSystemMountPointFactory`].
pub const FILE_SYSTEM_MOUNT_POINT_FACTORY_ID: Uuid =
    Uuid::from_u128(0x8C19221B_DEA3_4250_86FE_2D4E189A11D2);

/// Accepts places that are existing directories on the local disk.
#[derive(Debug, Default)]
pub struct FileSystemMountPointFactory;

impl MountPointFactory for FileSystemMountPointFactory {
    fn id(&self) -> Uuid {
        FILE_SYSTEM_MOUNT_POINT_FACTORY_ID
    }

    fn try_mount(
        &self,
        environment: &Arc<EngineEnvironment>,
        request: &MountRequest<'_>,
    ) -> Option<Box<dyn MountPoint>> {
        if request.parent.is_some() {
            return None;
        }

        let fs = environment.fs_arc();
        let root = PathBuf::from(request.place);
        if !fs.directory_exists(&root) {
            return None;
        }

        let last_modified = fs.last_modified(&root).unwrap_or_else(|_| Utc::now());
        Some(Box::new(FileSystemMountPoint {
            info: MountPointInfo {
                mount_point_id: request.id,
                mount_point_factory_id: FILE_SYSTEM_MOUNT_POINT_FACTORY_ID,
                parent_mount_point_id: None,
                place: request.place.to_string(),
                last_modified,
            },
            root,
            fs,
        }))
    }
}

struct FileSystemMountPoint {
    info: MountPointInfo,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileSystemMountPoint {
    fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl MountPoint for FileSystemMountPoint {
    fn info(&self) -> &MountPointInfo {
        &self.info
    }

    fn is_disk_backed(&self) -> bool {
        true
    }

    fn disk_path(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn entry_kind(&self, path: &str) -> Option<EntryKind> {
        let disk = self.resolve(path);
        if self.fs.directory_exists(&disk) {
            Some(EntryKind::Directory)
        } else if self.fs.file_exists(&disk) {
            Some(EntryKind::File)
        } else {
            None
        }
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.read_all_bytes(&self.resolve(path))
    }

    fn list_children(&self, path: &str) -> Result<Vec<(String, EntryKind)>> {
        let dir = self.resolve(path);
        let mut children = Vec::new();
        for entry in self.fs.enumerate_file_system_entries(&dir, "*", false)? {
            let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let kind = if self.fs.directory_exists(&entry) {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            children.push((join_path(path, &name), kind));
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Host;
    use crate::filesystem::PhysicalFileSystem;
    use crate::paths::Paths;
    use tempfile::TempDir;

    fn environment(temp: &TempDir) -> Arc<EngineEnvironment> {
        Arc::new(EngineEnvironment::new(
            Host::new("scaffold"),
            Paths::new(temp.path().join("base")),
            Arc::new(PhysicalFileSystem),
        ))
    }

    fn mount(env: &Arc<EngineEnvironment>, place: &str) -> Option<Box<dyn MountPoint>> {
        FileSystemMountPointFactory.try_mount(
            env,
            &MountRequest {
                id: Uuid::new_v4(),
                parent: None,
                place,
            },
        )
    }

    #[test]
    fn test_rejects_missing_directory_and_files() {
        let temp = TempDir::new().unwrap();
        let env = environment(&temp);
        std::fs::write(temp.path().join("file.zip"), "x").unwrap();

        assert!(mount(&env, &temp.path().join("missing").to_string_lossy()).is_none());
        assert!(mount(&env, &temp.path().join("file.zip").to_string_lossy()).is_none());
    }

    #[test]
    fn test_mount_directory_and_enumerate() {
        let temp = TempDir::new().unwrap();
        let env = environment(&temp);
        let root = temp.path().join("pkg");
        std::fs::create_dir_all(root.join("a/.template.config")).unwrap();
        std::fs::write(root.join("a/.template.config/template.json"), "{}").unwrap();
        std::fs::write(root.join("lib.component.json"), "{}").unwrap();

        let mount = mount(&env, &root.to_string_lossy()).unwrap();
        assert!(mount.is_disk_backed());
        assert_eq!(mount.info().mount_point_factory_id, FILE_SYSTEM_MOUNT_POINT_FACTORY_ID);

        let manifests = mount.root().enumerate_files("*.component.json", false).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].full_path(), "/lib.component.json");

        let configs = mount.root().enumerate_files("template.json", true).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].full_path(), "/a/.template.config/template.json");
        assert_eq!(configs[0].read_to_string().unwrap(), "{}");
        assert_eq!(configs[0].parent().unwrap().full_path(), "/a/.template.config");

        assert!(mount.directory_info("/a").exists());
        assert!(!mount.file_info("/a").exists());
        assert!(mount.file_system_info("/missing").is_none());
    }
}
