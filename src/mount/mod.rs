//! Virtualized file trees over heterogeneous backing stores.
//!
//! A mount point gives a uniform view over a directory on disk, a zip archive,
//! or an archive nested inside another mount point. Paths inside a mount are
//! `/`-rooted and use `/` as separator regardless of platform.
//!
//! # Architecture
//!
//! - [`MountPoint`] - a live view over one backing store
//! - [`MountEntry`] - a file or directory inside a mount point
//! - [`MountPointFactory`] - accepts or rejects a place string
//! - [`MountPointManager`] - reference-counted table of live mount points
//! - [`MountGuard`] - RAII handle that releases its mount point on drop
//!
//! The settings store owns the persisted [`MountPointInfo`] records; the
//! manager exclusively owns the live backing-store handles.

mod archive;
mod filesystem;
mod manager;

pub use archive::{ZIP_MOUNT_POINT_FACTORY_ID, ZipMountPointFactory};
pub use filesystem::{FILE_SYSTEM_MOUNT_POINT_FACTORY_ID, FileSystemMountPointFactory};
pub use manager::{MountGuard, MountPointManager, MountResolver, MountTicket};

use crate::environment::EngineEnvironment;
use crate::filesystem::FileSystem;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Persisted description of a mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPointInfo {
    /// Unique id of this mount point
    pub mount_point_id: Uuid,
    /// Id of the factory that creates it
    pub mount_point_factory_id: Uuid,
    /// Parent mount point for nested archives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_mount_point_id: Option<Uuid>,
    /// Where the backing store lives
    pub place: String,
    /// Modification time of the backing store when it was mounted
    pub last_modified: DateTime<Utc>,
}

impl MountPointInfo {
    /// `true` if `other` describes the same backing store.
    ///
    /// Places compare case-insensitively.
    #[must_use]
    pub fn same_location(&self, other: &Self) -> bool {
        self.parent_mount_point_id == other.parent_mount_point_id
            && self.place.eq_ignore_ascii_case(&other.place)
    }
}

/// Kind of an entry inside a mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A live view over one backing store.
pub trait MountPoint: Send + Sync {
    /// The persisted description of this mount point.
    fn info(&self) -> &MountPointInfo;

    /// `true` if entries can be reached directly on the local disk.
    fn is_disk_backed(&self) -> bool;

    /// Local directory backing the mount root, for disk-backed mounts.
    fn disk_path(&self) -> Option<&Path>;

    /// Kind of the entry at `path`, or `None` if it does not exist.
    ///
    /// `path` is normalized.
    fn entry_kind(&self, path: &str) -> Option<EntryKind>;

    /// Reads the whole file at the normalized `path`.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Immediate children of the directory at the normalized `path`, as full
    /// mount paths sorted by name.
    fn list_children(&self, path: &str) -> Result<Vec<(String, EntryKind)>>;
}

impl<'m> dyn MountPoint + 'm {
    /// The root directory.
    pub fn root(&self) -> MountEntry<'_> {
        MountEntry::new(self, "/", EntryKind::Directory)
    }

    /// The file at `path`. Check [`MountEntry::exists`] before reading.
    pub fn file_info(&self, path: &str) -> MountEntry<'_> {
        MountEntry::new(self, path, EntryKind::File)
    }

    /// The directory at `path`. Check [`MountEntry::exists`] before enumerating.
    pub fn directory_info(&self, path: &str) -> MountEntry<'_> {
        MountEntry::new(self, path, EntryKind::Directory)
    }

    /// Whichever entry exists at `path`.
    pub fn file_system_info(&self, path: &str) -> Option<MountEntry<'_>> {
        let path = normalize_path(path);
        let kind = self.entry_kind(&path)?;
        Some(MountEntry::new(self, &path, kind))
    }
}

/// A file or directory inside a mount point.
#[derive(Clone)]
pub struct MountEntry<'a> {
    mount: &'a dyn MountPoint,
    path: String,
    kind: EntryKind,
}

impl std::fmt::Debug for MountEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountEntry")
            .field("mount_point_id", &self.mount.info().mount_point_id)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<'a> MountEntry<'a> {
    fn new(mount: &'a dyn MountPoint, path: &str, kind: EntryKind) -> Self {
        Self {
            mount,
            path: normalize_path(path),
            kind,
        }
    }

    /// The mount point this entry belongs to.
    pub fn mount_point(&self) -> &'a dyn MountPoint {
        self.mount
    }

    /// Full `/`-rooted path inside the mount point.
    pub fn full_path(&self) -> &str {
        &self.path
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// `true` if an entry of this kind exists at this path.
    pub fn exists(&self) -> bool {
        self.mount.entry_kind(&self.path) == Some(self.kind)
    }

    /// The containing directory, `None` for the root.
    pub fn parent(&self) -> Option<MountEntry<'a>> {
        parent_path(&self.path).map(|p| MountEntry::new(self.mount, p, EntryKind::Directory))
    }

    /// Path of this entry on the local disk, for disk-backed mounts.
    pub fn disk_path(&self) -> Option<PathBuf> {
        let root = self.mount.disk_path()?;
        let relative = self.path.trim_start_matches('/');
        Some(if relative.is_empty() {
            root.to_path_buf()
        } else {
            root.join(relative)
        })
    }

    /// Reads the whole file.
    pub fn read_to_vec(&self) -> Result<Vec<u8>> {
        self.mount.read_file(&self.path)
    }

    /// Reads the whole file as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String> {
        String::from_utf8(self.read_to_vec()?)
            .with_context(|| format!("File is not valid UTF-8: {}", self.path))
    }

    /// A named child of this directory.
    pub fn child(&self, name: &str, kind: EntryKind) -> MountEntry<'a> {
        MountEntry::new(self.mount, &join_path(&self.path, name), kind)
    }

    /// Files below this directory whose name matches `pattern`.
    pub fn enumerate_files(&self, pattern: &str, recursive: bool) -> Result<Vec<MountEntry<'a>>> {
        self.enumerate(pattern, recursive, Some(EntryKind::File))
    }

    /// Directories below this directory whose name matches `pattern`.
    pub fn enumerate_directories(
        &self,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<MountEntry<'a>>> {
        self.enumerate(pattern, recursive, Some(EntryKind::Directory))
    }

    /// Files and directories below this directory whose name matches `pattern`.
    pub fn enumerate_file_system_infos(
        &self,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<MountEntry<'a>>> {
        self.enumerate(pattern, recursive, None)
    }

    fn enumerate(
        &self,
        pattern: &str,
        recursive: bool,
        wanted: Option<EntryKind>,
    ) -> Result<Vec<MountEntry<'a>>> {
        let matcher =
            Pattern::new(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        let mut results = Vec::new();
        if self.kind != EntryKind::Directory || !self.exists() {
            return Ok(results);
        }

        let mut pending = vec![self.path.clone()];
        while let Some(dir) = pending.pop() {
            for (path, kind) in self.mount.list_children(&dir)? {
                if kind == EntryKind::Directory && recursive {
                    pending.push(path.clone());
                }
                if wanted.is_none_or(|w| w == kind) && matcher.matches(file_name(&path)) {
                    results.push(MountEntry {
                        mount: self.mount,
                        path,
                        kind,
                    });
                }
            }
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    /// Copies this entry to `target` on the local file system.
    ///
    /// Directories are copied recursively.
    pub fn copy_to(&self, fs: &dyn FileSystem, target: &Path) -> Result<()> {
        if let Some(source) = self.disk_path() {
            return fs.copy(&source, target);
        }

        match self.kind {
            EntryKind::File => fs.write_all_bytes(target, &self.read_to_vec()?),
            EntryKind::Directory => {
                fs.create_directory(target)?;
                for (path, kind) in self.mount.list_children(&self.path)? {
                    let child = MountEntry {
                        mount: self.mount,
                        path,
                        kind,
                    };
                    child.copy_to(fs, &target.join(child.name()))?;
                }
                Ok(())
            }
        }
    }
}

/// Request handed to a [`MountPointFactory`].
pub struct MountRequest<'a> {
    /// Id the new mount point must carry
    pub id: Uuid,
    /// Parent mount point for nested places
    pub parent: Option<&'a dyn MountPoint>,
    /// Absolute disk path, or a path inside `parent`
    pub place: &'a str,
}

/// Creates mount points for the places it recognizes.
pub trait MountPointFactory: Send + Sync {
    /// Stable id recorded in [`MountPointInfo::mount_point_factory_id`].
    fn id(&self) -> Uuid;

    /// Mounts `request.place`, or returns `None` if this factory does not
    /// recognize it. Rejecting a place is not an error.
    fn try_mount(
        &self,
        environment: &Arc<EngineEnvironment>,
        request: &MountRequest<'_>,
    ) -> Option<Box<dyn MountPoint>>;
}

/// Normalizes a mount path to `/`-rooted form without `.`/`..` segments.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Joins a normalized directory path and a child name.
#[must_use]
pub fn join_path(dir: &str, name: &str) -> String {
    normalize_path(&format!("{dir}/{name}"))
}

/// Parent of a normalized path; `None` for the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(index) => Some(&path[..index]),
        None => Some("/"),
    }
}

/// Last segment of a normalized path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}
