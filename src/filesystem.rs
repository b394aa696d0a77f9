//! File system capability consumed by the engine.
//!
//! Every disk access the engine performs (settings and cache documents, mount
//! points over directories, materializing archives) goes through the
//! [`FileSystem`] trait so hosts and tests can substitute their own
//! implementation. [`PhysicalFileSystem`] is the default, backed by `std::fs`.
//!
//! # Pattern Syntax
//!
//! Enumeration patterns are glob patterns matched against the *file name* of
//! each entry, not its full path:
//!
//! - `*` matches any sequence of characters
//! - `?` matches any single character
//! - `[abc]` matches any character in the set
//!
//! A recursive enumeration applies the same leaf pattern at every depth.

use crate::utils::fs::{atomic_write, copy_dir, ensure_dir};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use glob::Pattern;
use regex::Regex;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::trace;
use walkdir::WalkDir;

/// Readable, seekable byte source handed to archive readers.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Which kinds of entries an enumeration yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    /// Regular files only
    Files,
    /// Directories only
    Directories,
    /// Files and directories
    All,
}

/// Abstract file system operations used by the engine.
///
/// Only the primitive operations are required; text helpers and filtered
/// enumerations have default implementations on top of them. Writes must be
/// full-document replacements: a concurrent reader never observes a partially
/// written file.
pub trait FileSystem: Send + Sync {
    /// Returns the process working directory.
    fn current_directory(&self) -> Result<PathBuf>;

    /// Returns `true` if `path` exists and is a directory.
    fn directory_exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` exists and is a regular file.
    fn file_exists(&self, path: &Path) -> bool;

    /// Creates `path` and all missing parents.
    fn create_directory(&self, path: &Path) -> Result<()>;

    /// Reads the whole file.
    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Atomically replaces the file with `content`.
    fn write_all_bytes(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Opens a file for random access reads.
    fn open_read(&self, path: &Path) -> Result<Box<dyn ReadSeek + Send>>;

    /// Lists entries below `dir` whose file name matches `pattern`.
    ///
    /// Results are sorted so enumeration order is deterministic.
    fn enumerate_entries(
        &self,
        dir: &Path,
        pattern: &str,
        recursive: bool,
        filter: EntryFilter,
    ) -> Result<Vec<PathBuf>>;

    /// Copies a file, or a directory tree, to `target`.
    fn copy(&self, source: &Path, target: &Path) -> Result<()>;

    /// Deletes a file. Deleting a missing file succeeds.
    fn delete_file(&self, path: &Path) -> Result<()>;

    /// Deletes a directory tree. Deleting a missing directory succeeds.
    fn delete_directory(&self, path: &Path) -> Result<()>;

    /// Returns the modification time of `path`.
    fn last_modified(&self, path: &Path) -> Result<DateTime<Utc>>;

    /// Expands `~`, `$VAR`, `${VAR}` and `%VAR%` references.
    fn expand_environment_variables(&self, input: &str) -> String;

    /// Reads the whole file as UTF-8 text.
    fn read_all_text(&self, path: &Path) -> Result<String> {
        let bytes = self.read_all_bytes(path)?;
        String::from_utf8(bytes).with_context(|| format!("File is not valid UTF-8: {}", path.display()))
    }

    /// Atomically replaces the file with `content`.
    fn write_all_text(&self, path: &Path, content: &str) -> Result<()> {
        self.write_all_bytes(path, content.as_bytes())
    }

    /// Lists files below `dir` whose name matches `pattern`.
    fn enumerate_files(&self, dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
        self.enumerate_entries(dir, pattern, recursive, EntryFilter::Files)
    }

    /// Lists directories below `dir` whose name matches `pattern`.
    fn enumerate_directories(
        &self,
        dir: &Path,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<PathBuf>> {
        self.enumerate_entries(dir, pattern, recursive, EntryFilter::Directories)
    }

    /// Lists files and directories below `dir` whose name matches `pattern`.
    fn enumerate_file_system_entries(
        &self,
        dir: &Path,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<PathBuf>> {
        self.enumerate_entries(dir, pattern, recursive, EntryFilter::All)
    }
}

/// [`FileSystem`] over the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalFileSystem;

impl PhysicalFileSystem {
    /// Creates the physical file system.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

static WINDOWS_VAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"%([^%]+)%").ok());

impl FileSystem for PhysicalFileSystem {
    fn current_directory(&self) -> Result<PathBuf> {
        std::env::current_dir().context("Failed to determine the current directory")
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        ensure_dir(path)
    }

    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
    }

    fn write_all_bytes(&self, path: &Path, content: &[u8]) -> Result<()> {
        atomic_write(path, content)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn ReadSeek + Send>> {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        Ok(Box::new(file))
    }

    fn enumerate_entries(
        &self,
        dir: &Path,
        pattern: &str,
        recursive: bool,
        filter: EntryFilter,
    ) -> Result<Vec<PathBuf>> {
        let matcher =
            Pattern::new(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        trace!("Enumerating '{}' in {} (recursive: {})", pattern, dir.display(), recursive);

        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name();

        let mut matches = Vec::new();
        for entry in walker.into_iter().filter_map(std::result::Result::ok) {
            let file_type = entry.file_type();
            let wanted = match filter {
                EntryFilter::Files => file_type.is_file(),
                EntryFilter::Directories => file_type.is_dir(),
                EntryFilter::All => file_type.is_file() || file_type.is_dir(),
            };
            if wanted && matcher.matches(&entry.file_name().to_string_lossy()) {
                matches.push(entry.into_path());
            }
        }

        Ok(matches)
    }

    fn copy(&self, source: &Path, target: &Path) -> Result<()> {
        if source.is_dir() {
            return copy_dir(source, target);
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        fs::copy(source, target).with_context(|| {
            format!("Failed to copy file from {} to {}", source.display(), target.display())
        })?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to delete file: {}", path.display()))
            }
        }
    }

    fn delete_directory(&self, path: &Path) -> Result<()> {
        crate::utils::fs::remove_dir_all(path)
    }

    fn last_modified(&self, path: &Path) -> Result<DateTime<Utc>> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time: {}", path.display()))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn expand_environment_variables(&self, input: &str) -> String {
        let mut result = input.to_string();

        if result.contains('%')
            && let Some(re) = WINDOWS_VAR.as_ref()
        {
            for cap in re.captures_iter(input) {
                if let Some(var_name) = cap.get(1)
                    && let Ok(value) = std::env::var(var_name.as_str())
                {
                    result = result.replace(&format!("%{}%", var_name.as_str()), &value);
                }
            }
        }

        // Undefined variables are left as written
        match shellexpand::full(&result) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("pkg-a/nested")).unwrap();
        fs::create_dir_all(temp.path().join("pkg-b")).unwrap();
        fs::write(temp.path().join("pkg-a/one.component.json"), "{}").unwrap();
        fs::write(temp.path().join("pkg-a/nested/two.component.json"), "{}").unwrap();
        fs::write(temp.path().join("readme.md"), "x").unwrap();
        temp
    }

    #[test]
    fn test_enumerate_directories_by_leaf_pattern() {
        let temp = layout();
        let fs = PhysicalFileSystem::new();

        let dirs = fs.enumerate_directories(temp.path(), "pkg-*", false).unwrap();
        assert_eq!(dirs, vec![temp.path().join("pkg-a"), temp.path().join("pkg-b")]);
    }

    #[test]
    fn test_enumerate_files_recursive() {
        let temp = layout();
        let fs = PhysicalFileSystem::new();

        let shallow = fs.enumerate_files(&temp.path().join("pkg-a"), "*.component.json", false).unwrap();
        assert_eq!(shallow.len(), 1);

        let deep = fs.enumerate_files(&temp.path().join("pkg-a"), "*.component.json", true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_enumerate_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new();
        assert!(fs.enumerate_file_system_entries(&temp.path().join("nope"), "*", true).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read_text() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new();
        let path = temp.path().join("a/b/settings.json");

        fs.write_all_text(&path, "{\"probingPaths\":[]}").unwrap();
        assert!(fs.file_exists(&path));
        assert_eq!(fs.read_all_text(&path).unwrap(), "{\"probingPaths\":[]}");
    }

    #[test]
    fn test_delete_missing_file_succeeds() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new();
        assert!(fs.delete_file(&temp.path().join("missing.json")).is_ok());
    }

    #[test]
    fn test_copy_file_creates_parent() {
        let temp = layout();
        let fs = PhysicalFileSystem::new();
        let target = temp.path().join("out/deep/readme.md");

        fs.copy(&temp.path().join("readme.md"), &target).unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "x");
    }

    #[test]
    #[serial]
    fn test_expand_environment_variables() {
        let fs = PhysicalFileSystem::new();
        unsafe {
            std::env::set_var("SCAFFOLD_TEST_EXPAND", "packages");
        }

        assert_eq!(fs.expand_environment_variables("/tmp/$SCAFFOLD_TEST_EXPAND"), "/tmp/packages");
        assert_eq!(fs.expand_environment_variables("/tmp/%SCAFFOLD_TEST_EXPAND%"), "/tmp/packages");
        assert_eq!(fs.expand_environment_variables("/tmp/$SCAFFOLD_UNDEFINED_VAR"), "/tmp/$SCAFFOLD_UNDEFINED_VAR");

        unsafe {
            std::env::remove_var("SCAFFOLD_TEST_EXPAND");
        }
    }
}
