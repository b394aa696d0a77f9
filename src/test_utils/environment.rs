//! Test environment setup and management
//!
//! Provides an isolated engine base directory and template content root for
//! library and integration tests.

use crate::components::ComponentCatalog;
use crate::environment::{EngineEnvironment, Host};
use crate::filesystem::{EntryFilter, FileSystem, PhysicalFileSystem, ReadSeek};
use crate::paths::Paths;
use crate::settings::SettingsLoader;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Temporary engine base directory plus a directory for template content.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub base_dir: PathBuf,
    templates_dir: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let base_dir = temp_dir.path().join("base");
        let templates_dir = temp_dir.path().join("templates");
        fs::create_dir_all(&base_dir)?;
        fs::create_dir_all(&templates_dir)?;

        Ok(Self {
            temp_dir,
            base_dir,
            templates_dir,
        })
    }

    /// Directory tests place template content in.
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Absolute path of `relative` inside the temporary directory.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Writes `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Engine environment for the default test host.
    pub fn environment(&self) -> Arc<EngineEnvironment> {
        self.environment_with(Host::new("scaffold"), Arc::new(PhysicalFileSystem))
    }

    /// Engine environment for `host` over `fs`.
    pub fn environment_with(&self, host: Host, fs: Arc<dyn FileSystem>) -> Arc<EngineEnvironment> {
        Arc::new(EngineEnvironment::new(host, Paths::new(&self.base_dir), fs))
    }

    /// Settings loader over [`Self::environment`] with the built-in components.
    pub fn loader(&self) -> SettingsLoader {
        SettingsLoader::new(self.environment(), ComponentCatalog::with_builtins())
    }

    /// A loader for the same base directory with a different locale.
    pub fn loader_for_locale(&self, locale: &str) -> SettingsLoader {
        let host = Host::new("scaffold").with_locale(Some(locale.to_string()));
        SettingsLoader::new(
            self.environment_with(host, Arc::new(PhysicalFileSystem)),
            ComponentCatalog::with_builtins(),
        )
    }
}

/// [`PhysicalFileSystem`] whose first reads or writes fail.
///
/// Simulates another process replacing a document while it is accessed.
#[derive(Debug, Default)]
pub struct FlakyFileSystem {
    inner: PhysicalFileSystem,
    failing_reads: AtomicU32,
    failing_writes: AtomicU32,
}

impl FlakyFileSystem {
    pub fn new(failing_reads: u32, failing_writes: u32) -> Self {
        Self {
            inner: PhysicalFileSystem,
            failing_reads: AtomicU32::new(failing_reads),
            failing_writes: AtomicU32::new(failing_writes),
        }
    }

    fn take(counter: &AtomicU32) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }

    /// Reads that are still going to fail.
    pub fn remaining_read_failures(&self) -> u32 {
        self.failing_reads.load(Ordering::SeqCst)
    }
}

impl FileSystem for FlakyFileSystem {
    fn current_directory(&self) -> Result<PathBuf> {
        self.inner.current_directory()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.inner.directory_exists(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        self.inner.create_directory(path)
    }

    fn read_all_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        if Self::take(&self.failing_reads) {
            bail!("Simulated read failure: {}", path.display());
        }
        self.inner.read_all_bytes(path)
    }

    fn write_all_bytes(&self, path: &Path, content: &[u8]) -> Result<()> {
        if Self::take(&self.failing_writes) {
            bail!("Simulated write failure: {}", path.display());
        }
        self.inner.write_all_bytes(path, content)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn ReadSeek + Send>> {
        self.inner.open_read(path)
    }

    fn enumerate_entries(
        &self,
        dir: &Path,
        pattern: &str,
        recursive: bool,
        filter: EntryFilter,
    ) -> Result<Vec<PathBuf>> {
        self.inner.enumerate_entries(dir, pattern, recursive, filter)
    }

    fn copy(&self, source: &Path, target: &Path) -> Result<()> {
        self.inner.copy(source, target)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        self.inner.delete_file(path)
    }

    fn delete_directory(&self, path: &Path) -> Result<()> {
        self.inner.delete_directory(path)
    }

    fn last_modified(&self, path: &Path) -> Result<DateTime<Utc>> {
        self.inner.last_modified(path)
    }

    fn expand_environment_variables(&self, input: &str) -> String {
        self.inner.expand_environment_variables(input)
    }
}
