//! Installing template content.
//!
//! An install request is either a local location (a directory, an archive, or
//! a path whose last segment is a wildcard) or a remote package written as
//! `name::version`. Local requests are scanned directly. Packages are restored
//! by an external tool into a scratch directory, copied into the packages
//! directory and then scanned as local archives. Every template cache is
//! rewritten once all requests have been scanned.
//!
//! A request that names nothing is reported through
//! [`Host::on_non_critical_error`](crate::environment::Host::on_non_critical_error)
//! and does not stop the other requests.

use crate::config::EngineConfig;
use crate::constants::{DEFAULT_RESTORE_COMMAND, DEFAULT_RESTORE_TIMEOUT, MAX_RESTORE_ATTEMPTS};
use crate::core::EngineError;
use crate::scanner::{Scanner, unmountable};
use crate::settings::SettingsLoader;
use crate::template::ScannedTemplateInfo;
use crate::template_cache::TemplateCacheManager;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

const PACKAGE_SEPARATOR: &str = "::";
const RESTORE_PROJECT_FILE: &str = "restore.csproj";
const RESTORED_PACKAGES_DIR: &str = "Packages";
const PACKAGE_FILE_PATTERN: &str = "*.nupkg";

/// A remote content package, `name::version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
}

impl PackageSpec {
    /// Parses `name::version`, returning `None` for anything else.
    pub fn try_parse(request: &str) -> Option<Self> {
        request.parse().ok()
    }
}

impl FromStr for PackageSpec {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidPackageSpecification {
            spec: s.to_string(),
        };

        let (name, version) = s.trim().split_once(PACKAGE_SEPARATOR).ok_or_else(invalid)?;
        let (name, version) = (name.trim(), version.trim());
        if name.is_empty() || version.is_empty() || version.contains(PACKAGE_SEPARATOR) {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, PACKAGE_SEPARATOR, self.version)
    }
}

/// How remote packages are restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Executable name or path
    pub command: String,
    /// Limit for one restore invocation
    pub timeout: Duration,
    /// Invocations before giving up
    pub attempts: usize,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_RESTORE_COMMAND.to_string(),
            timeout: DEFAULT_RESTORE_TIMEOUT,
            attempts: MAX_RESTORE_ATTEMPTS,
        }
    }
}

impl RestoreOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            command: config.restore_command.clone(),
            timeout: config.restore_timeout(),
            attempts: MAX_RESTORE_ATTEMPTS,
        }
    }
}

/// What an install run discovered and wrote.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub scanned: ScannedTemplateInfo,
    /// Cache documents rewritten, `None` being the neutral document
    pub caches_written: Vec<Option<String>>,
}

/// Installs content into the engine behind `loader`.
pub struct Installer<'a> {
    loader: &'a SettingsLoader,
    restore: RestoreOptions,
}

impl<'a> Installer<'a> {
    pub fn new(loader: &'a SettingsLoader, restore: RestoreOptions) -> Self {
        Self {
            loader,
            restore,
        }
    }

    /// Installs every request, then rewrites the template caches.
    ///
    /// # Errors
    ///
    /// Fails when the restore tool is missing or keeps failing, or when the
    /// caches cannot be written. Requests that name nothing do not fail.
    pub async fn install_packages<S: AsRef<str>>(&self, requests: &[S]) -> Result<InstallReport> {
        let mut local = Vec::new();
        let mut packages = Vec::new();

        for request in requests.iter().map(AsRef::as_ref) {
            if !request.contains(PACKAGE_SEPARATOR) {
                local.push(request.to_string());
                continue;
            }
            match request.parse::<PackageSpec>() {
                Ok(package) => packages.push(package),
                Err(e) => self.report_bad_request(request, &e.to_string()),
            }
        }

        let mut scanned = ScannedTemplateInfo::new();
        if !local.is_empty() {
            self.install_local_packages(&local, &mut scanned);
        }
        if !packages.is_empty() {
            self.install_remote_packages(&packages, &mut scanned).await?;
        }

        let caches_written = TemplateCacheManager::new(self.loader).write_template_caches(&scanned)?;
        info!(
            "Installed {} request(s): {} template(s) discovered",
            requests.len(),
            scanned.templates().len()
        );
        Ok(InstallReport {
            scanned,
            caches_written,
        })
    }

    /// Scans local requests after expanding environment variables.
    ///
    /// The roots of every request are scanned together, so component units
    /// may depend on each other across requests.
    pub fn install_local_packages<S: AsRef<str>>(&self, requests: &[S], scanned: &mut ScannedTemplateInfo) {
        let fs = self.loader.environment().fs();
        let scanner = Scanner::new(self.loader);

        let mut roots = Vec::new();
        let mut claimed = Vec::new();
        for request in requests.iter().map(AsRef::as_ref) {
            let expanded = fs.expand_environment_variables(request.trim());
            if expanded.is_empty() {
                continue;
            }

            let path = Path::new(&expanded);
            let wildcard = path
                .file_name()
                .is_some_and(|leaf| leaf.to_string_lossy().contains(['*', '?']));
            if !wildcard && !fs.directory_exists(path) && !fs.file_exists(path) {
                self.report_bad_request(&expanded, "Path not found");
                continue;
            }

            match scanner.resolve_roots(&expanded) {
                Ok(found) if found.is_empty() => debug!("'{}' matched no content roots", expanded),
                Ok(found) => {
                    let start = roots.len();
                    roots.extend(found);
                    claimed.push((expanded, start..roots.len()));
                }
                Err(e) => self.report_bad_request(&expanded, &format!("{e:#}")),
            }
        }
        if roots.is_empty() {
            return;
        }

        let summaries = match self.loader.ensure_loaded().and_then(|()| scanner.scan_roots(&roots, scanned)) {
            Ok(summaries) => summaries,
            Err(e) => {
                for (request, _) in &claimed {
                    self.report_bad_request(request, &format!("{e:#}"));
                }
                return;
            }
        };

        for (request, range) in claimed {
            if summaries[range.clone()].iter().all(Option::is_none) {
                self.report_bad_request(&request, &unmountable(&roots[range.start]).to_string());
            } else {
                debug!("Scanned '{}'", request);
            }
        }
    }

    /// Restores `packages` and scans the package files produced.
    pub async fn install_remote_packages(
        &self,
        packages: &[PackageSpec],
        scanned: &mut ScannedTemplateInfo,
    ) -> Result<()> {
        let tool = which::which(&self.restore.command).map_err(|_| EngineError::RestoreToolNotFound {
            tool: self.restore.command.clone(),
        })?;

        let fs = self.loader.environment().fs();
        let paths = self.loader.environment().paths();
        let scratch = paths.scratch_dir();
        let project = scratch.join(RESTORE_PROJECT_FILE);
        let restored = scratch.join(RESTORED_PACKAGES_DIR);

        fs.create_directory(&scratch)?;
        fs.write_all_text(&project, &restore_project(packages))
            .with_context(|| format!("Failed to write restore project: {}", project.display()))?;

        let outcome = self.run_restore(&tool, &project, &restored).await;

        let result = match outcome {
            Ok(()) => self.collect_restored_packages(&restored),
            Err(e) => Err(e),
        };
        if let Err(e) = fs.delete_directory(&scratch) {
            warn!("Failed to clean up {}: {}", scratch.display(), e);
        }

        let local = result?;
        self.install_local_packages(&local, scanned);
        Ok(())
    }

    fn collect_restored_packages(&self, restored: &Path) -> Result<Vec<String>> {
        let fs = self.loader.environment().fs();
        let packages_dir = self.loader.environment().paths().packages_dir();
        fs.create_directory(&packages_dir)?;

        let mut local = Vec::new();
        for package in fs.enumerate_files(restored, PACKAGE_FILE_PATTERN, true)? {
            let Some(file_name) = package.file_name() else {
                continue;
            };
            let target = packages_dir.join(file_name);
            fs.copy(&package, &target)
                .with_context(|| format!("Failed to copy restored package {}", package.display()))?;
            local.push(target.to_string_lossy().into_owned());
        }

        if local.is_empty() {
            warn!("Package restore produced no packages in {}", restored.display());
        }
        Ok(local)
    }

    async fn run_restore(&self, tool: &Path, project: &Path, restored: &Path) -> Result<()> {
        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.restore.attempts.saturating_sub(1));

        Retry::spawn(strategy, || restore_once(tool.to_path_buf(), project, restored, self.restore.timeout))
            .await
            .map_err(|reason| {
                EngineError::RestoreFailed {
                    reason,
                }
                .into()
            })
    }

    fn report_bad_request(&self, request: &str, reason: &str) {
        self.loader.environment().host().on_non_critical_error(
            "InvalidPackageSpecification",
            &format!("Could not install '{request}': {reason}"),
            request,
        );
    }
}

async fn restore_once(
    tool: PathBuf,
    project: &Path,
    restored: &Path,
    limit: Duration,
) -> std::result::Result<(), String> {
    let mut command = Command::new(&tool);
    command
        .arg("restore")
        .arg(project)
        .arg("--packages")
        .arg(restored)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Executing: {} restore {} --packages {}", tool.display(), project.display(), restored.display());
    let output = match timeout(limit, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("Failed to run {}: {e}", tool.display())),
        Err(_) => {
            warn!("Package restore timed out after {} seconds", limit.as_secs());
            return Err(format!("timed out after {} seconds", limit.as_secs()));
        }
    };

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    warn!("Package restore exited with {}: {}", output.status, stderr.trim());
    Err(format!("{} exited with {}: {}", tool.display(), output.status, stderr.trim()))
}

fn restore_project(packages: &[PackageSpec]) -> String {
    let references: String = packages
        .iter()
        .map(|p| format!("    <PackageReference Include=\"{}\" Version=\"{}\" />\n", p.name, p.version))
        .collect();

    format!(
        "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <PropertyGroup>\n    <TargetFramework>netstandard2.0</TargetFramework>\n  </PropertyGroup>\n\n  <ItemGroup>\n{references}  </ItemGroup>\n</Project>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentCatalog;
    use crate::generator::JsonTemplateGenerator;
    use crate::test_utils::{ComponentManifestFixture, TemplateFixture, TestEnvironment, zip_bytes};
    use std::sync::Arc;

    #[test]
    fn test_package_spec_parsing() {
        let spec = PackageSpec::try_parse("Contoso.Templates::1.2.0").unwrap();
        assert_eq!(spec.name, "Contoso.Templates");
        assert_eq!(spec.version, "1.2.0");
        assert_eq!(spec.to_string(), "Contoso.Templates::1.2.0");

        assert!(PackageSpec::try_parse("./templates").is_none());
        assert!(PackageSpec::try_parse("::1.0").is_none());
        assert!(PackageSpec::try_parse("name::").is_none());
        assert!(matches!(
            "a::b::c".parse::<PackageSpec>(),
            Err(EngineError::InvalidPackageSpecification { spec }) if spec == "a::b::c"
        ));
    }

    #[test]
    fn test_restore_project_lists_packages() {
        let project = restore_project(&[
            PackageSpec::try_parse("A::1.0").unwrap(),
            PackageSpec::try_parse("B::2.0").unwrap(),
        ]);
        assert!(project.contains("<PackageReference Include=\"A\" Version=\"1.0\" />"));
        assert!(project.contains("<PackageReference Include=\"B\" Version=\"2.0\" />"));
    }

    #[tokio::test]
    async fn test_local_install_writes_caches() {
        let env = TestEnvironment::new().unwrap();
        TemplateFixture::new("Console.CSharp", "Console Application")
            .short_name("console")
            .write(&env.templates_dir().join("console"))
            .unwrap();
        let loader = env.loader();
        let installer = Installer::new(&loader, RestoreOptions::default());

        let request = env.templates_dir().join("console").to_string_lossy().into_owned();
        let report = installer.install_packages(&[request]).await.unwrap();

        assert_eq!(report.scanned.templates().len(), 1);
        assert_eq!(report.caches_written, vec![None]);
        assert!(loader.try_read_template_cache_file(None).unwrap().0);
    }

    #[tokio::test]
    async fn test_missing_paths_are_non_critical() {
        let env = TestEnvironment::new().unwrap();
        let loader = env.loader();
        let installer = Installer::new(&loader, RestoreOptions::default());

        let missing = env.path("nowhere").to_string_lossy().into_owned();
        let report = installer.install_packages(&[missing.clone(), "bad::".to_string()]).await.unwrap();

        assert!(report.scanned.is_empty());
        let errors = loader.environment().host().non_critical_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code == "InvalidPackageSpecification"));
        assert!(errors.iter().any(|e| e.context == missing));
        assert!(errors.iter().any(|e| e.context == "bad::"));
    }

    #[tokio::test]
    async fn test_requests_share_one_component_worklist() {
        let env = TestEnvironment::new().unwrap();
        let mut catalog = ComponentCatalog::with_builtins();
        catalog.register_generator("first", || Arc::new(JsonTemplateGenerator));
        catalog.register_generator("second", || Arc::new(JsonTemplateGenerator));
        ComponentManifestFixture::new()
            .generator("second")
            .requires("first")
            .write(&env.path("one/lib"), "second")
            .unwrap();
        ComponentManifestFixture::new()
            .generator("first")
            .write(&env.path("two/lib"), "first")
            .unwrap();
        let loader = SettingsLoader::new(env.environment(), catalog);
        let installer = Installer::new(&loader, RestoreOptions::default());

        let requests = [env.path("one"), env.path("two")].map(|p| p.to_string_lossy().into_owned());
        installer.install_packages(&requests).await.unwrap();

        assert!(loader.is_component_registered("first").unwrap());
        assert!(loader.is_component_registered("second").unwrap());
        assert!(loader.environment().host().non_critical_errors().is_empty());
    }

    #[tokio::test]
    async fn test_unmountable_request_is_non_critical() {
        let env = TestEnvironment::new().unwrap();
        let notes = env.write_file("notes.txt", "plain text").unwrap();
        TemplateFixture::new("A", "A").write(&env.templates_dir().join("a")).unwrap();
        let loader = env.loader();
        let installer = Installer::new(&loader, RestoreOptions::default());

        let requests = [notes.clone(), env.templates_dir().join("a")].map(|p| p.to_string_lossy().into_owned());
        let report = installer.install_packages(&requests).await.unwrap();

        assert_eq!(report.scanned.templates().len(), 1);
        let errors = loader.environment().host().non_critical_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unable to mount"));
    }

    #[tokio::test]
    async fn test_missing_restore_tool_is_fatal() {
        let env = TestEnvironment::new().unwrap();
        let loader = env.loader();
        let installer = Installer::new(
            &loader,
            RestoreOptions {
                command: "scaffold-test-no-such-restore-tool".to_string(),
                ..RestoreOptions::default()
            },
        );

        let err = installer.install_packages(&["Contoso.Templates::1.0.0"]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::RestoreToolNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restored_packages_are_scanned() {
        use std::os::unix::fs::PermissionsExt;

        let env = TestEnvironment::new().unwrap();
        let entries = TemplateFixture::new("Restored.Template", "Restored").archive_entries("content/restored");
        let borrowed: Vec<(&str, &[u8])> =
            entries.iter().map(|(name, content)| (name.as_str(), content.as_slice())).collect();
        let package = env.write_file("feed/restored.1.0.0.nupkg", zip_bytes(&borrowed)).unwrap();

        let script = env
            .write_file(
                "bin/fake-restore",
                format!("#!/bin/sh\nmkdir -p \"$4/restored/1.0.0\"\ncp '{}' \"$4/restored/1.0.0/\"\n", package.display()),
            )
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let loader = env.loader();
        let installer = Installer::new(
            &loader,
            RestoreOptions {
                command: script.to_string_lossy().into_owned(),
                attempts: 1,
                ..RestoreOptions::default()
            },
        );
        let report = installer.install_packages(&["Restored.Template::1.0.0"]).await.unwrap();

        assert_eq!(report.scanned.templates().len(), 1);
        assert!(loader.environment().paths().packages_dir().join("restored.1.0.0.nupkg").exists());
        assert!(!loader.environment().paths().scratch_dir().exists());
    }
}
