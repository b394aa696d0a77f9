use assert_cmd::Command;
use predicates::prelude::*;
use scaffold_cli::config::EngineConfig;
use scaffold_cli::test_utils::{TemplateFixture, TestEnvironment, zip_bytes};
use std::path::PathBuf;

/// A test environment with a `config.toml` pointing the binary at its base directory.
struct CliEnvironment {
    env: TestEnvironment,
    config: PathBuf,
}

impl CliEnvironment {
    fn new() -> Self {
        let env = TestEnvironment::new().unwrap();
        let config = EngineConfig {
            base_dir: Some(env.base_dir.clone()),
            locale: Some("en-US".to_string()),
            default_language: Some("C#".to_string()),
            ..EngineConfig::default()
        };
        let path = env.write_file("config.toml", toml::to_string(&config).unwrap()).unwrap();
        Self {
            env,
            config: path,
        }
    }

    fn with_templates() -> Self {
        let cli = Self::new();
        let templates = cli.env.templates_dir();
        TemplateFixture::new("Console.V1", "Console App")
            .short_name("console")
            .group("Console")
            .language("C#")
            .precedence(1)
            .write(&templates.join("console-v1"))
            .unwrap();
        TemplateFixture::new("Console.V2", "Console App")
            .short_name("console")
            .group("Console")
            .language("C#")
            .precedence(2)
            .write(&templates.join("console-v2"))
            .unwrap();
        TemplateFixture::new("Worker", "Worker Service")
            .short_name("worker")
            .type_tag("project")
            .write(&templates.join("worker"))
            .unwrap();
        TemplateFixture::new("Workflow", "Workflow Host")
            .short_name("workflow")
            .type_tag("project")
            .write(&templates.join("workflow"))
            .unwrap();
        cli.scaffold().arg("install").arg(cli.all_templates()).assert().success();
        cli
    }

    fn all_templates(&self) -> String {
        format!("{}/*", self.env.templates_dir().display())
    }

    fn scaffold(&self) -> Command {
        let mut cmd = Command::cargo_bin("scaffold").unwrap();
        cmd.env("SCAFFOLD_CONFIG", &self.config).env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_install_lists_templates() {
    let cli = CliEnvironment::new();
    TemplateFixture::new("Console", "Console App")
        .short_name("console")
        .write(&cli.env.templates_dir().join("console"))
        .unwrap();

    cli.scaffold()
        .arg("install")
        .arg(cli.all_templates())
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"))
        .stdout(predicate::str::contains("console"));
    assert!(cli.env.base_dir.join("en-US.templatecache.json").is_file());
}

#[test]
fn test_install_missing_path_fails() {
    let cli = CliEnvironment::new();
    let missing = cli.env.path("missing").display().to_string();

    cli.scaffold()
        .args(["install", &missing])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"))
        .stderr(predicate::str::contains("No templates were installed"));
}

#[test]
fn test_list_table() {
    let cli = CliEnvironment::with_templates();

    cli.scaffold()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Short Name"))
        .stdout(predicate::str::contains("worker"))
        .stdout(predicate::str::contains("workflow"))
        .stdout(predicate::str::contains("Total"));
}

#[test]
fn test_list_json_for_partial_name() {
    let cli = CliEnvironment::with_templates();

    let output = cli.scaffold().args(["list", "work", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let mut names: Vec<&str> =
        items.as_array().unwrap().iter().map(|item| item["shortName"].as_str().unwrap()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["worker", "workflow"]);
}

#[test]
fn test_list_unknown_name_prints_help() {
    let cli = CliEnvironment::with_templates();

    cli.scaffold()
        .args(["list", "wroker"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No templates match 'wroker'"))
        .stderr(predicate::str::contains("worker"));
}

#[test]
fn test_show_resolves_highest_precedence() {
    let cli = CliEnvironment::with_templates();

    cli.scaffold()
        .args(["show", "console", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Console.V2"))
        .stdout(predicate::str::contains("Configuration"));
}

#[test]
fn test_show_ambiguous_query_fails() {
    let cli = CliEnvironment::with_templates();

    cli.scaffold()
        .args(["show", "work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Candidate groups"))
        .stderr(predicate::str::contains("Could not resolve 'work'"));
}

#[test]
fn test_cache_info_and_clean() {
    let cli = CliEnvironment::with_templates();

    cli.scaffold()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("en-US"))
        .stdout(predicate::str::contains("Mount points (4)"));

    cli.scaffold().args(["cache", "clean"]).assert().success();
    cli.scaffold().arg("list").assert().success().stdout(predicate::str::contains("No templates found."));
}

#[test]
fn test_list_shows_installing_package() {
    let cli = CliEnvironment::new();
    let nuspec = "<package><metadata><id>Contoso.Templates</id><version>1.2.0</version></metadata></package>";
    let mut entries = TemplateFixture::new("Packaged", "Packaged App")
        .short_name("packaged")
        .archive_entries("content/packaged");
    entries.push(("Contoso.Templates.nuspec".to_string(), nuspec.as_bytes().to_vec()));
    let borrowed: Vec<(&str, &[u8])> =
        entries.iter().map(|(name, content)| (name.as_str(), content.as_slice())).collect();
    let package = cli.env.write_file("feed/contoso.nupkg", zip_bytes(&borrowed)).unwrap();
    cli.scaffold().arg("install").arg(&package).assert().success();

    let output = cli.scaffold().args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(items[0]["shortName"], "packaged");
    assert_eq!(items[0]["package"], "Contoso.Templates::1.2.0");

    cli.scaffold()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Contoso.Templates::1.2.0]"));
}
