use crate::{all_templates, engine_for};
use scaffold_cli::components::ComponentCatalog;
use scaffold_cli::constants::MAX_PROBING_PATH_SAVE_ATTEMPTS;
use scaffold_cli::core::{EngineError, user_friendly_error};
use scaffold_cli::environment::Host;
use scaffold_cli::settings::SettingsLoader;
use scaffold_cli::test_utils::{FlakyFileSystem, TemplateFixture, TestEnvironment, zip_bytes};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_settings_survive_a_new_session() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("A", "Alpha").write(&env.templates_dir().join("a")).unwrap();
    TemplateFixture::new("B", "Beta").write(&env.templates_dir().join("b")).unwrap();
    let engine = engine_for(&env, None, None);
    engine.install(&[all_templates(&env)]).await.unwrap();
    let mounts = engine.loader().mount_points().unwrap();
    assert_eq!(mounts.len(), 2);

    let settings = std::fs::read_to_string(env.base_dir.join("settings.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&settings).unwrap();
    assert_eq!(document["mountPoints"].as_array().unwrap().len(), 2);

    let reloaded = env.loader();
    assert_eq!(reloaded.mount_points().unwrap(), mounts);
    assert_eq!(reloaded.probing_paths().unwrap(), engine.loader().probing_paths().unwrap());
}

#[tokio::test]
async fn test_load_installed_template_with_host_file() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("Console", "Console App")
        .short_name("console")
        .host_file("scaffold", json!({ "icon": "terminal" }))
        .write(&env.templates_dir().join("console"))
        .unwrap();
    let engine = engine_for(&env, None, None);
    engine.install(&[all_templates(&env)]).await.unwrap();

    let info = engine.template_cache().unwrap().template_info.remove(0);
    let template = engine.load_template(&info).unwrap().unwrap();
    assert_eq!(template.config["identity"], "Console");
    assert_eq!(template.host_config.unwrap()["icon"], "terminal");
}

#[tokio::test]
async fn test_load_template_whose_config_was_removed() {
    let env = TestEnvironment::new().unwrap();
    let descriptor = TemplateFixture::new("Gone", "Gone").write(&env.templates_dir().join("gone")).unwrap();
    let engine = engine_for(&env, None, None);
    engine.install(&[all_templates(&env)]).await.unwrap();
    std::fs::remove_file(descriptor).unwrap();

    let info = engine.template_cache().unwrap().template_info.remove(0);
    assert!(engine.load_template(&info).unwrap().is_none());
}

#[tokio::test]
async fn test_clean_caches_removes_every_document() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("A", "Alpha").write(&env.templates_dir().join("a")).unwrap();
    let engine = engine_for(&env, Some("de-DE"), None);
    engine.install(&[all_templates(&env)]).await.unwrap();
    assert_eq!(engine.loader().locales_with_template_cache_files().unwrap(), vec!["de-DE"]);

    engine.clean_caches().unwrap();
    assert!(engine.loader().locales_with_template_cache_files().unwrap().is_empty());
    assert!(!env.base_dir.join("templatecache.json").exists());
    // Mount points are settings, not cache
    assert_eq!(engine.loader().mount_points().unwrap().len(), 1);
}

#[test]
fn test_exhausted_save_renders_with_suggestion() {
    let env = TestEnvironment::new().unwrap();
    let fs = Arc::new(FlakyFileSystem::new(0, MAX_PROBING_PATH_SAVE_ATTEMPTS));
    let loader = SettingsLoader::new(env.environment_with(Host::new("scaffold"), fs), ComponentCatalog::with_builtins());

    let err = loader.add_probing_path("/components").unwrap_err();
    let rendered = user_friendly_error(err);
    assert!(matches!(
        rendered.error,
        EngineError::SettingsSaveFailed {
            attempts: MAX_PROBING_PATH_SAVE_ATTEMPTS,
            ..
        }
    ));
    assert!(rendered.suggestion.is_some());
    assert!(rendered.to_string().starts_with("Failed to save settings after"));
}

#[tokio::test]
async fn test_package_install_unit_is_persisted() {
    let env = TestEnvironment::new().unwrap();
    let nuspec = "<package><metadata><id>Contoso.Templates</id><version>2.0.1</version></metadata></package>";
    let mut entries = TemplateFixture::new("Packaged", "Packaged").archive_entries("content/packaged");
    entries.push(("Contoso.Templates.nuspec".to_string(), nuspec.as_bytes().to_vec()));
    let borrowed: Vec<(&str, &[u8])> =
        entries.iter().map(|(name, content)| (name.as_str(), content.as_slice())).collect();
    let package = env.write_file("feed/contoso.templates.2.0.1.nupkg", zip_bytes(&borrowed)).unwrap();

    let engine = engine_for(&env, None, None);
    engine.install(&[package.display().to_string()]).await.unwrap();

    let settings = std::fs::read_to_string(env.base_dir.join("settings.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&settings).unwrap();
    let units = document["installUnitDescriptors"].as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["packageName"], "Contoso.Templates");
    assert_eq!(units[0]["version"], "2.0.1");

    let template = engine.template_cache().unwrap().template_info.remove(0);
    let unit = env.loader().try_get_install_unit_descriptor(template.config_mount_point_id).unwrap();
    assert_eq!(unit.unwrap().to_string(), "Contoso.Templates::2.0.1");
}
