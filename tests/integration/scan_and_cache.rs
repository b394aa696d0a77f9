use crate::{all_templates, engine_for};
use scaffold_cli::template_cache::TemplateCache;
use scaffold_cli::test_utils::{TemplateFixture, TestEnvironment, zip_bytes};
use serde_json::json;

fn identities(cache: &TemplateCache) -> Vec<String> {
    let mut identities: Vec<String> = cache.template_info.iter().map(|t| t.identity.clone()).collect();
    identities.sort();
    identities
}

#[tokio::test]
async fn test_install_writes_neutral_and_locale_caches() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("Console.CSharp", "Console App")
        .short_name("console")
        .localization("de-DE", json!({ "name": "Konsolenanwendung" }))
        .write(&env.templates_dir().join("console"))
        .unwrap();
    let engine = engine_for(&env, Some("de-DE"), None);

    let report = engine.install(&[all_templates(&env)]).await.unwrap();
    assert_eq!(report.caches_written, vec![Some("de-DE".to_string()), None]);
    assert!(env.base_dir.join("de-DE.templatecache.json").is_file());
    assert!(env.base_dir.join("templatecache.json").is_file());

    let german = engine.template_cache().unwrap();
    assert_eq!(german.template_info[0].name, "Konsolenanwendung");

    let neutral = TemplateCache::load_for_current_locale(&env.loader()).unwrap();
    assert_eq!(neutral.template_info[0].name, "Console App");
    assert!(neutral.template_info[0].locale_config_place.is_none());
}

#[tokio::test]
async fn test_separate_installs_accumulate() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("A", "Alpha").write(&env.path("first/a")).unwrap();
    TemplateFixture::new("B", "Beta").write(&env.path("second/b")).unwrap();
    let engine = engine_for(&env, None, None);

    engine.install(&[env.path("first").display().to_string()]).await.unwrap();
    engine.install(&[env.path("second").display().to_string()]).await.unwrap();

    let cache = engine.template_cache().unwrap();
    assert_eq!(identities(&cache), vec!["A", "B"]);
}

#[tokio::test]
async fn test_reinstall_replaces_changed_template() {
    let env = TestEnvironment::new().unwrap();
    let dir = env.templates_dir().join("console");
    TemplateFixture::new("Console", "Console App").write(&dir).unwrap();
    let engine = engine_for(&env, None, None);
    engine.install(&[all_templates(&env)]).await.unwrap();

    TemplateFixture::new("Console", "Console Application").write(&dir).unwrap();
    engine.install(&[all_templates(&env)]).await.unwrap();

    let cache = engine.template_cache().unwrap();
    assert_eq!(cache.template_info.len(), 1);
    assert_eq!(cache.template_info[0].name, "Console Application");
}

#[tokio::test]
async fn test_install_archive() {
    let env = TestEnvironment::new().unwrap();
    let entries = TemplateFixture::new("Zipped.Web", "Zipped Web").archive_entries("content/web");
    let borrowed: Vec<(&str, &[u8])> =
        entries.iter().map(|(name, content)| (name.as_str(), content.as_slice())).collect();
    let archive = env.write_file("downloads/web.nupkg", zip_bytes(&borrowed)).unwrap();
    let engine = engine_for(&env, None, None);

    let report = engine.install(&[archive.display().to_string()]).await.unwrap();
    assert_eq!(report.scanned.templates()[0].identity, "Zipped.Web");
    assert!(env.base_dir.join("packages/web.nupkg").is_file());

    let cache = engine.template_cache().unwrap();
    assert_eq!(identities(&cache), vec!["Zipped.Web"]);
}

#[tokio::test]
async fn test_new_locale_is_seeded_from_neutral_cache() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("A", "Alpha").write(&env.templates_dir().join("a")).unwrap();
    engine_for(&env, None, None).install(&[all_templates(&env)]).await.unwrap();
    assert!(!env.base_dir.join("fr-FR.templatecache.json").exists());

    let french = engine_for(&env, Some("fr-FR"), None);
    let cache = french.template_cache().unwrap();
    assert_eq!(identities(&cache), vec!["A"]);
    assert!(env.base_dir.join("fr-FR.templatecache.json").is_file());
}

#[tokio::test]
async fn test_missing_path_is_reported_without_failing() {
    let env = TestEnvironment::new().unwrap();
    TemplateFixture::new("A", "Alpha").write(&env.templates_dir().join("a")).unwrap();
    let engine = engine_for(&env, None, None);
    let missing = env.path("does-not-exist").display().to_string();

    let report = engine.install(&[missing, all_templates(&env)]).await.unwrap();
    assert_eq!(report.scanned.templates().len(), 1);

    let errors = engine.environment().host().non_critical_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].context.contains("does-not-exist"));
}
