//! One engine session: configuration, settings and the operations the CLI drives.

use crate::components::ComponentCatalog;
use crate::config::EngineConfig;
use crate::environment::EngineEnvironment;
use crate::installer::{InstallReport, Installer, RestoreOptions};
use crate::resolution::{SingularInvokableMatchStatus, TemplateListResolutionResult, TemplateListResolver, TemplateQuery};
use crate::settings::SettingsLoader;
use crate::template::{Template, TemplateInfo};
use crate::template_cache::{TemplateCache, TemplateCacheManager};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Outcome of resolving a query to a single template.
#[derive(Debug)]
pub enum Resolution {
    /// Exactly one template to invoke
    Template(Box<TemplateInfo>),
    /// Nothing or too much matched; the result explains which
    Unresolved(SingularInvokableMatchStatus),
}

/// The engine behind the `scaffold` binary.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    loader: SettingsLoader,
}

impl Engine {
    /// Builds an engine over the physical file system.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let environment = Arc::new(EngineEnvironment::from_config(&config)?);
        Ok(Self::with_environment(config, environment))
    }

    /// Builds an engine over an existing environment.
    pub fn with_environment(config: EngineConfig, environment: Arc<EngineEnvironment>) -> Self {
        let loader = SettingsLoader::new(environment, ComponentCatalog::with_builtins());
        Self {
            config,
            loader,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &SettingsLoader {
        &self.loader
    }

    pub fn environment(&self) -> &EngineEnvironment {
        self.loader.environment()
    }

    /// Installs local paths and `name::version` packages.
    pub async fn install<S: AsRef<str>>(&self, requests: &[S]) -> Result<InstallReport> {
        self.loader.ensure_loaded()?;
        Installer::new(&self.loader, RestoreOptions::from_config(&self.config)).install_packages(requests).await
    }

    /// Cache of the current locale.
    pub fn template_cache(&self) -> Result<TemplateCache> {
        TemplateCache::load_for_current_locale(&self.loader)
    }

    /// Fills in the host's default language unless the query disables it.
    pub fn complete_query(&self, mut query: TemplateQuery) -> TemplateQuery {
        if query.default_language.is_none() {
            query.default_language = self.environment().host().default_language().map(str::to_string);
        }
        query
    }

    /// Runs `query` over the current-locale cache.
    ///
    /// Returns the cached templates together with the result, so callers can
    /// offer suggestions from the full list.
    pub fn query(&self, query: &TemplateQuery) -> Result<(Vec<TemplateInfo>, TemplateListResolutionResult)> {
        let templates = self.template_cache()?.template_info;
        let query = self.complete_query(query.clone());
        let result = TemplateListResolver::perform_core_template_query(&templates, &query);
        Ok((templates, result))
    }

    /// Resolves `query` to the one template to invoke.
    pub fn resolve(&self, query: &TemplateQuery) -> Result<Resolution> {
        let (_, result) = self.query(query)?;
        let (template, status) = result.singular_invokable_match();
        debug!("Resolved {:?}: {:?}", query.name, status);
        Ok(match template {
            Some(template) => Resolution::Template(Box::new(template.info.clone())),
            None => Resolution::Unresolved(status),
        })
    }

    /// Loads the config of a cached template through its generator and mounts.
    pub fn load_template(&self, info: &TemplateInfo) -> Result<Option<Template>> {
        self.loader.load_template(info)
    }

    /// Deletes every template cache document.
    pub fn clean_caches(&self) -> Result<()> {
        TemplateCacheManager::new(&self.loader).delete_all_locale_cache_files()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TemplateFixture, TestEnvironment};

    fn engine(env: &TestEnvironment) -> Engine {
        Engine::with_environment(EngineConfig::default(), env.environment())
    }

    #[tokio::test]
    async fn test_install_then_resolve() {
        let env = TestEnvironment::new().unwrap();
        TemplateFixture::new("Console.V1", "Console Application")
            .short_name("console")
            .group("Console")
            .precedence(1)
            .write(&env.templates_dir().join("v1"))
            .unwrap();
        TemplateFixture::new("Console.V2", "Console Application")
            .short_name("console")
            .group("Console")
            .precedence(2)
            .write(&env.templates_dir().join("v2"))
            .unwrap();

        let engine = engine(&env);
        let request = format!("{}/*", env.templates_dir().display());
        let report = engine.install(&[request]).await.unwrap();
        assert_eq!(report.scanned.templates().len(), 2);

        match engine.resolve(&TemplateQuery::named("console")).unwrap() {
            Resolution::Template(info) => assert_eq!(info.identity, "Console.V2"),
            Resolution::Unresolved(status) => panic!("unresolved: {status:?}"),
        }

        let info = engine.template_cache().unwrap().template_info.into_iter().find(|t| t.identity == "Console.V2");
        let template = engine.load_template(&info.unwrap()).unwrap().unwrap();
        assert_eq!(template.info.identity, "Console.V2");
    }

    #[tokio::test]
    async fn test_resolve_without_cache_is_no_match() {
        let env = TestEnvironment::new().unwrap();
        let engine = engine(&env);

        let resolution = engine.resolve(&TemplateQuery::named("console")).unwrap();
        assert!(matches!(resolution, Resolution::Unresolved(SingularInvokableMatchStatus::NoMatch)));
    }

    #[tokio::test]
    async fn test_clean_caches() {
        let env = TestEnvironment::new().unwrap();
        TemplateFixture::new("A", "Alpha").write(&env.templates_dir().join("a")).unwrap();
        let engine = engine(&env);
        engine.install(&[env.templates_dir().join("a").to_string_lossy().into_owned()]).await.unwrap();

        engine.clean_caches().unwrap();
        assert!(engine.template_cache().unwrap().template_info.is_empty());
    }
}
