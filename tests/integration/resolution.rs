use crate::{all_templates, engine_for};
use scaffold_cli::engine::{Engine, Resolution};
use scaffold_cli::resolution::help::resolution_help;
use scaffold_cli::resolution::{SingularInvokableMatchStatus, TemplateQuery};
use scaffold_cli::test_utils::{TemplateFixture, TestEnvironment};

async fn install(env: &TestEnvironment, engine: &Engine, fixtures: &[(&str, TemplateFixture)]) {
    for (dir, fixture) in fixtures {
        fixture.write(&env.templates_dir().join(dir)).unwrap();
    }
    engine.install(&[all_templates(env)]).await.unwrap();
}

fn resolved_identity(engine: &Engine, query: &TemplateQuery) -> String {
    match engine.resolve(query).unwrap() {
        Resolution::Template(info) => info.identity,
        Resolution::Unresolved(status) => panic!("unresolved: {status:?}"),
    }
}

fn web(identity: &str, language: &str) -> TemplateFixture {
    TemplateFixture::new(identity, "Web Application").short_name("web").group("Web").language(language)
}

#[tokio::test]
async fn test_highest_precedence_in_group_wins() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, None);
    install(
        &env,
        &engine,
        &[
            ("v1", TemplateFixture::new("Lib.V1", "Class Library").short_name("classlib").group("Lib").precedence(100)),
            ("v3", TemplateFixture::new("Lib.V3", "Class Library").short_name("classlib").group("Lib").precedence(300)),
            ("v2", TemplateFixture::new("Lib.V2", "Class Library").short_name("classlib").group("Lib").precedence(200)),
        ],
    )
    .await;

    assert_eq!(resolved_identity(&engine, &TemplateQuery::named("classlib")), "Lib.V3");
}

#[tokio::test]
async fn test_explicit_language_selects_member() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, Some("C#"));
    install(&env, &engine, &[("cs", web("Web.CSharp", "C#")), ("fs", web("Web.FSharp", "F#"))]).await;

    let query = TemplateQuery {
        language: Some("f#".to_string()),
        ..TemplateQuery::named("web")
    };
    assert_eq!(resolved_identity(&engine, &query), "Web.FSharp");
}

#[tokio::test]
async fn test_default_language_ranks_best_list() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, Some("C#"));
    install(&env, &engine, &[("cs", web("Web.CSharp", "C#")), ("fs", web("Web.FSharp", "F#"))]).await;

    let (_, result) = engine.query(&TemplateQuery::named("web")).unwrap();
    let best: Vec<&str> = result.best_template_match_list().iter().map(|t| t.info.identity.as_str()).collect();
    assert_eq!(best, vec!["Web.CSharp"]);

    let suppressed = TemplateQuery {
        suppress_default_language_filter: true,
        ..TemplateQuery::named("web")
    };
    let (_, result) = engine.query(&suppressed).unwrap();
    assert_eq!(result.best_template_match_list().len(), 2);
}

#[tokio::test]
async fn test_same_short_name_in_two_groups_is_ambiguous() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, None);
    install(
        &env,
        &engine,
        &[
            ("a", TemplateFixture::new("Contoso.Console", "Contoso Console").short_name("console")),
            ("b", TemplateFixture::new("Fabrikam.Console", "Fabrikam Console").short_name("console")),
        ],
    )
    .await;

    let query = TemplateQuery::named("console");
    assert!(matches!(
        engine.resolve(&query).unwrap(),
        Resolution::Unresolved(SingularInvokableMatchStatus::AmbiguousChoice)
    ));

    let (templates, result) = engine.query(&query).unwrap();
    let help = resolution_help(Some("console"), &result, &templates).unwrap();
    assert!(help.contains("Contoso.Console: console"));
    assert!(help.contains("Fabrikam.Console: console"));
}

#[tokio::test]
async fn test_parameter_choice_disambiguates_groups() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, None);
    install(
        &env,
        &engine,
        &[
            (
                "modern",
                TemplateFixture::new("Api.Modern", "Web API").short_name("api").choice_parameter(
                    "Framework",
                    &[("net9.0", "Target .NET 9")],
                    "net9.0",
                ),
            ),
            (
                "legacy",
                TemplateFixture::new("Api.Legacy", "Web API").short_name("api").choice_parameter(
                    "Framework",
                    &[("net48", "Target .NET Framework 4.8")],
                    "net48",
                ),
            ),
        ],
    )
    .await;

    let query = TemplateQuery {
        parameters: vec![("Framework".to_string(), Some("net48".to_string()))],
        ..TemplateQuery::named("api")
    };
    assert_eq!(resolved_identity(&engine, &query), "Api.Legacy");
}

#[tokio::test]
async fn test_type_filter_limits_context() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, None);
    install(
        &env,
        &engine,
        &[
            ("project", TemplateFixture::new("Config.Project", "Config").short_name("config").type_tag("project")),
            ("item", TemplateFixture::new("Config.Item", "Config").short_name("config").type_tag("item")),
        ],
    )
    .await;

    let query = TemplateQuery {
        type_filter: Some("item".to_string()),
        ..TemplateQuery::named("config")
    };
    assert_eq!(resolved_identity(&engine, &query), "Config.Item");
}

#[tokio::test]
async fn test_unknown_name_suggests_close_names() {
    let env = TestEnvironment::new().unwrap();
    let engine = engine_for(&env, None, None);
    install(&env, &engine, &[("console", TemplateFixture::new("Console", "Console App").short_name("console"))])
        .await;

    let query = TemplateQuery::named("consle");
    let (templates, result) = engine.query(&query).unwrap();
    assert!(result.core_matched_templates().is_empty());
    assert!(result.using_context_matches());

    let help = resolution_help(query.name.as_deref(), &result, &templates).unwrap();
    assert!(help.contains("Did you mean: console?"));
}
