use std::io::Write;
use std::sync::Mutex;

use docmap::config::{
    Config, EXTRACTION_RULES_ENV, load_extraction_rules, parse_extraction_rules,
};
use docmap::data_models::{JoinAs, RuleAction, RuleSource};
use docmap::Error;

const LIMIT_VARS: [&str; 6] = [
    "DOCMAP_MAX_TITLE_SIZE",
    "DOCMAP_MAX_BODY_SIZE",
    "DOCMAP_MAX_KEYWORDS_SIZE",
    "DOCMAP_MAX_DESCRIPTION_SIZE",
    "DOCMAP_MAX_INDEXED_LINKS_COUNT",
    "DOCMAP_MAX_HEADINGS_COUNT",
];

/// Tests touching process env hold this for their whole run.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets env vars for one test and removes every `DOCMAP_*` var on drop.
struct ScopedEnv;

impl ScopedEnv {
    fn set(vars: &[(&str, &str)]) -> Self {
        clear_docmap_env();
        for (key, value) in vars {
            unsafe { std::env::set_var(key, value) };
        }
        ScopedEnv
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        clear_docmap_env();
    }
}

fn clear_docmap_env() {
    for key in LIMIT_VARS.iter().chain([&EXTRACTION_RULES_ENV]) {
        unsafe { std::env::remove_var(key) };
    }
}

fn rules_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.max_title_size, 1_000);
    assert_eq!(config.max_body_size, 5 * 1024 * 1024);
    assert_eq!(config.max_keywords_size, 512);
    assert_eq!(config.max_description_size, 1_024);
    assert_eq!(config.max_indexed_links_count, 10);
    assert_eq!(config.max_headings_count, 10);
    assert!(config.extraction_rules.is_empty());
}

#[test]
fn test_load_extraction_rules_from_file() {
    let file = rules_file(
        r#"{
            "https://example.com": [
                { "action": "extract", "field_name": "author", "selector": ".byline a", "join_as": "array" },
                { "action": "set", "field_name": "section", "selector": "article", "value": "blog" }
            ],
            "docs.example.com": [
                { "action": "extract", "field_name": "version", "selector": "/v(\\d+)/", "source": "url" }
            ]
        }"#,
    );

    let rules = load_extraction_rules(file.path()).unwrap();
    let site = &rules["https://example.com"];
    assert_eq!(site.len(), 2);
    assert_eq!(site[0].field_name, "author");
    assert_eq!(site[0].join_as, JoinAs::Array);
    assert_eq!(site[1].action, RuleAction::Set);
    assert_eq!(site[1].value.as_deref(), Some("blog"));
    assert_eq!(rules["docs.example.com"][0].source, RuleSource::Url);

    let config = Config::default().with_extraction_rules(rules);
    let (site, site_rules) = config.rules_for("https://example.com").unwrap();
    assert_eq!(site, "https://example.com");
    assert_eq!(site_rules.len(), 2);
    assert!(config.rules_for("example.com").is_none());
}

#[test]
fn test_missing_rules_file() {
    let err = load_extraction_rules("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, Error::RulesFile { .. }));
}

#[test]
fn test_malformed_rules_json() {
    let err = parse_extraction_rules(r#"{ "https://example.com": { "oops": 1 } }"#).unwrap_err();
    assert!(matches!(err, Error::RulesFormat(_)));
}

#[test]
fn test_rule_cannot_shadow_schema_field() {
    let err = parse_extraction_rules(
        r#"{ "example.com": [ { "action": "extract", "field_name": "title", "selector": "h1" } ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRule { ref field_name, .. } if field_name == "title"));
}

#[test]
fn test_set_rule_needs_value() {
    let err = parse_extraction_rules(
        r#"{ "example.com": [ { "action": "set", "field_name": "kind", "selector": "h1" } ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRule { .. }));
}

#[test]
fn test_html_rule_needs_valid_selector() {
    let missing = parse_extraction_rules(
        r#"{ "example.com": [ { "action": "extract", "field_name": "author" } ] }"#,
    );
    assert!(matches!(missing, Err(Error::InvalidRule { .. })));

    let broken = parse_extraction_rules(
        r#"{ "example.com": [ { "action": "extract", "field_name": "author", "selector": "div[" } ] }"#,
    );
    assert!(matches!(broken, Err(Error::InvalidRule { .. })));
}

#[test]
fn test_blank_field_name_is_rejected() {
    let err = parse_extraction_rules(
        r#"{ "example.com": [ { "action": "extract", "field_name": "  ", "selector": "h1" } ] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRule { .. }));
}

#[test]
fn test_from_env_reads_every_limit() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _env = ScopedEnv::set(&[
        ("DOCMAP_MAX_TITLE_SIZE", "11"),
        ("DOCMAP_MAX_BODY_SIZE", "22"),
        ("DOCMAP_MAX_KEYWORDS_SIZE", "33"),
        ("DOCMAP_MAX_DESCRIPTION_SIZE", "44"),
        ("DOCMAP_MAX_INDEXED_LINKS_COUNT", "5"),
        ("DOCMAP_MAX_HEADINGS_COUNT", "6"),
        (EXTRACTION_RULES_ENV, "/definitely/not/here.json"),
    ]);

    let config = Config::from_env().unwrap();
    assert_eq!(config.max_title_size, 11);
    assert_eq!(config.max_body_size, 22);
    assert_eq!(config.max_keywords_size, 33);
    assert_eq!(config.max_description_size, 44);
    assert_eq!(config.max_indexed_links_count, 5);
    assert_eq!(config.max_headings_count, 6);
    // Limits only; the rules path is read by `Config::load`.
    assert!(config.extraction_rules.is_empty());
}

#[test]
fn test_from_env_unset_vars_use_defaults() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _env = ScopedEnv::set(&[("DOCMAP_MAX_HEADINGS_COUNT", "3")]);

    let config = Config::from_env().unwrap();
    assert_eq!(config.max_headings_count, 3);
    assert_eq!(config.max_title_size, 1_000);
    assert_eq!(config.max_body_size, 5 * 1024 * 1024);
}

#[test]
fn test_from_env_rejects_non_numeric_limit() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _env = ScopedEnv::set(&[("DOCMAP_MAX_BODY_SIZE", "abc")]);

    let err = Config::from_env().unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidLimit { ref key, ref value }
            if key == "DOCMAP_MAX_BODY_SIZE" && value == "abc"
    ));
}

#[test]
fn test_explicit_rules_path_overrides_env() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _env = ScopedEnv::set(&[(EXTRACTION_RULES_ENV, "/definitely/not/here.json")]);
    let file = rules_file(
        r#"{ "example.com": [ { "action": "extract", "field_name": "author", "selector": ".by" } ] }"#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.rules_for("example.com").unwrap().1.len(), 1);

    let err = Config::load(None).unwrap_err();
    assert!(matches!(err, Error::RulesFile { .. }));
}

#[test]
fn test_load_reads_rules_path_from_env() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let file = rules_file(r#"{ "https://example.com": [] }"#);
    let path = file.path().to_str().unwrap().to_string();
    let _env = ScopedEnv::set(&[(EXTRACTION_RULES_ENV, path.as_str())]);

    let config = Config::load(None).unwrap();
    assert!(config.rules_for("https://example.com").is_some());
}
