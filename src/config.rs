use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dotenvy::dotenv;
use scraper::Selector;

use crate::data_models::{ExtractionRule, ExtractionRules, Field, RuleAction, RuleSource};
use crate::error::{Error, Result};

pub const DEFAULT_MAX_TITLE_SIZE: usize = 1_000;
pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_KEYWORDS_SIZE: usize = 512;
pub const DEFAULT_MAX_DESCRIPTION_SIZE: usize = 1_024;
pub const DEFAULT_MAX_INDEXED_LINKS_COUNT: usize = 10;
pub const DEFAULT_MAX_HEADINGS_COUNT: usize = 10;

pub const EXTRACTION_RULES_ENV: &str = "DOCMAP_EXTRACTION_RULES";

/// Settings for one crawl job. Built once, then shared read-only by every mapper.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bytes.
    pub max_title_size: usize,
    /// Bytes.
    pub max_body_size: usize,
    /// Bytes.
    pub max_keywords_size: usize,
    /// Bytes.
    pub max_description_size: usize,
    pub max_indexed_links_count: usize,
    pub max_headings_count: usize,
    pub extraction_rules: ExtractionRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_title_size: DEFAULT_MAX_TITLE_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_keywords_size: DEFAULT_MAX_KEYWORDS_SIZE,
            max_description_size: DEFAULT_MAX_DESCRIPTION_SIZE,
            max_indexed_links_count: DEFAULT_MAX_INDEXED_LINKS_COUNT,
            max_headings_count: DEFAULT_MAX_HEADINGS_COUNT,
            extraction_rules: ExtractionRules::new(),
        }
    }
}

impl Config {
    /// Reads the size limits from the environment (a `.env` file is honoured).
    /// Unset variables fall back to the defaults. Extraction rules are left
    /// empty; see [`Config::load`].
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Ok(Config {
            max_title_size: get_limit_or_default("DOCMAP_MAX_TITLE_SIZE", DEFAULT_MAX_TITLE_SIZE)?,
            max_body_size: get_limit_or_default("DOCMAP_MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE)?,
            max_keywords_size: get_limit_or_default(
                "DOCMAP_MAX_KEYWORDS_SIZE",
                DEFAULT_MAX_KEYWORDS_SIZE,
            )?,
            max_description_size: get_limit_or_default(
                "DOCMAP_MAX_DESCRIPTION_SIZE",
                DEFAULT_MAX_DESCRIPTION_SIZE,
            )?,
            max_indexed_links_count: get_limit_or_default(
                "DOCMAP_MAX_INDEXED_LINKS_COUNT",
                DEFAULT_MAX_INDEXED_LINKS_COUNT,
            )?,
            max_headings_count: get_limit_or_default(
                "DOCMAP_MAX_HEADINGS_COUNT",
                DEFAULT_MAX_HEADINGS_COUNT,
            )?,
            extraction_rules: ExtractionRules::new(),
        })
    }

    /// Limits from the environment plus extraction rules from `rules_path`,
    /// or from `DOCMAP_EXTRACTION_RULES` when no path is given. The env path
    /// is never read when an explicit one is passed.
    pub fn load(rules_path: Option<&Path>) -> Result<Self> {
        let config = Self::from_env()?;
        let rules_path = rules_path.map(Path::to_path_buf).or_else(rules_path_from_env);
        match rules_path {
            Some(path) => Ok(config.with_extraction_rules(load_extraction_rules(path)?)),
            None => Ok(config),
        }
    }

    pub fn with_extraction_rules(mut self, rules: ExtractionRules) -> Self {
        self.extraction_rules = rules;
        self
    }

    /// Rules stored under exactly `site`, with the stored key.
    pub fn rules_for(&self, site: &str) -> Option<(&str, &[ExtractionRule])> {
        self.extraction_rules
            .get_key_value(site)
            .map(|(key, rules)| (key.as_str(), rules.as_slice()))
    }
}

pub fn rules_path_from_env() -> Option<PathBuf> {
    env::var_os(EXTRACTION_RULES_ENV).map(PathBuf::from)
}

fn get_limit_or_default(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(value) => parse_limit(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_limit(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| Error::InvalidLimit {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Loads `{ "<site>": [rule, ...] }` from a JSON file and validates every rule.
pub fn load_extraction_rules(path: impl AsRef<Path>) -> Result<ExtractionRules> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| Error::RulesFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_extraction_rules(&raw)
}

pub fn parse_extraction_rules(raw: &str) -> Result<ExtractionRules> {
    let rules: ExtractionRules = serde_json::from_str(raw)?;
    for (site, site_rules) in &rules {
        for rule in site_rules {
            validate_rule(site, rule)?;
        }
    }
    Ok(rules)
}

fn validate_rule(site: &str, rule: &ExtractionRule) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidRule {
        site: site.to_string(),
        field_name: rule.field_name.clone(),
        reason: reason.to_string(),
    };

    if rule.field_name.trim().is_empty() {
        return Err(invalid("field_name must not be blank"));
    }
    if Field::from_name(&rule.field_name).is_some() {
        return Err(invalid("field_name collides with a built-in document field"));
    }
    if rule.action == RuleAction::Set && rule.value.is_none() {
        return Err(invalid("set rules need a value"));
    }
    if rule.source == RuleSource::Html {
        if rule.selector.trim().is_empty() {
            return Err(invalid("html rules need a selector"));
        }
        Selector::parse(&rule.selector)
            .map_err(|e| invalid(&format!("bad selector {:?}: {e}", rule.selector)))?;
    }
    Ok(())
}
