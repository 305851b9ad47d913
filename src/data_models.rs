use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Fields of an indexable crawler document, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Url,
    UrlScheme,
    UrlHost,
    UrlPort,
    UrlPath,
    UrlPathDir1,
    UrlPathDir2,
    UrlPathDir3,
    LastCrawledAt,
    Title,
    BodyContent,
    MetaKeywords,
    MetaDescription,
    Links,
    Headings,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Url,
        Field::UrlScheme,
        Field::UrlHost,
        Field::UrlPort,
        Field::UrlPath,
        Field::UrlPathDir1,
        Field::UrlPathDir2,
        Field::UrlPathDir3,
        Field::LastCrawledAt,
        Field::Title,
        Field::BodyContent,
        Field::MetaKeywords,
        Field::MetaDescription,
        Field::Links,
        Field::Headings,
    ];

    pub const URL_PATH_DIRS: [Field; 3] =
        [Field::UrlPathDir1, Field::UrlPathDir2, Field::UrlPathDir3];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::UrlScheme => "url_scheme",
            Field::UrlHost => "url_host",
            Field::UrlPort => "url_port",
            Field::UrlPath => "url_path",
            Field::UrlPathDir1 => "url_path_dir1",
            Field::UrlPathDir2 => "url_path_dir2",
            Field::UrlPathDir3 => "url_path_dir3",
            Field::LastCrawledAt => "last_crawled_at",
            Field::Title => "title",
            Field::BodyContent => "body_content",
            Field::MetaKeywords => "meta_keywords",
            Field::MetaDescription => "meta_description",
            Field::Links => "links",
            Field::Headings => "headings",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Date(#[serde(serialize_with = "serialize_rfc3339")] DateTime<Utc>),
}

impl FieldValue {
    /// Blank: empty or whitespace-only text, or a list without a single non-blank entry.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|item| item.trim().is_empty()),
            FieldValue::Date(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(at: DateTime<Utc>) -> Self {
        FieldValue::Date(at)
    }
}

/// `2024-05-01T12:30:00+00:00`
pub fn format_rfc3339(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn serialize_rfc3339<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_rfc3339(at))
}

/// A flat, schema-ordered document ready for indexing. Never holds blank values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<Field, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from computed values, dropping absent and blank ones.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (Field, Option<FieldValue>)>,
    {
        fields
            .into_iter()
            .filter_map(|(field, value)| value.map(|value| (field, value)))
            .collect()
    }

    /// Combines two documents; on a key collision `other` wins.
    pub fn merge(mut self, other: Document) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn get_text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = Field> {
        self.fields.keys().copied()
    }
}

impl FromIterator<(Field, FieldValue)> for Document {
    fn from_iter<T: IntoIterator<Item = (Field, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .filter(|(_, value)| !value.is_blank())
                .collect(),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

/// Site key (base url, site url or host) -> ordered rules for that site.
pub type ExtractionRules = HashMap<String, Vec<ExtractionRule>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Pull the value out of the page with `selector`.
    Extract,
    /// Write the fixed `value` whenever `selector` matches.
    Set,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinAs {
    Array,
    #[default]
    String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    #[default]
    Html,
    Url,
}

/// A per-site, selector-based instruction for a custom document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub action: RuleAction,
    pub field_name: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub join_as: JoinAs,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub source: RuleSource,
}
