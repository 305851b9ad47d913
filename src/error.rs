use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The crawl result's URL could not be parsed. Fatal for the mapping call.
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid value {value:?} for {key}: expected a non-negative integer")]
    InvalidLimit { key: String, value: String },

    #[error("failed to read extraction rules from {}: {source}", path.display())]
    RulesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed extraction rules: {0}")]
    RulesFormat(#[from] serde_json::Error),

    #[error("invalid extraction rule for {site} (field {field_name:?}): {reason}")]
    InvalidRule {
        site: String,
        field_name: String,
        reason: String,
    },
}
