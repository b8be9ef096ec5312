// src/error.rs

use thiserror::Error as ThisError;

/// Everything that can go wrong while fetching, normalizing or exporting a series.
///
/// None of these are retried: the first error aborts the whole request.
#[derive(ThisError, Debug)]
pub enum ScrapeError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("malformed document at {url}: {reason}")]
    MalformedDocument { url: String, reason: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot parse {value:?}: {reason}")]
    ValueParse { value: String, reason: String },

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("output error: {0}")]
    Output(String),
}

impl ScrapeError {
    pub(crate) fn malformed(url: impl ToString, reason: impl Into<String>) -> Self {
        ScrapeError::MalformedDocument {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn value_parse(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ScrapeError::ValueParse {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        ScrapeError::Transport {
            url,
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ScrapeError {
    fn from(err: serde_yaml::Error) -> Self {
        ScrapeError::Config(format!("registry yaml: {}", err))
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        ScrapeError::Output(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for ScrapeError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ScrapeError::Output(format!("arrow: {}", err))
    }
}

impl From<parquet::errors::ParquetError> for ScrapeError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        ScrapeError::Output(format!("parquet: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
