use std::time::Duration;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Must set environment variable {0}")]
    MissingConfig(&'static str),

    #[error("Failed to load configuration")]
    Config(#[from] config::ConfigError),

    #[error("Failed to fetch vehicle positions")]
    Fetch(#[from] reqwest::Error),

    #[error("Feed API returned error status: {0}")]
    FeedStatus(reqwest::StatusCode),

    #[error("Failed to parse FeedMessage")]
    Decode(#[from] prost::DecodeError),

    #[error("Failed to connect to MongoDB")]
    Connect(#[source] mongodb::error::Error),

    #[error("Timed out connecting to MongoDB after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Failed to encode entity #{index}")]
    Encode {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("Insert data into collection <{namespace}> failed at entity #{index}")]
    Insert {
        index: usize,
        namespace: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
