use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),

    #[error("store at {path} is corrupted: {source}")]
    Corruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode store contents: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("weather request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected weather payload: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(err) => err.is_timeout() || err.is_connect(),
            // 429 is not retried, the rate window paces requests
            ProviderError::Status { status, .. } => *status >= 500 || *status == 408,
            ProviderError::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config:\n - {}", .0.join("\n - "))]
    Invalid(Vec<String>),
}
