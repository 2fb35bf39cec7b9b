// Shared trait + errors for order book sources

use thiserror::Error;

use crate::market_data::normaliser::{DataError, RawOrderRecord};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} tried to redirect, endpoint is misconfigured")]
    Redirect { url: String },
    #[error("cannot connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    // A bad endpoint or unreachable host won't fix itself between cycles.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Redirect { .. } | FetchError::Connect { .. })
    }

    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_redirect() {
            FetchError::Redirect { url }
        } else if let Some(status) = err.status() {
            FetchError::Status { url, status: status.as_u16() }
        } else if err.is_connect() {
            FetchError::Connect { url, source: err }
        } else {
            FetchError::Body { url, source: err }
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Data(#[from] DataError),
}

#[async_trait::async_trait]
pub trait BookSource: Send + Sync {
    /// One full snapshot of the exchange book as raw records.
    async fn fetch(&self) -> Result<Vec<RawOrderRecord>, SourceError>;

    fn describe(&self) -> String;
}

pub mod http;
