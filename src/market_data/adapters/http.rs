// REST order book source, e.g. GET https://api.rhino.fi/bfx/v2/book/tETHUSD/R0

use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::{debug, instrument};

use super::{BookSource, FetchError, SourceError};
use crate::market_data::normaliser::{OrderBookNormaliser, RawOrderRecord};

#[derive(Debug, Clone)]
pub struct HttpBookSource {
    client: reqwest::Client,
    endpoint: String,
    symbol: String,
}

impl HttpBookSource {
    pub fn new(endpoint: &str, symbol: &str, timeout: Duration) -> reqwest::Result<Self> {
        // redirects surface as a status so they can be reported as misconfiguration
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(concat!("lobx-mm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint: endpoint.to_string(), symbol: symbol.to_string() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_body(&self) -> Result<Vec<u8>, FetchError> {
        let res = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.endpoint, e))?;

        let status = res.status();
        if status.is_redirection() {
            return Err(FetchError::Redirect { url: self.endpoint.clone() });
        }
        if !status.is_success() {
            return Err(FetchError::Status { url: self.endpoint.clone(), status: status.as_u16() });
        }

        let body = res.bytes().await.map_err(|e| FetchError::from_reqwest(&self.endpoint, e))?;
        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl BookSource for HttpBookSource {
    #[instrument(level = "debug", skip(self), fields(symbol = %self.symbol))]
    async fn fetch(&self) -> Result<Vec<RawOrderRecord>, SourceError> {
        let body = self.get_body().await?;
        debug!(bytes = body.len(), "fetched order book");
        Ok(OrderBookNormaliser::new().decode(&body)?)
    }

    fn describe(&self) -> String {
        format!("{} via {}", self.symbol, self.endpoint)
    }
}
