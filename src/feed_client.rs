use crate::config;
use crate::error::FeedError;
use crate::models::{
    candles_from_rows, AiVerdict, CandleSeries, ChainResponse, OptionChainSnapshot,
};
use anyhow::{Context, Result};
use reqwest::{header, Client};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::debug;

/// The three read-only feeds keyed by ticker
pub trait DataFeed {
    fn fetch_chain(&self, ticker: &str) -> impl Future<Output = Result<OptionChainSnapshot, FeedError>> + Send;

    fn fetch_candles(&self, ticker: &str) -> impl Future<Output = Result<CandleSeries, FeedError>> + Send;

    fn fetch_verdict(&self, ticker: &str) -> impl Future<Output = Result<AiVerdict, FeedError>> + Send;
}

// -----------------------------------------------
// HTTP CLIENT FOR THE FLOW SERVICE
// -----------------------------------------------
pub struct HttpDataFeed {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl HttpDataFeed {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into(),
            max_retries: config::RETRY_MAX_ATTEMPTS,
        })
    }

    /// Retries after the first attempt; zero fails on the first error
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET with retry on transport errors, 429 and 5xx. Client errors fail fast.
    async fn fetch_json(&self, url: &str) -> Result<String, FeedError> {
        // tokio-retry raises the base to the n-th power: 2^n * 50ms = 100, 200, 400ms
        let backoff = ExponentialBackoff::from_millis(config::RETRY_FACTOR)
            .factor(config::RETRY_BASE_DELAY_MS / config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(self.max_retries);

        RetryIf::spawn(
            backoff,
            || async {
                let res = self.client.get(url).send().await?;
                let status = res.status();

                if !status.is_success() {
                    let body = res.text().await.unwrap_or_default();
                    let preview: String = body.chars().take(200).collect();
                    debug!(url, status = status.as_u16(), "feed request failed");
                    return Err(FeedError::Status(status.as_u16(), preview));
                }

                let text = res.text().await?;

                // Validate JSON
                let trimmed = text.trim();
                if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                    let preview: String = text.chars().take(200).collect();
                    return Err(FeedError::NonJsonResponse(preview));
                }

                Ok(text)
            },
            |e: &FeedError| e.is_retryable(),
        )
        .await
    }
}

impl DataFeed for HttpDataFeed {
    async fn fetch_chain(&self, ticker: &str) -> Result<OptionChainSnapshot, FeedError> {
        let url = config::options_url(&self.base_url, ticker);
        let text = self.fetch_json(&url).await?;
        let response: ChainResponse = serde_json::from_str(&text)?;

        Ok(OptionChainSnapshot::from_response(ticker, response))
    }

    async fn fetch_candles(&self, ticker: &str) -> Result<CandleSeries, FeedError> {
        let url = config::candles_url(&self.base_url, ticker);
        let text = self.fetch_json(&url).await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        let total = rows.len();

        let candles = candles_from_rows(rows);
        if candles.len() < total {
            debug!(ticker, dropped = total - candles.len(), "unreadable candle rows");
        }
        Ok(candles)
    }

    async fn fetch_verdict(&self, ticker: &str) -> Result<AiVerdict, FeedError> {
        let url = config::verdict_url(&self.base_url, ticker);
        let text = self.fetch_json(&url).await?;

        Ok(serde_json::from_str(&text)?)
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        let feed = HttpDataFeed::new("http://localhost:8000").unwrap();
        assert_eq!(feed.base_url(), "http://localhost:8000");
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_request_error() {
        // bind then release a port so nothing is listening on it
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let feed = HttpDataFeed::new(format!("http://{}", addr)).unwrap().with_max_retries(0);

        let err = feed.fetch_chain("SPY").await.unwrap_err();
        assert!(matches!(err, FeedError::Request(_)));
    }

    #[tokio::test]
    async fn test_response_classification() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let router = axum::Router::new()
            .route("/options/{ticker}", get(|| async { (StatusCode::NOT_FOUND, "unknown ticker") }))
            .route("/ai/{ticker}", get(|| async { "<html>maintenance</html>" }))
            .route("/candles/{ticker}", get(|| async { r#"[{"Datetime": null}, null]"# }));
        let feed = HttpDataFeed::new(serve(router).await).unwrap().with_max_retries(0);

        let err = feed.fetch_chain("SPY").await.unwrap_err();
        assert!(matches!(err, FeedError::Status(404, ref body) if body == "unknown ticker"));

        let err = feed.fetch_verdict("SPY").await.unwrap_err();
        assert!(matches!(err, FeedError::NonJsonResponse(_)));

        // unreadable rows are dropped, not fatal
        assert!(feed.fetch_candles("SPY").await.unwrap().is_empty());
    }
}
