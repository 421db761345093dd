//! Short interest provider client.
//!
//! The provider exposes one short interest resource per listing venue. A
//! symbol's venue is not known up front, so each venue is tried in turn.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::FeedError;
use super::traits::ShortInterestSource;
use super::types::Symbol;
use crate::config::ProviderConfig;

/// Listing venues tried for every symbol, in order.
const VENUES: [&str; 2] = ["nasdaq", "nyse"];

/// Header carrying the provider credential.
const API_KEY_HEADER: &str = "Ortex-Api-Key";

/// Short interest client.
#[derive(Debug, Clone)]
pub struct OrtexClient {
    http: Client,
    base_url: String,
}

impl OrtexClient {
    /// Create a client from provider configuration.
    pub fn new(config: &ProviderConfig, call_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(call_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.short_interest_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client against a custom base URL with default settings.
    pub fn with_base_url(base_url: &str, call_timeout: Duration) -> Result<Self> {
        let config = ProviderConfig {
            short_interest_base_url: base_url.to_string(),
            ..ProviderConfig::default()
        };
        Self::new(&config, call_timeout)
    }
}

#[async_trait]
impl ShortInterestSource for OrtexClient {
    fn name(&self) -> &'static str {
        "ortex"
    }

    fn endpoints(&self, symbol: &Symbol) -> Vec<String> {
        let encoded = urlencoding::encode(symbol.as_str());
        VENUES
            .iter()
            .map(|venue| {
                format!(
                    "{}/api/v1/stock/{}/{}/short_interest",
                    self.base_url, venue, encoded
                )
            })
            .collect()
    }

    #[instrument(skip(self, credential), name = "ortex_fetch_payload")]
    async fn fetch_payload(&self, endpoint: &str, credential: &str) -> Result<Value, FeedError> {
        let response = self
            .http
            .get(endpoint)
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, credential)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(FeedError::ContentType(content_type));
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| FeedError::Malformed(format!("short interest body: {e}")))?;

        debug!(endpoint, "Received short interest payload");
        Ok(payload)
    }
}
