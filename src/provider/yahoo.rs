//! Chart endpoint client for current prices.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{instrument, trace};

use super::error::FeedError;
use super::traits::PriceSource;
use super::types::{ChartResponse, PriceQuote, Symbol};
use crate::config::ProviderConfig;
use crate::utils::decimal::from_f64;

/// Price client backed by the `/v8/finance/chart/{symbol}` endpoint.
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client from provider configuration.
    ///
    /// `call_timeout` is applied at the transport level to every request.
    pub fn new(config: &ProviderConfig, call_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(call_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.price_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client against a custom base URL with default settings.
    pub fn with_base_url(base_url: &str, call_timeout: Duration) -> Result<Self> {
        let config = ProviderConfig {
            price_base_url: base_url.to_string(),
            ..ProviderConfig::default()
        };
        Self::new(&config, call_timeout)
    }

    fn chart_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        )
    }
}

/// Turn a parsed chart response into a quote.
fn quote_from_chart(symbol: &Symbol, chart: ChartResponse) -> Result<PriceQuote, FeedError> {
    let meta = chart
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| FeedError::Malformed(format!("empty chart result for {symbol}")))?;

    let current_price = meta
        .regular_market_price
        .and_then(from_f64)
        .ok_or_else(|| FeedError::Malformed(format!("missing market price for {symbol}")))?;

    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .and_then(from_f64)
        .unwrap_or(Decimal::ZERO);

    let volume = meta
        .regular_market_volume
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0);

    PriceQuote::new(symbol.clone(), current_price, previous_close, volume, Utc::now())
}

#[async_trait]
impl PriceSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self), fields(symbol = %symbol), name = "yahoo_fetch_quote")]
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FeedError> {
        let response = self.http.get(self.chart_url(symbol)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let chart: ChartResponse = serde_json::from_str(&body)
            .map_err(|e| FeedError::Malformed(format!("chart body: {e}")))?;

        let quote = quote_from_chart(symbol, chart)?;
        trace!(price = %quote.current_price, change_pct = %quote.change_pct, "Parsed quote");
        Ok(quote)
    }
}
