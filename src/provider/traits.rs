//! Provider-agnostic traits for the two data sources a scan consumes.
//!
//! - [`PriceSource`]: current price, previous close, and volume per symbol
//! - [`ShortInterestSource`]: raw short interest payloads per symbol
//!
//! Implementations only translate between the wire and these types; timeouts,
//! concurrency limits, and fallback live in the scan pipeline.

use async_trait::async_trait;
use serde_json::Value;

use super::error::FeedError;
use super::types::{PriceQuote, Symbol};

/// Source of current price data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fetch a single quote. Malformed data must be reported as an error,
    /// never as a partially filled quote.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FeedError>;
}

/// Source of live short interest payloads.
///
/// The payload schema is not fixed; callers extract fields by key matching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortInterestSource: Send + Sync {
    /// Identifier used in logs and recorded as the metrics origin.
    fn name(&self) -> &'static str;

    /// Endpoints to try for a symbol, in order.
    fn endpoints(&self, symbol: &Symbol) -> Vec<String>;

    /// Fetch one endpoint and return its JSON body.
    async fn fetch_payload(&self, endpoint: &str, credential: &str) -> Result<Value, FeedError>;
}
