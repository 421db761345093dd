//! Market data types shared by providers and the scan pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::error::FeedError;
use crate::utils::decimal::{percentage_change, round_to_precision};

/// Ticker symbol, trimmed and upper-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Current price snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub symbol: Symbol,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub previous_close: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub change_pct: Decimal,
    pub volume: u64,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote from raw provider values.
    ///
    /// A zero previous close yields zero change. Negative prices are rejected.
    pub fn new(
        symbol: Symbol,
        current_price: Decimal,
        previous_close: Decimal,
        volume: u64,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, FeedError> {
        if current_price < Decimal::ZERO {
            return Err(FeedError::Malformed(format!(
                "negative price {current_price} for {symbol}"
            )));
        }
        if previous_close < Decimal::ZERO {
            return Err(FeedError::Malformed(format!(
                "negative previous close {previous_close} for {symbol}"
            )));
        }

        let change = if previous_close.is_zero() {
            Decimal::ZERO
        } else {
            current_price - previous_close
        };
        let change_pct = percentage_change(current_price, previous_close).ok_or_else(|| {
            FeedError::Malformed(format!(
                "change from {previous_close} to {current_price} overflows for {symbol}"
            ))
        })?;

        Ok(Self {
            symbol,
            current_price: round_to_precision(current_price, 2),
            previous_close,
            change: round_to_precision(change, 2),
            change_pct: round_to_precision(change_pct, 2),
            volume,
            fetched_at,
        })
    }
}

/// Where a set of short interest metrics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// Short interest style metrics for a symbol.
///
/// Fields may be unset while a live payload is being decoded; anything handed
/// to scoring after backfill has all four populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortMetrics {
    #[serde(with = "rust_decimal::serde::float_option")]
    pub short_interest_pct: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub utilization_pct: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub cost_to_borrow_pct: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub days_to_cover: Option<Decimal>,
    pub source: DataSource,
    /// Provider or estimator that produced the values (e.g. "ortex", "profile")
    pub origin: String,
}

impl ShortMetrics {
    /// Empty live metrics, to be filled from a provider payload.
    pub fn live(origin: impl Into<String>) -> Self {
        Self {
            short_interest_pct: None,
            utilization_pct: None,
            cost_to_borrow_pct: None,
            days_to_cover: None,
            source: DataSource::Live,
            origin: origin.into(),
        }
    }

    /// Fully populated synthetic metrics.
    pub fn synthetic(
        short_interest_pct: Decimal,
        utilization_pct: Decimal,
        cost_to_borrow_pct: Decimal,
        days_to_cover: Decimal,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            short_interest_pct: Some(short_interest_pct),
            utilization_pct: Some(utilization_pct),
            cost_to_borrow_pct: Some(cost_to_borrow_pct),
            days_to_cover: Some(days_to_cover),
            source: DataSource::Synthetic,
            origin: origin.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.short_interest_pct.is_some()
            && self.utilization_pct.is_some()
            && self.cost_to_borrow_pct.is_some()
            && self.days_to_cover.is_some()
    }

    pub fn is_live(&self) -> bool {
        self.source == DataSource::Live
    }
}

// ==================== Chart Endpoint Types ====================

/// Top-level chart endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
}

/// Quote metadata attached to a chart result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    /// Some listings only carry the chart-relative close
    pub chart_previous_close: Option<f64>,
    pub regular_market_volume: Option<f64>,
}
