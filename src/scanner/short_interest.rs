//! Live short interest lookups with silent fallback.
//!
//! Provider payloads have no fixed schema. Fields are found by matching the
//! lower-cased key of every numeric entry against an ordered rule table; the
//! first rule that matches a key decides its field. Keys are visited in
//! payload order, so a later key overwrites an earlier one for the same field.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::provider::{FeedError, ShortInterestSource, ShortMetrics, Symbol};
use crate::utils::decimal::from_f64;

/// Metric a payload key can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    ShortInterest,
    Utilization,
    CostToBorrow,
    DaysToCover,
}

/// Ordered `(substring, field)` rules applied to lower-cased keys.
pub const FIELD_RULES: &[(&str, MetricField)] = &[
    ("short_interest", MetricField::ShortInterest),
    ("si", MetricField::ShortInterest),
    ("utilization", MetricField::Utilization),
    ("util", MetricField::Utilization),
    ("cost_to_borrow", MetricField::CostToBorrow),
    ("ctb", MetricField::CostToBorrow),
    ("days_to_cover", MetricField::DaysToCover),
    ("dtc", MetricField::DaysToCover),
];

/// Field a payload key maps to, if any.
pub fn match_field(key: &str) -> Option<MetricField> {
    let key = key.to_lowercase();
    FIELD_RULES
        .iter()
        .find(|(pattern, _)| key.contains(pattern))
        .map(|(_, field)| *field)
}

fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(from_f64)),
        _ => None,
    }
}

/// A zero reading counts as missing, matching how the provider reports gaps.
fn present(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

/// Extract live metrics from a payload.
///
/// Missing fields are derived from short interest only when short interest
/// itself is present and nonzero. Otherwise they stay unset, and a payload
/// that is not an object yields no fields at all.
pub fn extract_metrics(payload: &Value, origin: &str) -> ShortMetrics {
    let mut metrics = ShortMetrics::live(origin);
    let Some(object) = payload.as_object() else {
        return metrics;
    };

    for (key, value) in object {
        let Some(number) = numeric(value) else {
            continue;
        };
        match match_field(key) {
            Some(MetricField::ShortInterest) => metrics.short_interest_pct = Some(number),
            Some(MetricField::Utilization) => metrics.utilization_pct = Some(number),
            Some(MetricField::CostToBorrow) => metrics.cost_to_borrow_pct = Some(number),
            Some(MetricField::DaysToCover) => metrics.days_to_cover = Some(number),
            None => {}
        }
    }

    let Some(si) = present(metrics.short_interest_pct) else {
        return metrics;
    };

    if present(metrics.utilization_pct).is_none() {
        let derived = si.checked_mul(dec!(3.5)).map_or(dec!(95), |v| v.min(dec!(95)));
        metrics.utilization_pct = Some(derived);
    }
    if present(metrics.days_to_cover).is_none() {
        metrics.days_to_cover = Some((si * dec!(0.2)).max(dec!(0.8)));
    }
    if present(metrics.cost_to_borrow_pct).is_none() {
        metrics.cost_to_borrow_pct = Some((si * dec!(0.4)).max(dec!(1.0)));
    }

    metrics
}

/// Fetches live short interest for one symbol at a time.
#[derive(Clone)]
pub struct ShortInterestFeed {
    source: Arc<dyn ShortInterestSource>,
    call_timeout: Duration,
}

impl ShortInterestFeed {
    pub fn new(source: Arc<dyn ShortInterestSource>, call_timeout: Duration) -> Self {
        Self {
            source,
            call_timeout,
        }
    }

    /// Try each provider endpoint for `symbol` until one returns a JSON payload.
    ///
    /// The first payload decides the result even when it lacks short
    /// interest. A missing credential returns immediately. Every failure is
    /// absorbed.
    #[instrument(skip(self, credential), fields(symbol = %symbol))]
    pub async fn fetch(&self, symbol: &Symbol, credential: Option<&str>) -> Option<ShortMetrics> {
        let credential = credential.filter(|c| !c.trim().is_empty())?;

        for endpoint in self.source.endpoints(symbol) {
            let payload = match tokio::time::timeout(
                self.call_timeout,
                self.source.fetch_payload(&endpoint, credential),
            )
            .await
            {
                Ok(Ok(payload)) => payload,
                Ok(Err(e)) => {
                    debug!(%endpoint, kind = e.kind(), error = %e, "Short interest endpoint failed");
                    continue;
                }
                Err(_) => {
                    let e = FeedError::Timeout(self.call_timeout);
                    debug!(%endpoint, kind = e.kind(), "Short interest endpoint timed out");
                    continue;
                }
            };

            let metrics = extract_metrics(&payload, self.source.name());
            if metrics.is_complete() {
                info!(%endpoint, "Live short interest found");
            } else {
                debug!(%endpoint, "Live payload is missing short interest fields");
            }
            return Some(metrics);
        }

        None
    }
}
