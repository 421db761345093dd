//! End-to-end scan: plan, select, price, enrich, score, rank, calibrate.

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::planner::{Calibration, ScanPlan, ScanPlanner};
use super::price_feed::PriceFeed;
use super::scoring::{RiskFactor, RiskTier, ScoreBreakdown, ScoringEngine};
use super::short_interest::ShortInterestFeed;
use super::synthetic::SyntheticEstimator;
use crate::config::Config;
use crate::provider::{PriceQuote, PriceSource, ShortInterestSource, ShortMetrics, Symbol};
use crate::universe::TickerUniverse;
use crate::utils::decimal::round_to_precision;

/// Caller-supplied scan filters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScanFilters {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub max_tickers: Option<usize>,
    /// Advisory only; results are never filtered by it here.
    #[serde(default)]
    pub min_score: Option<u32>,
}

/// One scored symbol.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Normalized ticker (e.g., "GME")
    pub symbol: Symbol,
    /// Floored component sum, clamped to 0..=100
    pub total_score: u32,
    /// Risk band for `total_score`, or `Error` when scoring failed
    pub risk_tier: RiskTier,
    /// Human-readable label for `risk_tier`
    pub risk_description: &'static str,
    /// Threshold flags, empty for an `Error` result
    pub risk_factors: Vec<RiskFactor>,
    /// Per-component contributions, all zero for an `Error` result
    pub score_breakdown: ScoreBreakdown,
    /// Price snapshot the momentum component was taken from
    pub price: PriceQuote,
    /// Metrics the score was computed from
    pub short_metrics: ShortMetrics,
    /// `"live"` or `"synthetic"`, mirroring `short_metrics.source`
    pub data_source: &'static str,
    /// When this symbol was scored
    pub computed_at: DateTime<Utc>,
}

/// Coarse label for how long a scan took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Acceptable,
}

impl PerformanceRating {
    pub fn from_elapsed(seconds: Decimal) -> Self {
        if seconds < Decimal::from(15) {
            PerformanceRating::Excellent
        } else if seconds < Decimal::from(30) {
            PerformanceRating::Good
        } else {
            PerformanceRating::Acceptable
        }
    }
}

/// Counters and timing for one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    /// Symbols selected after planning
    pub requested_count: usize,
    /// Symbols that came back with a price before the deadline
    pub fetched_count: usize,
    /// Symbols scored and returned
    pub analyzed_count: usize,
    /// Returned results scored from live short interest
    pub live_data_count: usize,
    /// Wall time of the scan, rounded to one decimal
    #[serde(with = "rust_decimal::serde::float")]
    pub elapsed_seconds: Decimal,
    /// Coarse band for `elapsed_seconds`
    pub performance_rating: PerformanceRating,
    /// Highest score in the batch, 0 when empty
    pub top_score: u32,
    /// When the scan finished
    pub completed_at: DateTime<Utc>,
}

/// Everything a finished scan produces.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub results: Vec<ScanResult>,
    pub stats: ScanStats,
    pub plan: ScanPlan,
}

/// Runs scans against a fixed set of collaborators.
pub struct ScanOrchestrator {
    universe: TickerUniverse,
    planner: ScanPlanner,
    calibration: Calibration,
    prices: PriceFeed,
    short_interest: Option<ShortInterestFeed>,
    estimator: SyntheticEstimator,
    scoring: ScoringEngine,
    default_max_tickers: usize,
    live_lookup_max_priced: usize,
    live_lookup_limit: usize,
    default_credential: Option<String>,
}

impl ScanOrchestrator {
    pub fn new(
        config: &Config,
        price_source: Arc<dyn PriceSource>,
        short_interest_source: Option<Arc<dyn ShortInterestSource>>,
    ) -> Self {
        Self {
            universe: TickerUniverse::builtin(),
            planner: ScanPlanner::from_config(config),
            calibration: Calibration::from_config(config),
            prices: PriceFeed::from_config(price_source, &config.scan),
            short_interest: short_interest_source
                .map(|source| ShortInterestFeed::new(source, config.scan.short_interest_timeout())),
            estimator: SyntheticEstimator::new(),
            scoring: ScoringEngine::new(),
            default_max_tickers: config.scan.default_max_tickers,
            live_lookup_max_priced: config.scan.live_lookup_max_priced,
            live_lookup_limit: config.scan.live_lookup_limit,
            default_credential: config.short_interest_credential().map(str::to_string),
        }
    }

    pub fn with_universe(mut self, universe: TickerUniverse) -> Self {
        self.universe = universe;
        self
    }

    pub fn with_estimator(mut self, estimator: SyntheticEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Share calibration with other orchestrators.
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn universe(&self) -> &TickerUniverse {
        &self.universe
    }

    pub fn planner(&self) -> &ScanPlanner {
        &self.planner
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Request credential if non-empty, else the configured one.
    fn resolve_credential<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.default_credential.as_deref())
    }

    /// Live metrics for the first few priced symbols, when the batch is small
    /// enough to afford sequential lookups.
    async fn live_metrics(
        &self,
        priced: &[(Symbol, PriceQuote)],
        credential: Option<&str>,
    ) -> HashMap<Symbol, ShortMetrics> {
        let mut live = HashMap::new();

        let (Some(feed), Some(credential)) = (&self.short_interest, credential) else {
            debug!("No short interest credential, skipping live lookups");
            return live;
        };
        if priced.len() > self.live_lookup_max_priced {
            debug!(
                priced = priced.len(),
                max = self.live_lookup_max_priced,
                "Batch too large for live short interest lookups"
            );
            return live;
        }

        for (symbol, _) in priced.iter().take(self.live_lookup_limit) {
            if let Some(metrics) = feed.fetch(symbol, Some(credential)).await {
                if !metrics.is_complete() {
                    warn!(%symbol, "Live short interest is incomplete, symbol will score as an error");
                }
                live.insert(symbol.clone(), metrics);
            }
        }
        live
    }

    /// Run one scan.
    ///
    /// Fails only on invalid input. Provider problems shrink the result set
    /// instead.
    #[instrument(skip(self, credential))]
    pub async fn run(&self, credential: Option<&str>, filters: &ScanFilters) -> Result<ScanOutcome> {
        let requested = filters.max_tickers.unwrap_or(self.default_max_tickers);
        ensure!(requested > 0, "max_tickers must be a positive integer");

        let started = Instant::now();

        let avg_time_per_symbol = self.calibration.avg_time_per_symbol().await;
        let plan = self.planner.plan(requested, avg_time_per_symbol);

        let mut selected = self.universe.select(filters.categories.as_deref());
        selected.truncate(plan.optimal_size);
        info!(
            requested,
            optimal_size = plan.optimal_size,
            selected = selected.len(),
            "Starting scan"
        );

        let mut quotes = self.prices.fetch(&selected).await;
        let priced: Vec<(Symbol, PriceQuote)> = selected
            .iter()
            .filter_map(|symbol| quotes.remove(symbol).map(|quote| (symbol.clone(), quote)))
            .collect();
        let fetched_count = priced.len();

        let mut live = self
            .live_metrics(&priced, self.resolve_credential(credential))
            .await;

        let mut results: Vec<ScanResult> = priced
            .into_iter()
            .map(|(symbol, quote)| {
                let metrics = live.remove(&symbol).unwrap_or_else(|| {
                    self.estimator
                        .estimate(&symbol, &self.universe.categories_of(&symbol))
                });
                let card = self.scoring.score(&metrics, &quote);
                ScanResult {
                    data_source: metrics.source.label(),
                    risk_description: card.risk_tier.description(),
                    symbol,
                    total_score: card.total_score,
                    risk_tier: card.risk_tier,
                    risk_factors: card.risk_factors,
                    score_breakdown: card.breakdown,
                    price: quote,
                    short_metrics: metrics,
                    computed_at: Utc::now(),
                }
            })
            .collect();

        // Stable, so ties keep selection order
        results.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        let live_data_count = results.iter().filter(|r| r.short_metrics.is_live()).count();

        let elapsed = started.elapsed();
        self.calibration.record(elapsed, results.len()).await;

        let elapsed_seconds = round_to_precision(
            Decimal::from_i128_with_scale(elapsed.as_millis() as i128, 3),
            1,
        );
        let stats = ScanStats {
            requested_count: selected.len(),
            fetched_count,
            analyzed_count: results.len(),
            live_data_count,
            elapsed_seconds,
            performance_rating: PerformanceRating::from_elapsed(elapsed_seconds),
            top_score: results.first().map(|r| r.total_score).unwrap_or(0),
            completed_at: Utc::now(),
        };

        info!(
            analyzed = stats.analyzed_count,
            live = stats.live_data_count,
            top_score = stats.top_score,
            elapsed_secs = %stats.elapsed_seconds,
            "Scan complete"
        );

        Ok(ScanOutcome {
            results,
            stats,
            plan,
        })
    }
}
