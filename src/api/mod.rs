//! Request and response documents exchanged with callers.
//!
//! A scan request is a JSON object with an optional credential and filters.
//! The response is either a success document carrying results, statistics,
//! and the batch plan, or a failure document with a single error message.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, instrument};

use crate::scanner::{ScanFilters, ScanOrchestrator, ScanOutcome, ScanPlan, ScanResult, ScanStats};

/// Incoming scan request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default, alias = "ortex_key")]
    pub credential: Option<String>,
    #[serde(default)]
    pub filters: ScanFilters,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSuccess {
    pub success: bool,
    pub scan_results: Vec<ScanResult>,
    pub scan_stats: ScanStats,
    pub optimization_info: ScanPlan,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub success: bool,
    pub error: String,
}

/// Response to a scan request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScanResponse {
    Success(ScanSuccess),
    Failure(ScanFailure),
}

impl ScanResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        ScanResponse::Failure(ScanFailure {
            success: false,
            error: error.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScanResponse::Success(_))
    }
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        let message = format!(
            "Optimized scan completed - {} tickers analyzed in {:.1}s",
            outcome.stats.analyzed_count, outcome.stats.elapsed_seconds
        );
        ScanResponse::Success(ScanSuccess {
            success: true,
            scan_results: outcome.results,
            scan_stats: outcome.stats,
            optimization_info: outcome.plan,
            message,
        })
    }
}

/// Run a scan and wrap the outcome in a response document.
#[instrument(skip_all)]
pub async fn handle_scan(orchestrator: &ScanOrchestrator, request: ScanRequest) -> ScanResponse {
    match orchestrator
        .run(request.credential.as_deref(), &request.filters)
        .await
    {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!(error = %e, "Scan failed");
            ScanResponse::failure(format!("{e:#}"))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_ticker_time: Decimal,
    pub max_safe_batch_size: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub timeout_threshold: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafeBatchSizes {
    pub small: &'static str,
    pub medium: &'static str,
    pub large: &'static str,
}

impl Default for SafeBatchSizes {
    fn default() -> Self {
        Self {
            small: "5-10 tickers (fast, reliable)",
            medium: "10-20 tickers (balanced)",
            large: "20+ tickers (use high min score)",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutPrevention {
    pub recommended_max: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_time_per_ticker: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationRecommendations {
    pub safe_batch_sizes: SafeBatchSizes,
    pub timeout_prevention: TimeoutPrevention,
}

/// Introspection document describing the scanner's current tuning.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub performance_metrics: PerformanceMetrics,
    pub ticker_universe: BTreeMap<String, usize>,
    pub total_tickers: usize,
    pub optimization_recommendations: OptimizationRecommendations,
}

impl PerformanceStats {
    pub async fn collect(orchestrator: &ScanOrchestrator) -> Self {
        let avg_ticker_time = orchestrator.calibration().avg_time_per_symbol().await;
        let max_safe_batch_size = orchestrator.planner().max_safe_batch_size();
        let universe = orchestrator.universe();

        Self {
            performance_metrics: PerformanceMetrics {
                avg_ticker_time,
                max_safe_batch_size,
                timeout_threshold: orchestrator.planner().timeout_budget_secs(),
            },
            ticker_universe: universe.sizes(),
            total_tickers: universe.master_list().len(),
            optimization_recommendations: OptimizationRecommendations {
                safe_batch_sizes: SafeBatchSizes::default(),
                timeout_prevention: TimeoutPrevention {
                    recommended_max: max_safe_batch_size,
                    estimated_time_per_ticker: avg_ticker_time,
                },
            },
        }
    }
}
