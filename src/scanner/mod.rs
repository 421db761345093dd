//! Squeeze scan pipeline.
//!
//! Contains the core logic for:
//! - Batch planning against the scan time budget
//! - Concurrent price fetching under a deadline
//! - Live short interest lookups with synthetic backfill
//! - Scoring, ranking, and calibration of future scans

mod orchestrator;
mod planner;
mod price_feed;
mod scoring;
mod short_interest;
mod synthetic;

pub use orchestrator::{
    PerformanceRating, ScanFilters, ScanOrchestrator, ScanOutcome, ScanResult, ScanStats,
};
pub use planner::{Calibration, ScanPlan, ScanPlanner, TimeoutRisk};
pub use price_feed::PriceFeed;
pub use scoring::{RiskFactor, RiskTier, ScoreBreakdown, ScoreCard, ScoringEngine, ScoringFault};
pub use short_interest::{extract_metrics, match_field, MetricField, ShortInterestFeed, FIELD_RULES};
pub use synthetic::SyntheticEstimator;
