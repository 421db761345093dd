//! Batch-size planning under a wall-clock budget.
//!
//! The planner is a pure function of the request, the budget, and a snapshot
//! of [`Calibration`], the one piece of state shared across scans.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;

/// Fraction of the budget a planned batch may consume.
const SAFETY_MARGIN: Decimal = dec!(0.8);

/// Lower bound on the calibrated per-symbol time, keeps planning finite
/// after an unrealistically fast scan.
const MIN_AVG_TIME_PER_SYMBOL: Decimal = dec!(0.01);

/// Likelihood that a planned batch overruns its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutRisk {
    Low,
    Medium,
    High,
}

impl TimeoutRisk {
    fn for_batch(size: usize) -> Self {
        match size {
            0..=15 => TimeoutRisk::Low,
            16..=25 => TimeoutRisk::Medium,
            _ => TimeoutRisk::High,
        }
    }
}

/// Planner output, returned to callers as `optimization_info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanPlan {
    pub optimal_size: usize,
    /// Expected duration in seconds
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_duration: Decimal,
    pub timeout_risk: TimeoutRisk,
    /// Advisory minimum score; larger batches deserve stricter filtering
    pub recommended_min_score: u32,
}

/// Computes safe batch sizes.
#[derive(Debug, Clone)]
pub struct ScanPlanner {
    timeout_budget_secs: Decimal,
    max_safe_batch_size: usize,
}

impl ScanPlanner {
    pub fn new(timeout_budget_secs: u64, max_safe_batch_size: usize) -> Self {
        Self {
            timeout_budget_secs: Decimal::from(timeout_budget_secs),
            max_safe_batch_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.scan.timeout_budget_secs,
            config.planner.max_safe_batch_size,
        )
    }

    pub fn timeout_budget_secs(&self) -> Decimal {
        self.timeout_budget_secs
    }

    pub fn max_safe_batch_size(&self) -> usize {
        self.max_safe_batch_size
    }

    /// Largest batch that fits in the budget with the safety margin applied.
    fn safe_ceiling(&self, avg_time_per_symbol: Decimal) -> usize {
        if avg_time_per_symbol <= Decimal::ZERO {
            return self.max_safe_batch_size;
        }
        (self.timeout_budget_secs / avg_time_per_symbol * SAFETY_MARGIN)
            .floor()
            .to_usize()
            .unwrap_or(self.max_safe_batch_size)
    }

    /// Plan a batch for `requested_size` symbols.
    pub fn plan(&self, requested_size: usize, avg_time_per_symbol: Decimal) -> ScanPlan {
        let safe_ceiling = self.safe_ceiling(avg_time_per_symbol);
        let optimal_size = requested_size
            .min(safe_ceiling)
            .min(self.max_safe_batch_size);

        let estimated_duration = Decimal::from(optimal_size) * avg_time_per_symbol.max(Decimal::ZERO);

        let recommended_min_score = if optimal_size > 20 {
            50
        } else if optimal_size > 10 {
            30
        } else {
            0
        };

        debug!(
            requested_size,
            safe_ceiling,
            optimal_size,
            %avg_time_per_symbol,
            %estimated_duration,
            "Planned scan batch"
        );

        ScanPlan {
            optimal_size,
            estimated_duration,
            timeout_risk: TimeoutRisk::for_batch(optimal_size),
            recommended_min_score,
        }
    }
}

/// Running estimate of seconds spent per analyzed symbol, shared by every
/// scan in the process.
#[derive(Debug, Clone)]
pub struct Calibration {
    avg_time_per_symbol: Arc<RwLock<Decimal>>,
}

impl Calibration {
    pub fn new(initial: Decimal) -> Self {
        Self {
            avg_time_per_symbol: Arc::new(RwLock::new(initial.max(MIN_AVG_TIME_PER_SYMBOL))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.planner.initial_avg_time_per_symbol)
    }

    /// Current estimate. The read lock is released before returning.
    pub async fn avg_time_per_symbol(&self) -> Decimal {
        *self.avg_time_per_symbol.read().await
    }

    /// Fold a finished scan into the estimate.
    ///
    /// Scans that analyzed nothing carry no timing signal and are ignored.
    pub async fn record(&self, elapsed: Duration, analyzed_count: usize) -> Option<Decimal> {
        if analyzed_count == 0 {
            return None;
        }

        let elapsed_secs = Decimal::from_i128_with_scale(elapsed.as_micros() as i128, 6);
        let estimate = (elapsed_secs / Decimal::from(analyzed_count)).max(MIN_AVG_TIME_PER_SYMBOL);

        *self.avg_time_per_symbol.write().await = estimate;
        debug!(%estimate, analyzed_count, "Updated per-symbol time estimate");
        Some(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_plan() {
        let planner = ScanPlanner::new(45, 20);
        let plan = planner.plan(20, dec!(2.5));

        // floor(45 / 2.5 * 0.8) = 14
        assert_eq!(plan.optimal_size, 14);
        assert_eq!(plan.estimated_duration, dec!(35.0));
        assert_eq!(plan.timeout_risk, TimeoutRisk::Low);
        assert_eq!(plan.recommended_min_score, 30);
    }

    #[test]
    fn test_small_request_is_kept() {
        let planner = ScanPlanner::new(45, 20);
        let plan = planner.plan(5, dec!(2.5));

        assert_eq!(plan.optimal_size, 5);
        assert_eq!(plan.recommended_min_score, 0);
    }

    #[test]
    fn test_fast_calibration_hits_batch_ceiling() {
        let planner = ScanPlanner::new(45, 40);

        let plan = planner.plan(100, dec!(0.5));
        assert_eq!(plan.optimal_size, 40);
        assert_eq!(plan.timeout_risk, TimeoutRisk::High);
        assert_eq!(plan.recommended_min_score, 50);

        let plan = planner.plan(22, dec!(0.5));
        assert_eq!(plan.timeout_risk, TimeoutRisk::Medium);
    }

    #[test]
    fn test_slow_calibration_can_plan_nothing() {
        let planner = ScanPlanner::new(45, 20);
        let plan = planner.plan(20, dec!(100));

        assert_eq!(plan.optimal_size, 0);
        assert_eq!(plan.estimated_duration, Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_average_uses_ceiling() {
        let planner = ScanPlanner::new(45, 20);
        assert_eq!(planner.plan(50, Decimal::ZERO).optimal_size, 20);
    }

    #[test]
    fn test_plan_always_fits_budget() {
        let averages = [
            dec!(0.01),
            dec!(0.3),
            dec!(0.7),
            dec!(1),
            dec!(1.3),
            dec!(2.5),
            dec!(3.7),
            dec!(7),
            dec!(13.3),
            dec!(45),
            dec!(60),
        ];

        for budget in [1u64, 7, 30, 45, 90] {
            for max_safe in [1usize, 5, 20, 100] {
                let planner = ScanPlanner::new(budget, max_safe);
                for requested in [1usize, 3, 10, 15, 20, 25, 50, 500] {
                    for avg in averages {
                        let plan = planner.plan(requested, avg);
                        assert!(plan.optimal_size <= requested.min(max_safe));
                        assert!(
                            Decimal::from(plan.optimal_size) * avg * dec!(1.25)
                                <= Decimal::from(budget),
                            "budget={budget} max_safe={max_safe} requested={requested} avg={avg}"
                        );
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_calibration_records_average() {
        let calibration = Calibration::new(dec!(2.5));
        assert_eq!(calibration.avg_time_per_symbol().await, dec!(2.5));

        let estimate = calibration
            .record(Duration::from_millis(9_000), 6)
            .await
            .unwrap();
        assert_eq!(estimate, dec!(1.5));
        assert_eq!(calibration.avg_time_per_symbol().await, dec!(1.5));
    }

    #[tokio::test]
    async fn test_calibration_ignores_empty_scans() {
        let calibration = Calibration::new(dec!(2.5));
        assert_eq!(calibration.record(Duration::from_secs(3), 0).await, None);
        assert_eq!(calibration.avg_time_per_symbol().await, dec!(2.5));
    }

    #[tokio::test]
    async fn test_calibration_has_floor() {
        let calibration = Calibration::new(dec!(2.5));
        calibration.record(Duration::ZERO, 10).await;
        assert_eq!(calibration.avg_time_per_symbol().await, MIN_AVG_TIME_PER_SYMBOL);
    }

    #[tokio::test]
    async fn test_calibration_is_shared_between_clones() {
        let calibration = Calibration::new(dec!(2.5));
        let other = calibration.clone();

        let writers: Vec<_> = (1..=8u64)
            .map(|n| {
                let c = calibration.clone();
                tokio::spawn(async move { c.record(Duration::from_secs(n), 1).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let value = other.avg_time_per_symbol().await;
        assert!(value >= dec!(1) && value <= dec!(8));
        assert_eq!(value.fract(), Decimal::ZERO);
    }
}
