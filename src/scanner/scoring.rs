//! Squeeze score calculation.
//!
//! A score is the floor of five capped components, clamped to 100:
//!
//! | Component      | Formula          | Cap |
//! |----------------|------------------|-----|
//! | short interest | si × 1.2         | 35  |
//! | utilization    | util × 0.25      | 25  |
//! | cost to borrow | ctb × 0.8        | 20  |
//! | days to cover  | dtc × 1.5        | 15  |
//! | momentum       | change_pct × 0.3 | -   |
//!
//! Momentum only counts for positive moves.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::provider::{PriceQuote, ShortMetrics};
use crate::utils::decimal::floor_capped;

const MAX_SCORE: u32 = 100;

/// Reasons a symbol could not be scored.
#[derive(Debug, Error, PartialEq)]
pub enum ScoringFault {
    #[error("missing {0}")]
    MissingMetric(&'static str),

    #[error("negative {metric}: {value}")]
    NegativeMetric { metric: &'static str, value: Decimal },

    #[error("{0} component overflows")]
    Overflow(&'static str),
}

/// Per-component contribution to the total score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub short_interest_component: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub utilization_component: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost_to_borrow_component: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub days_to_cover_component: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub momentum_component: Decimal,
}

impl ScoreBreakdown {
    /// Total of all components, or `None` if it does not fit in a `Decimal`.
    pub fn sum(&self) -> Option<Decimal> {
        self.short_interest_component
            .checked_add(self.utilization_component)?
            .checked_add(self.cost_to_borrow_component)?
            .checked_add(self.days_to_cover_component)?
            .checked_add(self.momentum_component)
    }
}

/// Squeeze risk band for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskTier {
    Extreme,
    High,
    Moderate,
    Low,
    Error,
}

impl RiskTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => RiskTier::Extreme,
            65..=79 => RiskTier::High,
            45..=64 => RiskTier::Moderate,
            _ => RiskTier::Low,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskTier::Extreme => "Extreme Squeeze Risk",
            RiskTier::High => "High Squeeze Risk",
            RiskTier::Moderate => "Moderate Squeeze Risk",
            RiskTier::Low => "Low Risk",
            RiskTier::Error => "Scoring Error",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Threshold flags raised independently of the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFactor {
    ExtremeShortInterest,
    HighUtilization,
    HighBorrowingCosts,
}

/// Scoring outcome for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub total_score: u32,
    pub risk_tier: RiskTier,
    pub risk_factors: Vec<RiskFactor>,
    pub breakdown: ScoreBreakdown,
}

impl ScoreCard {
    fn error() -> Self {
        Self {
            total_score: 0,
            risk_tier: RiskTier::Error,
            risk_factors: Vec::new(),
            breakdown: ScoreBreakdown::default(),
        }
    }
}

fn require(value: Option<Decimal>, metric: &'static str) -> Result<Decimal, ScoringFault> {
    let value = value.ok_or(ScoringFault::MissingMetric(metric))?;
    if value < Decimal::ZERO {
        return Err(ScoringFault::NegativeMetric { metric, value });
    }
    Ok(value)
}

fn weighted(
    value: Decimal,
    weight: Decimal,
    cap: Option<Decimal>,
    metric: &'static str,
) -> Result<Decimal, ScoringFault> {
    let component = value
        .checked_mul(weight)
        .ok_or(ScoringFault::Overflow(metric))?;
    Ok(cap.map_or(component, |cap| component.min(cap)))
}

/// Stateless squeeze scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a symbol. Faults are logged and turned into an `Error` card.
    pub fn score(&self, metrics: &ShortMetrics, quote: &PriceQuote) -> ScoreCard {
        match self.try_score(metrics, quote) {
            Ok(card) => card,
            Err(fault) => {
                warn!(symbol = %quote.symbol, %fault, "Scoring failed");
                ScoreCard::error()
            }
        }
    }

    pub fn try_score(
        &self,
        metrics: &ShortMetrics,
        quote: &PriceQuote,
    ) -> Result<ScoreCard, ScoringFault> {
        let si = require(metrics.short_interest_pct, "short interest")?;
        let util = require(metrics.utilization_pct, "utilization")?;
        let ctb = require(metrics.cost_to_borrow_pct, "cost to borrow")?;
        let dtc = require(metrics.days_to_cover, "days to cover")?;

        let breakdown = ScoreBreakdown {
            short_interest_component: weighted(si, dec!(1.2), Some(dec!(35)), "short interest")?,
            utilization_component: weighted(util, dec!(0.25), Some(dec!(25)), "utilization")?,
            cost_to_borrow_component: weighted(ctb, dec!(0.8), Some(dec!(20)), "cost to borrow")?,
            days_to_cover_component: weighted(dtc, dec!(1.5), Some(dec!(15)), "days to cover")?,
            momentum_component: if quote.change_pct > Decimal::ZERO {
                weighted(quote.change_pct, dec!(0.3), None, "momentum")?
            } else {
                Decimal::ZERO
            },
        };

        let total = breakdown.sum().ok_or(ScoringFault::Overflow("total"))?;
        let total_score = floor_capped(total, MAX_SCORE);

        let mut risk_factors = Vec::new();
        if si > dec!(25) {
            risk_factors.push(RiskFactor::ExtremeShortInterest);
        }
        if util > dec!(90) {
            risk_factors.push(RiskFactor::HighUtilization);
        }
        if ctb > dec!(20) {
            risk_factors.push(RiskFactor::HighBorrowingCosts);
        }

        Ok(ScoreCard {
            total_score,
            risk_tier: RiskTier::from_score(total_score),
            risk_factors,
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Symbol;
    use chrono::Utc;

    fn quote(price: Decimal, previous_close: Decimal) -> PriceQuote {
        PriceQuote::new(Symbol::new("GME"), price, previous_close, 1_000, Utc::now()).unwrap()
    }

    fn metrics(si: Decimal, util: Decimal, ctb: Decimal, dtc: Decimal) -> ShortMetrics {
        ShortMetrics::synthetic(si, util, ctb, dtc, "profile")
    }

    #[test]
    fn test_profile_without_momentum() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(22.4), dec!(89.2), dec!(12.8), dec!(4.1)),
            &quote(dec!(25), dec!(25)),
        );

        // 26.88 + 22.3 + 10.24 + 6.15 = 65.57
        assert_eq!(card.breakdown.sum(), Some(dec!(65.57)));
        assert_eq!(card.total_score, 65);
        assert_eq!(card.risk_tier, RiskTier::High);
        assert!(card.risk_factors.is_empty());
    }

    #[test]
    fn test_components_are_capped() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(50), dec!(100), dec!(80), dec!(20)),
            &quote(dec!(10), dec!(10)),
        );

        assert_eq!(card.breakdown.short_interest_component, dec!(35));
        assert_eq!(card.breakdown.utilization_component, dec!(25));
        assert_eq!(card.breakdown.cost_to_borrow_component, dec!(20));
        assert_eq!(card.breakdown.days_to_cover_component, dec!(15));
        assert_eq!(card.total_score, 95);
        assert_eq!(card.risk_tier, RiskTier::Extreme);
        assert_eq!(
            card.risk_factors,
            vec![
                RiskFactor::ExtremeShortInterest,
                RiskFactor::HighUtilization,
                RiskFactor::HighBorrowingCosts
            ]
        );
    }

    #[test]
    fn test_total_is_clamped() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(50), dec!(100), dec!(80), dec!(20)),
            &quote(dec!(20), dec!(10)),
        );

        assert_eq!(card.breakdown.momentum_component, dec!(30));
        assert_eq!(card.total_score, 100);
    }

    #[test]
    fn test_negative_momentum_is_ignored() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(10), dec!(40), dec!(5), dec!(2)),
            &quote(dec!(9), dec!(10)),
        );

        assert_eq!(card.breakdown.momentum_component, Decimal::ZERO);
        // 12 + 10 + 4 + 3
        assert_eq!(card.total_score, 29);
        assert_eq!(card.risk_tier, RiskTier::Low);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(25), dec!(90), dec!(20), dec!(1)),
            &quote(dec!(1), dec!(1)),
        );
        assert!(card.risk_factors.is_empty());
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskTier::from_score(100), RiskTier::Extreme);
        assert_eq!(RiskTier::from_score(80), RiskTier::Extreme);
        assert_eq!(RiskTier::from_score(79), RiskTier::High);
        assert_eq!(RiskTier::from_score(65), RiskTier::High);
        assert_eq!(RiskTier::from_score(64), RiskTier::Moderate);
        assert_eq!(RiskTier::from_score(45), RiskTier::Moderate);
        assert_eq!(RiskTier::from_score(44), RiskTier::Low);
        assert_eq!(RiskTier::from_score(0), RiskTier::Low);
        assert_eq!(RiskTier::Error.description(), "Scoring Error");
    }

    #[test]
    fn test_missing_metric_is_an_error_card() {
        let mut partial = ShortMetrics::live("ortex");
        partial.short_interest_pct = Some(dec!(40));

        let engine = ScoringEngine::new();
        assert_eq!(
            engine.try_score(&partial, &quote(dec!(1), dec!(1))),
            Err(ScoringFault::MissingMetric("utilization"))
        );

        let card = engine.score(&partial, &quote(dec!(1), dec!(1)));
        assert_eq!(card.total_score, 0);
        assert_eq!(card.risk_tier, RiskTier::Error);
        assert!(card.risk_factors.is_empty());
        assert_eq!(card.breakdown, ScoreBreakdown::default());
    }

    #[test]
    fn test_negative_metric_is_an_error_card() {
        let card = ScoringEngine::new().score(
            &metrics(dec!(40), dec!(-1), dec!(50), dec!(10)),
            &quote(dec!(1), dec!(1)),
        );
        assert_eq!(card.risk_tier, RiskTier::Error);
        assert!(card.risk_factors.is_empty());
    }

    #[test]
    fn test_extreme_momentum_clamps_without_panicking() {
        let mut surge = quote(dec!(1), dec!(1));
        surge.change_pct = Decimal::MAX;

        let card = ScoringEngine::new().score(
            &metrics(dec!(22.4), dec!(89.2), dec!(12.8), dec!(4.1)),
            &surge,
        );
        assert_eq!(card.total_score, 100);
        assert_eq!(card.risk_tier, RiskTier::Extreme);
    }

    #[test]
    fn test_overflowing_short_interest_is_a_fault() {
        let engine = ScoringEngine::new();
        assert_eq!(
            engine.try_score(
                &metrics(Decimal::MAX, dec!(50), dec!(10), dec!(2)),
                &quote(dec!(1), dec!(1))
            ),
            Err(ScoringFault::Overflow("short interest"))
        );
    }

    #[test]
    fn test_overflowing_metric_is_an_error_card() {
        let card = ScoringEngine::new().score(
            &metrics(Decimal::MAX, dec!(50), dec!(10), dec!(2)),
            &quote(dec!(1), dec!(1)),
        );
        assert_eq!(card.risk_tier, RiskTier::Error);
        assert_eq!(card.breakdown, ScoreBreakdown::default());
    }

    #[test]
    fn test_uncapped_momentum_sum_overflow() {
        let breakdown = ScoreBreakdown {
            short_interest_component: dec!(35),
            momentum_component: Decimal::MAX,
            ..ScoreBreakdown::default()
        };
        assert_eq!(breakdown.sum(), None);
    }

    #[test]
    fn test_factor_serialization() {
        let json = serde_json::to_string(&RiskFactor::HighBorrowingCosts).unwrap();
        assert_eq!(json, "\"HIGH_BORROWING_COSTS\"");
    }
}
