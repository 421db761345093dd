//! Deterministic short metric estimates for symbols without live data.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::ops::RangeInclusive;
use tracing::trace;

use crate::provider::{ShortMetrics, Symbol};
use crate::universe::{BIOTECH_SQUEEZE, LARGE_CAP_SAMPLES, TOP_MEME_STOCKS};
use crate::utils::decimal::{from_f64, round_to_precision};
use crate::utils::seed::stable_seed;

/// Hand-tuned `(symbol, si, util, ctb, dtc)` profiles for well known names.
const PROFILES: &[(&str, Decimal, Decimal, Decimal, Decimal)] = &[
    ("GME", dec!(22.4), dec!(89.2), dec!(12.8), dec!(4.1)),
    ("AMC", dec!(18.7), dec!(82.1), dec!(8.9), dec!(3.8)),
    ("SAVA", dec!(35.2), dec!(95.1), dec!(45.8), dec!(12.3)),
    ("VXRT", dec!(28.9), dec!(87.6), dec!(18.2), dec!(8.7)),
    ("BBBY", dec!(42.1), dec!(98.2), dec!(78.5), dec!(15.8)),
    ("BYND", dec!(31.5), dec!(91.7), dec!(25.3), dec!(9.2)),
    ("PTON", dec!(26.8), dec!(84.5), dec!(15.7), dec!(6.8)),
];

/// Sampling ranges for one category.
#[derive(Debug, Clone)]
struct SampleRanges {
    short_interest: RangeInclusive<f64>,
    utilization: RangeInclusive<f64>,
    cost_to_borrow: RangeInclusive<f64>,
}

const DAYS_TO_COVER_FACTOR: RangeInclusive<f64> = 0.2..=0.5;

fn ranges_for(categories: &[&str]) -> SampleRanges {
    let member = |name: &str| categories.contains(&name);

    if member(TOP_MEME_STOCKS) {
        SampleRanges {
            short_interest: 15.0..=35.0,
            utilization: 75.0..=95.0,
            cost_to_borrow: 10.0..=40.0,
        }
    } else if member(BIOTECH_SQUEEZE) {
        SampleRanges {
            short_interest: 20.0..=40.0,
            utilization: 80.0..=98.0,
            cost_to_borrow: 15.0..=60.0,
        }
    } else if member(LARGE_CAP_SAMPLES) {
        SampleRanges {
            short_interest: 1.0..=6.0,
            utilization: 20.0..=50.0,
            cost_to_borrow: 0.5..=3.0,
        }
    } else {
        SampleRanges {
            short_interest: 8.0..=25.0,
            utilization: 50.0..=85.0,
            cost_to_borrow: 3.0..=20.0,
        }
    }
}

/// Rounds a sampled value to one decimal. Samples are always finite.
fn one_dp(value: f64) -> Decimal {
    from_f64(value)
        .map(|d| round_to_precision(d, 1))
        .unwrap_or_default()
}

/// Produces synthetic metrics from a fixed profile table or a symbol-seeded
/// generator.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticEstimator {
    seed_fn: fn(&str) -> u64,
}

impl Default for SyntheticEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticEstimator {
    pub fn new() -> Self {
        Self {
            seed_fn: stable_seed,
        }
    }

    /// Use a different seed derivation.
    pub fn with_seed_fn(seed_fn: fn(&str) -> u64) -> Self {
        Self { seed_fn }
    }

    /// Estimate metrics for `symbol` given its category memberships.
    pub fn estimate(&self, symbol: &Symbol, categories: &[&str]) -> ShortMetrics {
        if let Some(&(_, si, util, ctb, dtc)) =
            PROFILES.iter().find(|(name, ..)| *name == symbol.as_str())
        {
            trace!(%symbol, "Using profile metrics");
            return ShortMetrics::synthetic(si, util, ctb, dtc, "profile");
        }

        let ranges = ranges_for(categories);
        let mut rng = ChaCha8Rng::seed_from_u64((self.seed_fn)(symbol.as_str()));

        let si: f64 = rng.gen_range(ranges.short_interest);
        let util: f64 = rng.gen_range(ranges.utilization);
        let ctb: f64 = rng.gen_range(ranges.cost_to_borrow);
        let dtc = si * rng.gen_range(DAYS_TO_COVER_FACTOR);

        trace!(%symbol, ?categories, si, util, ctb, dtc, "Generated metrics");
        ShortMetrics::synthetic(one_dp(si), one_dp(util), one_dp(ctb), one_dp(dtc), "generated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DataSource;
    use crate::universe::{HIGH_SHORT_INTEREST, TickerUniverse};

    fn within(value: Option<Decimal>, low: Decimal, high: Decimal) -> bool {
        value.is_some_and(|v| v >= low && v <= high)
    }

    #[test]
    fn test_profile_takes_precedence() {
        let estimator = SyntheticEstimator::new();
        let metrics = estimator.estimate(&Symbol::new("gme"), &[LARGE_CAP_SAMPLES]);

        assert_eq!(metrics.short_interest_pct, Some(dec!(22.4)));
        assert_eq!(metrics.utilization_pct, Some(dec!(89.2)));
        assert_eq!(metrics.cost_to_borrow_pct, Some(dec!(12.8)));
        assert_eq!(metrics.days_to_cover, Some(dec!(4.1)));
        assert_eq!(metrics.source, DataSource::Synthetic);
        assert_eq!(metrics.origin, "profile");
    }

    #[test]
    fn test_estimates_are_deterministic() {
        let estimator = SyntheticEstimator::new();
        let symbol = Symbol::new("CLOV");

        let a = estimator.estimate(&symbol, &[TOP_MEME_STOCKS]);
        let b = estimator.estimate(&symbol, &[TOP_MEME_STOCKS]);
        assert_eq!(a, b);
        assert_eq!(a.origin, "generated");
        assert!(a.is_complete());
    }

    #[test]
    fn test_generated_values_are_pinned() {
        let metrics = SyntheticEstimator::new().estimate(&Symbol::new("CLOV"), &[TOP_MEME_STOCKS]);

        assert_eq!(metrics.short_interest_pct, Some(dec!(31.3)));
        assert_eq!(metrics.utilization_pct, Some(dec!(87.4)));
        assert_eq!(metrics.cost_to_borrow_pct, Some(dec!(32.9)));
        assert_eq!(metrics.days_to_cover, Some(dec!(11.8)));
        assert_eq!(metrics.origin, "generated");
    }

    #[test]
    fn test_seed_function_is_injectable() {
        let fixed = SyntheticEstimator::with_seed_fn(|_| 42);

        let a = fixed.estimate(&Symbol::new("AAA"), &[]);
        let b = fixed.estimate(&Symbol::new("BBB"), &[]);
        assert_eq!(a.short_interest_pct, b.short_interest_pct);
        assert_eq!(a.days_to_cover, b.days_to_cover);
    }

    #[test]
    fn test_values_follow_category_ranges() {
        let estimator = SyntheticEstimator::new();
        let universe = TickerUniverse::builtin();

        for symbol in universe.master_list() {
            let categories = universe.categories_of(symbol);
            let metrics = estimator.estimate(symbol, &categories);
            if metrics.origin == "profile" {
                continue;
            }

            let (si, util, ctb) = if categories.contains(&TOP_MEME_STOCKS) {
                ((dec!(15), dec!(35)), (dec!(75), dec!(95)), (dec!(10), dec!(40)))
            } else if categories.contains(&BIOTECH_SQUEEZE) {
                ((dec!(20), dec!(40)), (dec!(80), dec!(98)), (dec!(15), dec!(60)))
            } else if categories.contains(&LARGE_CAP_SAMPLES) {
                ((dec!(1), dec!(6)), (dec!(20), dec!(50)), (dec!(0.5), dec!(3)))
            } else {
                ((dec!(8), dec!(25)), (dec!(50), dec!(85)), (dec!(3), dec!(20)))
            };

            assert!(within(metrics.short_interest_pct, si.0, si.1), "{symbol}");
            assert!(within(metrics.utilization_pct, util.0, util.1), "{symbol}");
            assert!(within(metrics.cost_to_borrow_pct, ctb.0, ctb.1), "{symbol}");

            // dtc = si * [0.2, 0.5], allowing for rounding on both sides
            let si_value = metrics.short_interest_pct.unwrap();
            assert!(within(
                metrics.days_to_cover,
                si_value * dec!(0.2) - dec!(0.1),
                si_value * dec!(0.5) + dec!(0.1)
            ));
        }
    }

    #[test]
    fn test_meme_range_wins_over_later_categories() {
        let estimator = SyntheticEstimator::with_seed_fn(|_| 7);
        let both = estimator.estimate(&Symbol::new("XYZ"), &[LARGE_CAP_SAMPLES, TOP_MEME_STOCKS]);
        let meme = estimator.estimate(&Symbol::new("XYZ"), &[TOP_MEME_STOCKS]);
        assert_eq!(both, meme);

        let other = estimator.estimate(&Symbol::new("XYZ"), &[HIGH_SHORT_INTEREST]);
        assert!(within(other.short_interest_pct, dec!(8), dec!(25)));
    }

    #[test]
    fn test_values_have_one_decimal() {
        let metrics = SyntheticEstimator::new().estimate(&Symbol::new("ROKU"), &[]);
        for value in [
            metrics.short_interest_pct,
            metrics.utilization_pct,
            metrics.cost_to_borrow_pct,
            metrics.days_to_cover,
        ] {
            assert!(value.unwrap().scale() <= 1);
        }
    }
}
