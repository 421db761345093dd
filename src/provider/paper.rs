//! Offline price source for paper runs and tests.
//!
//! Generates a stable pseudo-random quote per symbol, or serves quotes set
//! explicitly with [`PaperPriceSource::set_quote`].

use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::FeedError;
use super::traits::PriceSource;
use super::types::{PriceQuote, Symbol};
use crate::utils::decimal::{from_f64, round_to_precision};
use crate::utils::seed::stable_seed;

/// Mixed into the symbol seed so paper prices don't correlate with synthetic short metrics.
const PRICE_SEED_SALT: u64 = 0x5EED_0F_F1CE;

/// Raw values behind an explicitly set quote.
#[derive(Debug, Clone, Copy)]
struct PaperQuote {
    current_price: Decimal,
    previous_close: Decimal,
    volume: u64,
}

/// Deterministic price source that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct PaperPriceSource {
    quotes: Arc<RwLock<HashMap<Symbol, PaperQuote>>>,
    unavailable: HashSet<Symbol>,
    latency: Duration,
}

impl PaperPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the given symbols fail as if the provider had no data.
    pub fn with_unavailable<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.unavailable.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Pin the quote served for a symbol.
    pub async fn set_quote(
        &self,
        symbol: impl Into<Symbol>,
        current_price: Decimal,
        previous_close: Decimal,
        volume: u64,
    ) {
        self.quotes.write().await.insert(
            symbol.into(),
            PaperQuote {
                current_price,
                previous_close,
                volume,
            },
        );
    }

    fn generate(symbol: &Symbol) -> Result<PaperQuote, FeedError> {
        let mut rng = ChaCha8Rng::seed_from_u64(stable_seed(symbol.as_str()) ^ PRICE_SEED_SALT);

        let price: f64 = rng.gen_range(2.0..400.0);
        let change_pct: f64 = rng.gen_range(-8.0..12.0);
        let previous_close = price / (1.0 + change_pct / 100.0);
        let volume: u64 = rng.gen_range(100_000..50_000_000);

        let to_decimal = |value: f64| {
            from_f64(value)
                .map(|d| round_to_precision(d, 2))
                .ok_or_else(|| FeedError::Malformed(format!("generated non-finite value for {symbol}")))
        };

        Ok(PaperQuote {
            current_price: to_decimal(price)?,
            previous_close: to_decimal(previous_close)?,
            volume,
        })
    }
}

#[async_trait]
impl PriceSource for PaperPriceSource {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FeedError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.unavailable.contains(symbol) {
            return Err(FeedError::Status(404));
        }

        let pinned = self.quotes.read().await.get(symbol).copied();
        let raw = match pinned {
            Some(quote) => quote,
            None => Self::generate(symbol)?,
        };

        debug!(%symbol, price = %raw.current_price, "Serving paper quote");
        PriceQuote::new(
            symbol.clone(),
            raw.current_price,
            raw.previous_close,
            raw.volume,
            Utc::now(),
        )
    }
}
