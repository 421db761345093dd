//! Concurrent price fetching under a hard deadline.

use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::ScanConfig;
use crate::provider::{FeedError, PriceQuote, PriceSource, Symbol};

/// Fetches quotes for a batch of symbols with bounded concurrency.
///
/// Failed, timed-out, and malformed fetches are dropped from the result.
/// Whatever is still in flight when the deadline passes is abandoned.
#[derive(Clone)]
pub struct PriceFeed {
    source: Arc<dyn PriceSource>,
    concurrency: usize,
    call_timeout: Duration,
    deadline: Duration,
}

impl PriceFeed {
    pub fn new(
        source: Arc<dyn PriceSource>,
        concurrency: usize,
        call_timeout: Duration,
        deadline: Duration,
    ) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            call_timeout,
            deadline,
        }
    }

    pub fn from_config(source: Arc<dyn PriceSource>, config: &ScanConfig) -> Self {
        Self::new(
            source,
            config.price_concurrency,
            config.price_call_timeout(),
            config.price_deadline(),
        )
    }

    async fn fetch_one(&self, symbol: Symbol) -> (Symbol, Result<PriceQuote, FeedError>) {
        let result = match tokio::time::timeout(self.call_timeout, self.source.fetch_quote(&symbol))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(self.call_timeout)),
        };
        (symbol, result)
    }

    /// Fetch quotes for `symbols`, returning only the ones that arrived in time.
    #[instrument(skip(self, symbols), fields(source = self.source.name(), requested = symbols.len()))]
    pub async fn fetch(&self, symbols: &[Symbol]) -> HashMap<Symbol, PriceQuote> {
        let deadline = Instant::now() + self.deadline;
        let mut quotes = HashMap::with_capacity(symbols.len());
        let mut failed = 0usize;
        let mut timed_out = 0usize;
        let mut deadline_hit = false;

        let mut pending = stream::iter(symbols.iter().cloned())
            .map(|symbol| self.fetch_one(symbol))
            .buffer_unordered(self.concurrency);

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((symbol, Ok(quote)))) => {
                    debug!(%symbol, price = %quote.current_price, "Quote received");
                    quotes.insert(symbol, quote);
                }
                Ok(Some((symbol, Err(e)))) => {
                    if matches!(e, FeedError::Timeout(_)) {
                        timed_out += 1;
                    } else {
                        failed += 1;
                    }
                    debug!(%symbol, kind = e.kind(), error = %e, "Dropping symbol without quote");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    debug!(
                        outstanding = symbols.len() - quotes.len() - failed - timed_out,
                        "Price deadline reached, abandoning outstanding fetches"
                    );
                    break;
                }
            }
        }

        info!(
            requested = symbols.len(),
            fetched = quotes.len(),
            failed,
            timed_out,
            deadline_hit,
            "Price fetch complete"
        );

        quotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockPriceSource, PaperPriceSource};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn symbols(n: usize) -> Vec<Symbol> {
        (0..n).map(|i| Symbol::new(format!("T{i:02}"))).collect()
    }

    /// Answers immediately for `fast` symbols and sleeps for the rest.
    struct SplitLatencySource {
        fast: HashSet<Symbol>,
        slow_latency: Duration,
    }

    #[async_trait]
    impl PriceSource for SplitLatencySource {
        fn name(&self) -> &'static str {
            "split"
        }

        async fn fetch_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FeedError> {
            if !self.fast.contains(symbol) {
                tokio::time::sleep(self.slow_latency).await;
            }
            PriceQuote::new(symbol.clone(), dec!(10), dec!(9), 100, Utc::now())
        }
    }

    /// Tracks the highest number of concurrent fetches.
    #[derive(Default)]
    struct CountingSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FeedError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            PriceQuote::new(symbol.clone(), dec!(10), dec!(10), 100, Utc::now())
        }
    }

    #[tokio::test]
    async fn test_failures_are_omitted() {
        let source = PaperPriceSource::new().with_unavailable(["T01", "T03"]);
        let feed = PriceFeed::new(
            Arc::new(source),
            4,
            Duration::from_secs(1),
            Duration::from_secs(5),
        );

        let quotes = feed.fetch(&symbols(5)).await;
        assert_eq!(quotes.len(), 3);
        assert!(!quotes.contains_key("T01"));
        assert!(quotes.contains_key("T04"));
    }

    #[tokio::test]
    async fn test_malformed_quotes_are_omitted() {
        let mut mock = MockPriceSource::new();
        mock.expect_name().return_const("mock");
        mock.expect_fetch_quote().returning(|symbol| {
            if symbol.as_str() == "T00" {
                Err(FeedError::Malformed("missing price".into()))
            } else {
                PriceQuote::new(symbol.clone(), dec!(5), dec!(4), 10, Utc::now())
            }
        });

        let feed = PriceFeed::new(
            Arc::new(mock),
            2,
            Duration::from_secs(1),
            Duration::from_secs(5),
        );
        let quotes = feed.fetch(&symbols(3)).await;

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["T01"].change_pct, dec!(25));
    }

    #[tokio::test]
    async fn test_per_call_timeout_drops_slow_symbols() {
        let all = symbols(4);
        let source = SplitLatencySource {
            fast: all[..2].iter().cloned().collect(),
            slow_latency: Duration::from_secs(10),
        };
        let feed = PriceFeed::new(
            Arc::new(source),
            4,
            Duration::from_millis(50),
            Duration::from_secs(5),
        );

        let started = Instant::now();
        let quotes = feed.fetch(&all).await;

        assert_eq!(quotes.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_results() {
        let all = symbols(20);
        let source = SplitLatencySource {
            fast: all[..10].iter().cloned().collect(),
            slow_latency: Duration::from_secs(10),
        };
        let feed = PriceFeed::new(
            Arc::new(source),
            20,
            Duration::from_secs(30),
            Duration::from_millis(200),
        );

        let started = Instant::now();
        let quotes = feed.fetch(&all).await;

        assert!(quotes.len() <= 10);
        assert_eq!(quotes.len(), 10);
        assert!(quotes.keys().all(|s| all[..10].contains(s)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(CountingSource::default());
        let feed = PriceFeed::new(
            source.clone(),
            3,
            Duration::from_secs(1),
            Duration::from_secs(5),
        );

        let quotes = feed.fetch(&symbols(12)).await;

        assert_eq!(quotes.len(), 12);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(source.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let feed = PriceFeed::new(
            Arc::new(PaperPriceSource::new()),
            4,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(feed.fetch(&[]).await.is_empty());
    }
}
