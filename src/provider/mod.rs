//! Data providers consumed by a scan.
//!
//! ## Prices
//! Chart endpoint client returning current price, previous close, and volume,
//! plus an offline paper source for runs without network access.
//!
//! ## Short interest
//! Read-only client for a short interest provider. Payloads are returned as
//! raw JSON; field extraction happens in the scan pipeline.

mod error;
mod ortex;
pub mod paper;
mod traits;
mod types;
mod yahoo;

pub use error::FeedError;
pub use ortex::OrtexClient;
pub use paper::PaperPriceSource;
pub use traits::{PriceSource, ShortInterestSource};
#[cfg(test)]
pub use traits::{MockPriceSource, MockShortInterestSource};
pub use types::*;
pub use yahoo::YahooClient;
