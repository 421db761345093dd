//! # Squeeze Scanner
//!
//! Time-bounded short squeeze risk scanner. Ranks a universe of equities by
//! combining live prices with live or synthetic short interest metrics.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `provider`: Price and short interest data sources (HTTP + paper)
//! - `universe`: Built-in symbol categories
//! - `scanner`: Planning, fetching, estimation, scoring, and ranking
//! - `api`: Request and response documents
//! - `utils`: Shared utilities and decimal arithmetic

pub mod api;
pub mod config;
pub mod provider;
pub mod scanner;
pub mod universe;
pub mod utils;

pub use config::Config;
