//! Shared utilities.

pub mod decimal;
pub mod seed;
