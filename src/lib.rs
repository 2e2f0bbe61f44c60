//! DexScreener token scanner library
//!
//! Polls newly profiled tokens, enriches them with their primary trading
//! pair, scores risk heuristically and alerts on/export the promising ones.

pub mod agents;
pub mod cli;
pub mod config;
pub mod dexscreener;
pub mod error;
pub mod report;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
