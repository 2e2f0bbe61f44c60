//! Token scanning pipeline
//!
//! Discovery profiles flow through enrichment ([`analyzer`]), screening
//! ([`evaluator`]) and, when promising, alerting and export. [`ScanLoop`]
//! drives the whole thing on a fixed cadence.

pub mod analyzer;
pub mod dedup;
pub mod evaluator;
pub mod rate_limiter;
pub mod scan_loop;

pub use analyzer::{analyze_token, assess_risk, Analysis, Metrics, ProfileInfo, RiskAssessment};
pub use dedup::{Claim, DedupStore};
pub use evaluator::{Evaluation, OpportunityEvaluator, RejectReason};
pub use rate_limiter::RateLimiter;
pub use scan_loop::{CycleReport, ScanLoop, ScanSettings, ScanStats, TokenOutcome};
