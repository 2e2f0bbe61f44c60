//! Promising-token decision
//!
//! An analysis is promising only when every criterion holds. All criteria
//! are checked so rejections can be logged with the full list of reasons.

use std::fmt;

use crate::config::CriteriaConfig;
use crate::scanner::analyzer::Analysis;

/// Why an analysis was not considered promising
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    RiskTooHigh(i32),
    LiquidityTooLow(f64),
    VolumeTooLow(f64),
    TooManyFlags(usize),
    NoSocialLinks,
    NoDescription,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RiskTooHigh(score) => write!(f, "risk score {} too high", score),
            RejectReason::LiquidityTooLow(usd) => write!(f, "liquidity ${:.2} too low", usd),
            RejectReason::VolumeTooLow(usd) => write!(f, "24h volume ${:.2} too low", usd),
            RejectReason::TooManyFlags(count) => write!(f, "{} risk flags", count),
            RejectReason::NoSocialLinks => write!(f, "no social links"),
            RejectReason::NoDescription => write!(f, "no description"),
        }
    }
}

/// Outcome of evaluating one analysis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub reasons: Vec<RejectReason>,
}

impl Evaluation {
    pub fn is_promising(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Comma-separated rejection reasons, for logging
    pub fn summary(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityEvaluator {
    criteria: CriteriaConfig,
}

impl OpportunityEvaluator {
    pub fn new(criteria: CriteriaConfig) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &CriteriaConfig {
        &self.criteria
    }

    /// Check every criterion and collect the failures
    pub fn evaluate(&self, analysis: &Analysis) -> Evaluation {
        let c = &self.criteria;
        let metrics = &analysis.metrics;
        let mut reasons = Vec::new();

        if analysis.risk_score > c.max_risk_score {
            reasons.push(RejectReason::RiskTooHigh(analysis.risk_score));
        }
        if metrics.liquidity_usd <= c.min_liquidity_usd {
            reasons.push(RejectReason::LiquidityTooLow(metrics.liquidity_usd));
        }
        if metrics.volume_24h <= c.min_volume_24h {
            reasons.push(RejectReason::VolumeTooLow(metrics.volume_24h));
        }
        if analysis.flags.len() >= c.max_flags {
            reasons.push(RejectReason::TooManyFlags(analysis.flags.len()));
        }
        if c.require_social_links && !analysis.profile_info.has_social_links() {
            reasons.push(RejectReason::NoSocialLinks);
        }
        if c.require_description && !analysis.profile_info.has_description() {
            reasons.push(RejectReason::NoDescription);
        }

        Evaluation { reasons }
    }

    pub fn is_promising(&self, analysis: &Analysis) -> bool {
        self.evaluate(analysis).is_promising()
    }
}
