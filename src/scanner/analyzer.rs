//! Token enrichment and heuristic risk scoring
//!
//! Merges a discovery profile with its primary trading pair into an
//! [`Analysis`] record. The score is additive and starts at zero; lower is
//! better:
//!
//! | Signal | Condition | Delta |
//! |---|---|---|
//! | very low liquidity | liquidity < $10k | +20 |
//! | strong liquidity | liquidity > $100k | -10 |
//! | suspicious volume/liquidity ratio | 24h volume / liquidity > 5 | +15 |
//! | has website | any link of type `website` | -5 |
//! | has description | non-empty description | -5 |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::AgentReport;
use crate::dexscreener::{ProfileLink, TokenProfile, TradingPair};
use crate::error::{Error, Result};

pub const LOW_LIQUIDITY_USD: f64 = 10_000.0;
pub const STRONG_LIQUIDITY_USD: f64 = 100_000.0;
pub const SUSPICIOUS_VOLUME_RATIO: f64 = 5.0;

pub const FLAG_VERY_LOW_LIQUIDITY: &str = "very low liquidity";
pub const FLAG_SUSPICIOUS_RATIO: &str = "suspicious volume/liquidity ratio";
pub const INDICATOR_STRONG_LIQUIDITY: &str = "strong liquidity";
pub const INDICATOR_HAS_WEBSITE: &str = "has website";
pub const INDICATOR_HAS_DESCRIPTION: &str = "has description";

/// Numeric fields derived from the primary pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub liquidity_usd: f64,
    pub price_usd: f64,
    pub price_change_5m: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    /// Only present when both volume and liquidity are positive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_to_liquidity_ratio: Option<f64>,
}

impl Metrics {
    pub fn from_pair(pair: &TradingPair) -> Self {
        let liquidity_usd = pair.liquidity_usd();
        let volume_24h = pair.volume_24h();
        let (price_change_5m, price_change_1h, price_change_24h) = pair.price_changes();

        let volume_to_liquidity_ratio = if volume_24h > 0.0 && liquidity_usd > 0.0 {
            Some(volume_24h / liquidity_usd)
        } else {
            None
        };

        Self {
            liquidity_usd,
            price_usd: pair.price_usd(),
            price_change_5m,
            price_change_1h,
            price_change_24h,
            volume_24h,
            volume_to_liquidity_ratio,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub social_links: Vec<ProfileLink>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tags: Vec<String>,
}

impl ProfileInfo {
    pub fn has_social_links(&self) -> bool {
        !self.social_links.is_empty()
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .map(|d| !d.is_empty())
            .unwrap_or(false)
    }
}

impl From<&TokenProfile> for ProfileInfo {
    fn from(profile: &TokenProfile) -> Self {
        Self {
            social_links: profile.links.clone(),
            description: profile.description.clone(),
            kind: profile.kind.clone(),
            tags: profile.tags.clone(),
        }
    }
}

/// Score plus the signals that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: i32,
    pub flags: Vec<String>,
    pub positive_indicators: Vec<String>,
}

impl RiskAssessment {
    fn penalize(&mut self, delta: i32, flag: &str) {
        self.risk_score += delta;
        self.flags.push(flag.to_string());
    }

    fn reward(&mut self, delta: i32, indicator: &str) {
        self.risk_score -= delta;
        self.positive_indicators.push(indicator.to_string());
    }
}

/// Score a token from its metrics and profile. Pure and deterministic.
pub fn assess_risk(metrics: &Metrics, profile: &TokenProfile) -> RiskAssessment {
    let mut assessment = RiskAssessment::default();

    if metrics.liquidity_usd < LOW_LIQUIDITY_USD {
        assessment.penalize(20, FLAG_VERY_LOW_LIQUIDITY);
    } else if metrics.liquidity_usd > STRONG_LIQUIDITY_USD {
        assessment.reward(10, INDICATOR_STRONG_LIQUIDITY);
    }

    if let Some(ratio) = metrics.volume_to_liquidity_ratio {
        if ratio > SUSPICIOUS_VOLUME_RATIO {
            assessment.penalize(15, FLAG_SUSPICIOUS_RATIO);
        }
    }

    if profile.has_website() {
        assessment.reward(5, INDICATOR_HAS_WEBSITE);
    }

    if profile.has_description() {
        assessment.reward(5, INDICATOR_HAS_DESCRIPTION);
    }

    assessment
}

/// Enriched record for one token's primary pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub token_address: String,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub chain: String,
    pub dex_id: Option<String>,
    pub pair_address: String,
    pub quote_token: Option<String>,
    /// Pair creation time, epoch milliseconds
    pub creation_time: Option<i64>,
    pub profile_info: ProfileInfo,
    pub metrics: Metrics,
    pub risk_score: i32,
    pub flags: Vec<String>,
    pub positive_indicators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_reports: Vec<AgentReport>,
}

impl Analysis {
    pub fn symbol(&self) -> &str {
        self.token_symbol.as_deref().unwrap_or("???")
    }

    /// Flattened view handed to agent collaborators
    pub fn token_data(&self) -> serde_json::Value {
        serde_json::json!({
            "token_address": self.token_address,
            "token_name": self.token_name,
            "token_symbol": self.token_symbol,
            "chain": self.chain,
            "dex_id": self.dex_id,
            "pair_address": self.pair_address,
            "metrics": self.metrics,
            "profile_info": self.profile_info,
            "risk_score": self.risk_score,
            "flags": self.flags,
            "positive_indicators": self.positive_indicators,
        })
    }
}

/// Analyze a profile against its primary pair
pub fn analyze_token(profile: &TokenProfile, pair: &TradingPair) -> Result<Analysis> {
    analyze_token_at(profile, pair, Utc::now())
}

/// Same as [`analyze_token`] with an explicit analysis timestamp
pub fn analyze_token_at(
    profile: &TokenProfile,
    pair: &TradingPair,
    timestamp: DateTime<Utc>,
) -> Result<Analysis> {
    let pair_address = pair
        .pair_address
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or(Error::MissingField("pairAddress"))?;

    let token_address = pair
        .base_token
        .address
        .clone()
        .or_else(|| profile.token_address.clone())
        .ok_or(Error::MissingField("tokenAddress"))?;

    let chain = pair
        .chain_id
        .clone()
        .or_else(|| profile.chain_id.clone())
        .ok_or(Error::MissingField("chainId"))?;

    let metrics = Metrics::from_pair(pair);
    let RiskAssessment {
        risk_score,
        flags,
        positive_indicators,
    } = assess_risk(&metrics, profile);

    Ok(Analysis {
        url: profile.url.clone(),
        timestamp,
        token_address,
        token_name: pair.base_token.name.clone(),
        token_symbol: pair.base_token.symbol.clone(),
        chain,
        dex_id: pair.dex_id.clone(),
        pair_address,
        quote_token: pair.quote_token.symbol.clone(),
        creation_time: pair.pair_created_at,
        profile_info: ProfileInfo::from(profile),
        metrics,
        risk_score,
        flags,
        positive_indicators,
        agent_reports: Vec::new(),
    })
}
