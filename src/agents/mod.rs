//! Optional LLM commentary on analyzed tokens
//!
//! Agents receive the assembled token data and return free text plus an
//! optional sub-score. Their output is attached to the analysis for humans
//! to read; it never feeds the risk score or the promising decision.

pub mod ollama;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AgentsConfig;
use crate::error::{Error, Result};
use crate::scanner::analyzer::Analysis;

pub use ollama::OllamaClient;
pub use prompts::PromptAgent;

/// Token data as handed to agents
pub type TokenData = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Liquidity,
    Sentiment,
    Security,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Liquidity => write!(f, "liquidity"),
            AgentKind::Sentiment => write!(f, "sentiment"),
            AgentKind::Security => write!(f, "security"),
        }
    }
}

/// What one agent had to say about a token
///
/// On the wire the sub-score is keyed by domain, e.g. `security_score`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReport {
    pub agent_type: AgentKind,
    pub analysis: String,
    /// Domain sub-score, if a scorer is plugged in
    pub score: Option<f64>,
}

impl AgentReport {
    pub fn score_key(&self) -> String {
        format!("{}_score", self.agent_type)
    }
}

impl Serialize for AgentReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("agent_type", &self.agent_type)?;
        map.serialize_entry("analysis", &self.analysis)?;
        map.serialize_entry(&self.score_key(), &self.score)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for AgentReport {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            agent_type: AgentKind,
            analysis: String,
            #[serde(flatten)]
            rest: std::collections::HashMap<String, serde_json::Value>,
        }

        let mut raw = Raw::deserialize(deserializer)?;
        let score = raw
            .rest
            .remove(&format!("{}_score", raw.agent_type))
            .and_then(|v| v.as_f64());
        Ok(AgentReport {
            agent_type: raw.agent_type,
            analysis: raw.analysis,
            score,
        })
    }
}

/// Capability interface for commentary agents
#[async_trait]
pub trait TokenAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn analyze(&self, token_data: &TokenData) -> Result<AgentReport>;
}

/// Independent sub-score for one agent domain
pub trait SubScorer: Send + Sync {
    fn score(&self, token_data: &TokenData) -> Option<f64>;
}

/// Build the configured agents, or none when disabled
pub fn from_config(config: &AgentsConfig) -> Result<Vec<Arc<dyn TokenAgent>>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let llm = Arc::new(OllamaClient::new(
        &config.endpoint,
        &config.model,
        Duration::from_millis(config.timeout_ms),
    )?);

    Ok(config
        .kinds
        .iter()
        .map(|kind| Arc::new(PromptAgent::new(*kind, llm.clone())) as Arc<dyn TokenAgent>)
        .collect())
}

/// Run every agent against an analysis. Failures and timeouts are logged
/// and left out of the result.
pub async fn run_agents(
    agents: &[Arc<dyn TokenAgent>],
    analysis: &Analysis,
    timeout: Duration,
) -> Vec<AgentReport> {
    if agents.is_empty() {
        return Vec::new();
    }

    let token_data = analysis.token_data();
    let calls = agents.iter().map(|agent| {
        let token_data = &token_data;
        async move {
            let kind = agent.kind();
            match tokio::time::timeout(timeout, agent.analyze(token_data)).await {
                Ok(result) => result,
                Err(_) => Err(Error::AgentTimeout(kind.to_string())),
            }
        }
    });

    let mut reports = Vec::new();
    for result in futures::future::join_all(calls).await {
        match result {
            Ok(report) => {
                debug!(agent = %report.agent_type, pair = %analysis.pair_address, "Agent report received");
                reports.push(report);
            }
            Err(e) => warn!(pair = %analysis.pair_address, "Agent analysis skipped: {}", e),
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentsConfig;
    use crate::dexscreener::{Liquidity, TokenProfile, TradingPair};
    use crate::scanner::analyzer::analyze_token;

    struct EchoAgent(AgentKind);

    #[async_trait]
    impl TokenAgent for EchoAgent {
        fn kind(&self) -> AgentKind {
            self.0
        }

        async fn analyze(&self, token_data: &TokenData) -> Result<AgentReport> {
            Ok(AgentReport {
                agent_type: self.0,
                analysis: format!("saw {}", token_data["pair_address"]),
                score: Some(1.0),
            })
        }
    }

    struct FailingAgent;

    #[async_trait]
    impl TokenAgent for FailingAgent {
        fn kind(&self) -> AgentKind {
            AgentKind::Security
        }

        async fn analyze(&self, _token_data: &TokenData) -> Result<AgentReport> {
            Err(Error::Agent {
                agent: "security".to_string(),
                reason: "model offline".to_string(),
            })
        }
    }

    struct SlowAgent;

    #[async_trait]
    impl TokenAgent for SlowAgent {
        fn kind(&self) -> AgentKind {
            AgentKind::Sentiment
        }

        async fn analyze(&self, _token_data: &TokenData) -> Result<AgentReport> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(AgentReport {
                agent_type: AgentKind::Sentiment,
                analysis: "late".to_string(),
                score: None,
            })
        }
    }

    fn analysis() -> Analysis {
        let profile = TokenProfile {
            chain_id: Some("solana".to_string()),
            token_address: Some("mint1".to_string()),
            ..Default::default()
        };
        let pair = TradingPair {
            pair_address: Some("pair1".to_string()),
            liquidity: Some(Liquidity {
                usd: Some(60_000.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        analyze_token(&profile, &pair).unwrap()
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_are_dropped() {
        let agents: Vec<Arc<dyn TokenAgent>> = vec![
            Arc::new(EchoAgent(AgentKind::Liquidity)),
            Arc::new(FailingAgent),
            Arc::new(SlowAgent),
        ];

        let reports = run_agents(&agents, &analysis(), Duration::from_millis(50)).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].agent_type, AgentKind::Liquidity);
        assert_eq!(reports[0].analysis, "saw \"pair1\"");
    }

    #[tokio::test]
    async fn test_no_agents_no_reports() {
        let reports = run_agents(&[], &analysis(), Duration::from_secs(1)).await;
        assert!(reports.is_empty());
    }

    #[test]
    fn test_disabled_config_builds_nothing() {
        let agents = from_config(&AgentsConfig::default()).unwrap();
        assert!(agents.is_empty());
    }

    #[test]
    fn test_enabled_config_builds_each_kind() {
        let config = AgentsConfig {
            enabled: true,
            kinds: vec![AgentKind::Liquidity, AgentKind::Security],
            ..Default::default()
        };
        let agents = from_config(&config).unwrap();
        let kinds: Vec<_> = agents.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![AgentKind::Liquidity, AgentKind::Security]);
    }

    #[test]
    fn test_report_serialization() {
        let report = AgentReport {
            agent_type: AgentKind::Sentiment,
            analysis: "quiet community".to_string(),
            score: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["agent_type"], "sentiment");
        assert!(json["sentiment_score"].is_null());
        assert!(json.get("score").is_none());
    }

    #[test]
    fn test_score_keyed_by_domain() {
        let report = AgentReport {
            agent_type: AgentKind::Security,
            analysis: "owner can mint".to_string(),
            score: Some(0.25),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["security_score"], 0.25);

        let back: AgentReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);

        // another domain's key is not this report's score
        let foreign: AgentReport = serde_json::from_value(serde_json::json!({
            "agent_type": "liquidity",
            "analysis": "deep pool",
            "security_score": 0.9
        }))
        .unwrap();
        assert_eq!(foreign.score, None);
    }
}
