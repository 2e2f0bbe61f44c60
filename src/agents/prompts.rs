//! Prompt-driven agents, one per analysis domain

use async_trait::async_trait;
use std::sync::Arc;

use super::{AgentKind, AgentReport, OllamaClient, SubScorer, TokenAgent, TokenData};
use crate::error::{Error, Result};

const LIQUIDITY_PROMPT: &str = "Analyze the liquidity metrics for the following token:
{token_data}

Focus on:
1. Liquidity depth and stability
2. Volume to liquidity ratio
3. Liquidity provider concentration
4. Historical liquidity patterns

Provide a risk assessment and recommendation.";

const SENTIMENT_PROMPT: &str = "Analyze the social and community metrics for the token:
{token_data}

Evaluate:
1. Social media presence and engagement
2. Community growth and activity
3. Developer communication and transparency
4. Recent sentiment trends

Provide a sentiment analysis and community health assessment.";

const SECURITY_PROMPT: &str = "Perform security analysis for the token:
{token_data}

Check for:
1. Contract security patterns
2. Ownership concentration
3. Known vulnerabilities
4. Suspicious transaction patterns

Provide a security risk assessment.";

impl AgentKind {
    pub fn prompt_template(&self) -> &'static str {
        match self {
            AgentKind::Liquidity => LIQUIDITY_PROMPT,
            AgentKind::Sentiment => SENTIMENT_PROMPT,
            AgentKind::Security => SECURITY_PROMPT,
        }
    }

    /// Fill the template with pretty-printed token data
    pub fn render_prompt(&self, token_data: &TokenData) -> String {
        let data = serde_json::to_string_pretty(token_data).unwrap_or_else(|_| token_data.to_string());
        self.prompt_template().replace("{token_data}", &data)
    }
}

/// LLM-backed agent for a single domain
pub struct PromptAgent {
    kind: AgentKind,
    llm: Arc<OllamaClient>,
    scorer: Option<Arc<dyn SubScorer>>,
}

impl PromptAgent {
    pub fn new(kind: AgentKind, llm: Arc<OllamaClient>) -> Self {
        Self {
            kind,
            llm,
            scorer: None,
        }
    }

    /// Attach a sub-scorer for this agent's domain
    pub fn with_scorer(mut self, scorer: Arc<dyn SubScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }
}

#[async_trait]
impl TokenAgent for PromptAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn analyze(&self, token_data: &TokenData) -> Result<AgentReport> {
        let prompt = self.kind.render_prompt(token_data);
        let analysis = self.llm.generate(&prompt).await.map_err(|e| Error::Agent {
            agent: self.kind.to_string(),
            reason: e.to_string(),
        })?;

        Ok(AgentReport {
            agent_type: self.kind,
            analysis,
            score: self.scorer.as_ref().and_then(|s| s.score(token_data)),
        })
    }
}
