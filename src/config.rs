//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::agents::AgentKind;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub criteria: CriteriaConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Market data provider connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Scan loop pacing
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Ceiling for rate-limited provider calls
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Sleep between completed cycles
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Sleep after a failed cycle
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    /// Tokens enriched in parallel within one cycle (1 = strictly sequential)
    #[serde(default = "default_max_concurrent_tokens")]
    pub max_concurrent_tokens: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            cycle_interval_secs: default_cycle_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            max_concurrent_tokens: default_max_concurrent_tokens(),
        }
    }
}

impl ScannerConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// Opportunity thresholds. Defaults are the fixed promising-token rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaConfig {
    /// Highest risk score still considered promising (inclusive)
    #[serde(default = "default_max_risk_score")]
    pub max_risk_score: i32,
    /// Liquidity must be strictly above this
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: f64,
    /// 24h volume must be strictly above this
    #[serde(default = "default_min_volume_24h")]
    pub min_volume_24h: f64,
    /// Flag count must be strictly below this
    #[serde(default = "default_max_flags")]
    pub max_flags: usize,
    #[serde(default = "default_true")]
    pub require_social_links: bool,
    #[serde(default = "default_true")]
    pub require_description: bool,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            max_risk_score: default_max_risk_score(),
            min_liquidity_usd: default_min_liquidity_usd(),
            min_volume_24h: default_min_volume_24h(),
            max_flags: default_max_flags(),
            require_social_links: true,
            require_description: true,
        }
    }
}

/// Export artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_json_path")]
    pub json_path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            json_path: default_json_path(),
        }
    }
}

/// Optional LLM agent commentary
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Ollama server base URL
    #[serde(default = "default_agents_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_agents_model")]
    pub model: String,
    #[serde(default = "default_agents_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_agent_kinds")]
    pub kinds: Vec<AgentKind>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_agents_endpoint(),
            model: default_agents_model(),
            timeout_ms: default_agents_timeout_ms(),
            kinds: default_agent_kinds(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_cycle_interval_secs() -> u64 {
    60
}

fn default_error_backoff_secs() -> u64 {
    30
}

fn default_max_concurrent_tokens() -> usize {
    1
}

fn default_max_risk_score() -> i32 {
    50
}

fn default_min_liquidity_usd() -> f64 {
    50_000.0
}

fn default_min_volume_24h() -> f64 {
    10_000.0
}

fn default_max_flags() -> usize {
    3
}

fn default_csv_path() -> String {
    "promising_tokens.csv".to_string()
}

fn default_json_path() -> String {
    "token_analysis.json".to_string()
}

fn default_agents_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_agents_model() -> String {
    "llama2".to_string()
}

fn default_agents_timeout_ms() -> u64 {
    60_000
}

fn default_agent_kinds() -> Vec<AgentKind> {
    vec![AgentKind::Liquidity, AgentKind::Sentiment, AgentKind::Security]
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("api.base_url", default_base_url())?
            .set_default("api.timeout_ms", default_timeout_ms() as i64)?
            .set_default("scanner.requests_per_minute", default_requests_per_minute() as i64)?
            .set_default("scanner.cycle_interval_secs", default_cycle_interval_secs() as i64)?
            .set_default("scanner.error_backoff_secs", default_error_backoff_secs() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix DEXSCAN_)
            .add_source(
                config::Environment::with_prefix("DEXSCAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid api.base_url: {}", self.api.base_url))?;

        if self.api.timeout_ms == 0 {
            anyhow::bail!("api.timeout_ms must be positive");
        }

        if self.scanner.requests_per_minute == 0 {
            anyhow::bail!("scanner.requests_per_minute must be positive");
        }

        if self.scanner.max_concurrent_tokens == 0 {
            anyhow::bail!("scanner.max_concurrent_tokens must be at least 1");
        }

        if self.criteria.min_liquidity_usd < 0.0 || self.criteria.min_volume_24h < 0.0 {
            anyhow::bail!("criteria thresholds cannot be negative");
        }

        if self.export.csv_path.trim().is_empty() || self.export.json_path.trim().is_empty() {
            anyhow::bail!("export paths cannot be empty");
        }

        if self.agents.enabled {
            url::Url::parse(&self.agents.endpoint)
                .with_context(|| format!("Invalid agents.endpoint: {}", self.agents.endpoint))?;
            if self.agents.kinds.is_empty() {
                tracing::warn!("agents.enabled is set but no agent kinds are configured");
            }
        }

        Ok(())
    }

    /// Get configuration for display
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  API:
    base_url: {}
    timeout: {}ms
  Scanner:
    requests_per_minute: {}
    cycle_interval: {}s
    error_backoff: {}s
    max_concurrent_tokens: {}
  Criteria:
    max_risk_score: {}
    min_liquidity: ${}
    min_volume_24h: ${}
    max_flags: < {}
    require_social_links: {}
    require_description: {}
  Export:
    csv: {}
    json: {}
  Agents:
    enabled: {}
    endpoint: {}
    model: {}
    kinds: {:?}
"#,
            mask_url(&self.api.base_url),
            self.api.timeout_ms,
            self.scanner.requests_per_minute,
            self.scanner.cycle_interval_secs,
            self.scanner.error_backoff_secs,
            self.scanner.max_concurrent_tokens,
            self.criteria.max_risk_score,
            self.criteria.min_liquidity_usd,
            self.criteria.min_volume_24h,
            self.criteria.max_flags,
            self.criteria.require_social_links,
            self.criteria.require_description,
            self.export.csv_path,
            self.export.json_path,
            self.agents.enabled,
            mask_url(&self.agents.endpoint),
            self.agents.model,
            self.agents.kinds,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            scanner: ScannerConfig::default(),
            criteria: CriteriaConfig::default(),
            export: ExportConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}
