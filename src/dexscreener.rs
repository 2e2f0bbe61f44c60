// DexScreener API client for new token discovery
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileLink {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Discovery record from the latest token profiles feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenProfile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<String>,
    #[serde(rename = "tokenAddress", default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub links: Vec<ProfileLink>,
}

impl TokenProfile {
    /// Chain and token address, if the profile carries both
    pub fn target(&self) -> Option<(&str, &str)> {
        let chain = self.chain_id.as_deref().filter(|c| !c.is_empty())?;
        let token = self.token_address.as_deref().filter(|t| !t.is_empty())?;
        Some((chain, token))
    }

    pub fn has_website(&self) -> bool {
        self.links
            .iter()
            .any(|link| link.kind.as_deref() == Some("website"))
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .map(|d| !d.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(default, deserialize_with = "lenient::f64")]
    pub m5: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h1: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h6: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Liquidity {
    #[serde(default, deserialize_with = "lenient::f64")]
    pub usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub base: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default, deserialize_with = "lenient::f64")]
    pub m5: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h1: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h6: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// One token/quote pairing on one chain and DEX
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingPair {
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<String>,
    #[serde(rename = "dexId", default)]
    pub dex_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "pairAddress", default)]
    pub pair_address: Option<String>,
    #[serde(rename = "baseToken", default)]
    pub base_token: PairToken,
    #[serde(rename = "quoteToken", default)]
    pub quote_token: PairToken,
    #[serde(rename = "priceNative", default, deserialize_with = "lenient::f64")]
    pub price_native: Option<f64>,
    #[serde(rename = "priceUsd", default, deserialize_with = "lenient::f64")]
    pub price_usd: Option<f64>,
    #[serde(rename = "priceChange", default)]
    pub price_change: Option<PriceChange>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub fdv: Option<f64>,
    #[serde(rename = "marketCap", default, deserialize_with = "lenient::f64")]
    pub market_cap: Option<f64>,
    #[serde(rename = "pairCreatedAt", default, deserialize_with = "lenient::i64")]
    pub pair_created_at: Option<i64>,
}

impl TradingPair {
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn volume_24h(&self) -> f64 {
        self.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0)
    }

    pub fn price_usd(&self) -> f64 {
        self.price_usd.unwrap_or(0.0)
    }

    /// Price change percentages over (5m, 1h, 24h), absent windows as 0
    pub fn price_changes(&self) -> (f64, f64, f64) {
        self.price_change
            .as_ref()
            .map(|pc| {
                (
                    pc.m5.unwrap_or(0.0),
                    pc.h1.unwrap_or(0.0),
                    pc.h24.unwrap_or(0.0),
                )
            })
            .unwrap_or((0.0, 0.0, 0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsResponse {
    #[serde(default)]
    pub pairs: Option<Vec<TradingPair>>,
}

/// Source of discovery profiles and trading pairs.
///
/// Implementations never fail: provider errors are logged and surface as
/// empty results. Retrying is left to the caller.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current discovery feed
    async fn fetch_latest_profiles(&self) -> Vec<TokenProfile>;

    /// All pairs for a token on a chain, primary pair first
    async fn fetch_pairs_for_token(&self, chain_id: &str, token_address: &str) -> Vec<TradingPair>;

    /// Detail for a single pair
    async fn fetch_pair(&self, _chain_id: &str, _pair_address: &str) -> Option<TradingPair> {
        None
    }
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: Url,
}

impl DexScreenerClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL from path segments (segments are percent-encoded)
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Fetch latest token profiles
    pub async fn try_latest_profiles(&self) -> Result<Vec<TokenProfile>> {
        let url = self.endpoint(&["token-profiles", "latest", "v1"])?;
        let profiles: Vec<TokenProfile> = self.get_json(url).await?;
        info!("Retrieved {} token profiles", profiles.len());
        Ok(profiles)
    }

    /// Fetch all pairs for a token
    pub async fn try_pairs_for_token(
        &self,
        chain_id: &str,
        token_address: &str,
    ) -> Result<Vec<TradingPair>> {
        let url = self.endpoint(&["tokens", "v1", chain_id, token_address])?;
        let pairs: Vec<TradingPair> = self.get_json(url).await?;
        debug!("Retrieved {} pairs for token {}", pairs.len(), token_address);
        Ok(pairs)
    }

    /// Fetch detail for one pair
    pub async fn try_pair(&self, chain_id: &str, pair_address: &str) -> Result<Option<TradingPair>> {
        let url = self.endpoint(&["latest", "dex", "pairs", chain_id, pair_address])?;
        let data: PairsResponse = self.get_json(url).await?;
        Ok(data.pairs.and_then(|pairs| pairs.into_iter().next()))
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch_latest_profiles(&self) -> Vec<TokenProfile> {
        self.try_latest_profiles().await.unwrap_or_else(|e| {
            log_fetch_error("token profiles", &e);
            Vec::new()
        })
    }

    async fn fetch_pairs_for_token(&self, chain_id: &str, token_address: &str) -> Vec<TradingPair> {
        self.try_pairs_for_token(chain_id, token_address)
            .await
            .unwrap_or_else(|e| {
                log_fetch_error(&format!("pairs for {}/{}", chain_id, token_address), &e);
                Vec::new()
            })
    }

    async fn fetch_pair(&self, chain_id: &str, pair_address: &str) -> Option<TradingPair> {
        self.try_pair(chain_id, pair_address)
            .await
            .unwrap_or_else(|e| {
                log_fetch_error(&format!("pair {}/{}", chain_id, pair_address), &e);
                None
            })
    }
}

/// Provider failures become empty results; transient ones are only warned about
fn log_fetch_error(what: &str, e: &Error) {
    if e.is_retryable() {
        warn!("Error fetching {} (retrying next cycle): {}", what, e);
    } else if e.is_transport() {
        error!("Error fetching {}: {}", what, e);
    } else {
        error!("Unexpected error fetching {}: {}", what, e);
    }
}

/// Tolerant numeric decoding: numbers and numeric strings are accepted,
/// anything else decodes as absent.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(to_f64).filter(|v| v.is_finite()))
    }

    pub fn i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }

    /// Lists tolerate `null` and drop entries that fail to decode
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    fn to_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR_JSON: &str = r#"{
        "chainId": "solana",
        "dexId": "raydium",
        "url": "https://dexscreener.com/solana/pair1",
        "pairAddress": "pair1",
        "baseToken": {"address": "mint1", "name": "Test Token", "symbol": "TEST"},
        "quoteToken": {"address": "So11111111111111111111111111111111111111112", "symbol": "SOL"},
        "priceNative": "0.000001",
        "priceUsd": "0.00023",
        "priceChange": {"m5": 1.5, "h1": -3.2, "h24": 40},
        "volume": {"h24": 20000.5},
        "liquidity": {"usd": 75000, "base": 100, "quote": 50},
        "fdv": 230000,
        "pairCreatedAt": 1718000000000
    }"#;

    #[test]
    fn test_pair_deserialize() {
        let pair: TradingPair = serde_json::from_str(PAIR_JSON).unwrap();
        assert_eq!(pair.pair_address.as_deref(), Some("pair1"));
        assert_eq!(pair.base_token.symbol.as_deref(), Some("TEST"));
        assert_eq!(pair.liquidity_usd(), 75000.0);
        assert_eq!(pair.volume_24h(), 20000.5);
        assert!((pair.price_usd() - 0.00023).abs() < 1e-12);
        assert_eq!(pair.price_changes(), (1.5, -3.2, 40.0));
        assert_eq!(pair.pair_created_at, Some(1718000000000));
    }

    #[test]
    fn test_malformed_numbers_default_to_zero() {
        let json = r#"{
            "pairAddress": "pair2",
            "priceUsd": "not-a-price",
            "liquidity": {"usd": "abc"},
            "volume": {"h24": {"oops": true}},
            "priceChange": {"m5": null}
        }"#;
        let pair: TradingPair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.price_usd(), 0.0);
        assert_eq!(pair.liquidity_usd(), 0.0);
        assert_eq!(pair.volume_24h(), 0.0);
        assert_eq!(pair.price_changes(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let json = r#"{"liquidity": {"usd": "12500.75"}, "volume": {"h24": " 300 "}}"#;
        let pair: TradingPair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.liquidity_usd(), 12500.75);
        assert_eq!(pair.volume_24h(), 300.0);
    }

    #[test]
    fn test_profile_deserialize() {
        let json = r#"[{
            "url": "https://dexscreener.com/solana/mint1",
            "chainId": "solana",
            "tokenAddress": "mint1",
            "description": "A community token",
            "links": [
                {"type": "website", "label": "Website", "url": "https://example.com"},
                {"type": "twitter", "url": "https://x.com/example"}
            ]
        }, {"chainId": "base"}]"#;
        let profiles: Vec<TokenProfile> = serde_json::from_str(json).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].target(), Some(("solana", "mint1")));
        assert!(profiles[0].has_website());
        assert!(profiles[0].has_description());
        assert!(profiles[0].tags.is_empty());
        assert_eq!(profiles[1].target(), None);
        assert!(!profiles[1].has_website());
    }

    #[test]
    fn test_whitespace_description_counts() {
        let profile = TokenProfile {
            description: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(profile.has_description());

        let empty = TokenProfile {
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(!empty.has_description());
    }

    #[test]
    fn test_null_lists_do_not_reject_feed() {
        let json = r#"[
            {"chainId": "solana", "tokenAddress": "a", "tags": null, "links": null},
            {"chainId": "solana", "tokenAddress": "b", "links": [{"type": "twitter"}, "garbage", 7]}
        ]"#;
        let profiles: Vec<TokenProfile> = serde_json::from_str(json).unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(profiles[0].tags.is_empty());
        assert!(profiles[0].links.is_empty());
        assert_eq!(profiles[1].links.len(), 1);
        assert_eq!(profiles[1].links[0].kind.as_deref(), Some("twitter"));
    }

    fn local_client(base_url: &str) -> DexScreenerClient {
        DexScreenerClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_pair_over_http() {
        let body = format!(r#"{{"pairs": [{}]}}"#, PAIR_JSON);
        let (base_url, request) = crate::test_support::serve_once(200, &body).await;

        let pair = local_client(&base_url).fetch_pair("solana", "pair1").await.unwrap();
        assert_eq!(pair.pair_address.as_deref(), Some("pair1"));

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /latest/dex/pairs/solana/pair1 "));
        assert!(request.to_ascii_lowercase().contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_and_empty() {
        let (base_url, _request) = crate::test_support::serve_once(503, "{}").await;
        let client = local_client(&base_url);

        let err = client.try_latest_profiles().await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.is_retryable());
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_empty_results() {
        // nothing listens on the discard port
        let client = local_client("http://127.0.0.1:9");
        assert!(client.fetch_latest_profiles().await.is_empty());
        assert!(client.fetch_pairs_for_token("solana", "mint1").await.is_empty());
        assert!(client.fetch_pair("solana", "pair1").await.is_none());

        let err = client.try_latest_profiles().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_pairs_response_first_entry() {
        let json = format!(r#"{{"schemaVersion": "1.0.0", "pairs": [{}]}}"#, PAIR_JSON);
        let resp: PairsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp.pairs.unwrap().len(), 1);

        let empty: PairsResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(empty.pairs.is_none());
    }

    #[test]
    fn test_endpoint_building() {
        let client = DexScreenerClient::new(&ApiConfig::default()).unwrap();
        let url = client.endpoint(&["tokens", "v1", "solana", "mint1"]).unwrap();
        assert_eq!(url.as_str(), "https://api.dexscreener.com/tokens/v1/solana/mint1");

        let with_slash = DexScreenerClient::new(&ApiConfig {
            base_url: "https://proxy.example.com/dex/".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = with_slash
            .endpoint(&["token-profiles", "latest", "v1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/dex/token-profiles/latest/v1"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = DexScreenerClient::new(&ApiConfig::default()).unwrap();
        let url = client.endpoint(&["tokens", "v1", "solana", "a/b"]).unwrap();
        assert_eq!(url.path(), "/tokens/v1/solana/a%2Fb");
    }
}
