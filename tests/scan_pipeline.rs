//! End-to-end pipeline against an in-memory market data source

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use dex_token_scanner::config::Config;
use dex_token_scanner::dexscreener::{MarketDataSource, TokenProfile, TradingPair};
use dex_token_scanner::report::Snapshot;
use dex_token_scanner::scanner::ScanLoop;

struct StaticSource {
    profiles: Vec<TokenProfile>,
    pairs: HashMap<String, Vec<TradingPair>>,
}

#[async_trait]
impl MarketDataSource for StaticSource {
    async fn fetch_latest_profiles(&self) -> Vec<TokenProfile> {
        self.profiles.clone()
    }

    async fn fetch_pairs_for_token(&self, _chain_id: &str, token_address: &str) -> Vec<TradingPair> {
        self.pairs.get(token_address).cloned().unwrap_or_default()
    }
}

/// Wire-shaped fixtures, decoded the same way provider responses are
fn source() -> StaticSource {
    let profiles: Vec<TokenProfile> = serde_json::from_value(serde_json::json!([
        {
            "url": "https://dexscreener.com/solana/mintgood",
            "chainId": "solana",
            "tokenAddress": "mintgood",
            "description": "Community owned",
            "links": [
                {"type": "website", "url": "https://good.example"},
                {"type": "twitter", "url": "https://x.com/good"}
            ]
        },
        {
            "chainId": "solana",
            "tokenAddress": "mintpump",
            "description": "To the moon",
            "links": [{"type": "twitter", "url": "https://x.com/pump"}]
        },
        {
            "chainId": "solana",
            "tokenAddress": "mintquiet"
        },
        {
            "description": "no chain, no address"
        }
    ]))
    .unwrap();

    let good: Vec<TradingPair> = serde_json::from_value(serde_json::json!([{
        "chainId": "solana",
        "dexId": "raydium",
        "pairAddress": "pairgood",
        "baseToken": {"address": "mintgood", "name": "Good", "symbol": "GOOD"},
        "quoteToken": {"symbol": "SOL"},
        "priceUsd": "0.0042",
        "liquidity": {"usd": 150000},
        "volume": {"h24": "90000"},
        "priceChange": {"m5": 1.5, "h1": "-3", "h24": 12}
    }]))
    .unwrap();

    // volume/liquidity ratio of 8 is flagged but still within limits
    let pump: Vec<TradingPair> = serde_json::from_value(serde_json::json!([{
        "chainId": "solana",
        "pairAddress": "pairpump",
        "baseToken": {"address": "mintpump", "symbol": "PUMP"},
        "liquidity": {"usd": 60000},
        "volume": {"h24": 480000}
    }]))
    .unwrap();

    let quiet: Vec<TradingPair> = serde_json::from_value(serde_json::json!([{
        "chainId": "solana",
        "pairAddress": "pairquiet",
        "baseToken": {"address": "mintquiet", "symbol": "QUIET"},
        "liquidity": {"usd": "n/a"},
        "volume": {"h24": null}
    }]))
    .unwrap();

    let mut pairs = HashMap::new();
    pairs.insert("mintgood".to_string(), good);
    pairs.insert("mintpump".to_string(), pump);
    pairs.insert("mintquiet".to_string(), quiet);
    StaticSource { profiles, pairs }
}

fn config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.scanner.requests_per_minute = 6000;
    config.export.csv_path = dir.path().join("promising.csv").display().to_string();
    config.export.json_path = dir.path().join("analysis.json").display().to_string();
    config
}

#[tokio::test]
async fn test_single_cycle_exports_promising_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let scanner = ScanLoop::from_config(Arc::new(source()), &config).unwrap();

    let report = scanner.run_once(&CancellationToken::new()).await;
    assert_eq!(report.profiles, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.analyzed, 3);
    assert_eq!(report.promising, 2);

    let promising = scanner.promising_tokens().await;
    let good = promising.iter().find(|a| a.pair_address == "pairgood").unwrap();
    assert_eq!(good.risk_score, -20);
    assert_eq!(good.metrics.price_usd, 0.0042);
    assert_eq!(good.metrics.price_change_1h, -3.0);
    assert_eq!(good.metrics.volume_to_liquidity_ratio, Some(0.6));
    assert!(good.flags.is_empty());

    let pump = promising.iter().find(|a| a.pair_address == "pairpump").unwrap();
    assert_eq!(pump.risk_score, 10);
    assert_eq!(pump.flags, vec!["suspicious volume/liquidity ratio".to_string()]);

    let snapshot: Snapshot =
        serde_json::from_str(&std::fs::read_to_string(&config.export.json_path).unwrap()).unwrap();
    assert_eq!(snapshot.total_tokens_analyzed, 3);
    assert_eq!(snapshot.promising_tokens.len(), 2);

    let mut reader = csv::Reader::from_path(&config.export.csv_path).unwrap();
    assert_eq!(reader.records().count(), 2);
}

#[tokio::test]
async fn test_continuous_run_does_not_repeat_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.scanner.cycle_interval_secs = 0;
    let scanner = Arc::new(ScanLoop::from_config(Arc::new(source()), &config).unwrap());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(scanner.clone().run(cancel.clone()));
    while scanner.stats().cycles() < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(scanner.stats().analyzed(), 3);
    assert_eq!(scanner.stats().promising(), 2);
    assert_eq!(scanner.dedup().len(), 3);
}
