//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dexscreener::{DexScreenerClient, MarketDataSource, TokenProfile, TradingPair};
use crate::scanner::{analyze_token, OpportunityEvaluator, ScanLoop};

/// Run the scanner until Ctrl-C, or a single cycle with `once`
pub async fn scan(config: &Config, once: bool) -> Result<()> {
    info!("Starting DexScreener token scanner...");
    info!(
        "Rate limit: {} req/min, cycle interval: {}s, workers: {}",
        config.scanner.requests_per_minute,
        config.scanner.cycle_interval_secs,
        config.scanner.max_concurrent_tokens
    );
    if config.agents.enabled {
        info!(
            "Agents enabled: {:?} via {} ({})",
            config.agents.kinds, config.agents.endpoint, config.agents.model
        );
    }

    let client = DexScreenerClient::new(&config.api).context("Failed to create DexScreener client")?;
    let scanner = Arc::new(
        ScanLoop::from_config(Arc::new(client), config).context("Failed to initialize scanner")?,
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, stopping scanner...");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    if once {
        scanner.run_once(&cancel).await;
    } else {
        scanner.clone().run(cancel).await;
    }

    let promising = scanner.promising_tokens().await;
    println!("\n=== SCAN SUMMARY ===\n");
    println!("Cycles: {} ({} failed)", scanner.stats().cycles(), scanner.stats().failures());
    println!("Tokens analyzed: {}", scanner.dedup().len());
    println!("Promising tokens: {}", promising.len());
    for analysis in &promising {
        println!(
            "  {} on {} (risk {}) {}",
            analysis.symbol(),
            analysis.chain,
            analysis.risk_score,
            analysis.url.as_deref().unwrap_or(analysis.pair_address.as_str())
        );
    }
    if !promising.is_empty() {
        println!("\nResults written to {} and {}", config.export.csv_path, config.export.json_path);
    }

    Ok(())
}

/// What `inspect` looks at
#[derive(Debug, Clone, Copy)]
pub enum InspectTarget<'a> {
    /// Token address; its primary pair is used
    Token(&'a str),
    Pair(&'a str),
}

/// Fetch, analyze and evaluate one token without touching scan state
pub async fn inspect(config: &Config, chain: &str, target: InspectTarget<'_>) -> Result<()> {
    let client = DexScreenerClient::new(&config.api).context("Failed to create DexScreener client")?;
    let (profile, pair) = resolve(&client, chain, target).await?;
    report(config, &profile, &pair)
}

/// Find the pair to inspect and the best profile available for its token
pub async fn resolve(
    source: &dyn MarketDataSource,
    chain: &str,
    target: InspectTarget<'_>,
) -> Result<(TokenProfile, TradingPair)> {
    let (pair, token) = match target {
        InspectTarget::Token(token) => {
            let pair = source
                .fetch_pairs_for_token(chain, token)
                .await
                .into_iter()
                .next()
                .with_context(|| format!("No trading pairs found for {} on {}", token, chain))?;
            (pair, Some(token.to_string()))
        }
        InspectTarget::Pair(pair_address) => {
            let pair = source
                .fetch_pair(chain, pair_address)
                .await
                .with_context(|| format!("Pair {} not found on {}", pair_address, chain))?;
            let token = pair.base_token.address.clone();
            (pair, token)
        }
    };

    let profile = match token {
        Some(token) => find_profile(source, chain, &token).await,
        None => bare_profile(chain, None),
    };
    Ok((profile, pair))
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Look the token up in the latest profiles. Tokens without a recent
/// profile are analyzed without social signals.
async fn find_profile(source: &dyn MarketDataSource, chain: &str, token: &str) -> TokenProfile {
    let found = source
        .fetch_latest_profiles()
        .await
        .into_iter()
        .find(|p| p.target() == Some((chain, token)));

    found.unwrap_or_else(|| {
        warn!("No recent profile for {}; social signals unavailable", token);
        bare_profile(chain, Some(token))
    })
}

fn bare_profile(chain: &str, token: Option<&str>) -> TokenProfile {
    TokenProfile {
        chain_id: Some(chain.to_string()),
        token_address: token.map(str::to_string),
        ..Default::default()
    }
}

fn report(config: &Config, profile: &TokenProfile, pair: &TradingPair) -> Result<()> {
    let analysis = analyze_token(profile, pair)?;
    let evaluation = OpportunityEvaluator::new(config.criteria.clone()).evaluate(&analysis);

    let metrics = &analysis.metrics;

    println!("\n=== {} ({}) ===\n", analysis.symbol(), analysis.chain);
    println!("Pair: {}", analysis.pair_address);
    println!("Token: {}", analysis.token_address);
    println!("Price: ${:.8}", metrics.price_usd);
    println!("Liquidity: ${:.2}", metrics.liquidity_usd);
    println!("24h Volume: ${:.2}", metrics.volume_24h);
    println!(
        "Price change: 5m {:+.2}%, 1h {:+.2}%, 24h {:+.2}%",
        metrics.price_change_5m, metrics.price_change_1h, metrics.price_change_24h
    );
    if let Some(ratio) = metrics.volume_to_liquidity_ratio {
        println!("Volume/liquidity: {:.2}", ratio);
    }
    println!("Social links: {}", analysis.profile_info.social_links.len());
    println!("Risk score: {}", analysis.risk_score);
    println!("Flags: {}", analysis.flags.join(", "));
    println!("Positive indicators: {}", analysis.positive_indicators.join(", "));
    println!();
    if evaluation.is_promising() {
        println!("Verdict: PROMISING");
    } else {
        println!("Verdict: not promising ({})", evaluation.summary());
    }

    Ok(())
}
