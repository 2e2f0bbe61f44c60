//! Human-readable alerts for promising tokens

use tracing::info;

use crate::scanner::analyzer::Analysis;

const NA: &str = "N/A";

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(NA)
}

/// Render the alert text. Missing values show as "N/A".
pub fn format_alert(analysis: &Analysis) -> String {
    let metrics = &analysis.metrics;
    let profile = &analysis.profile_info;

    let mut msg = format!(
        r#"
🔍 Promising Token Detected!
Dexscreener: {}
Name: {} ({})
Address: {}
Chain: {}
DEX: {}
Pair Address: {}
Price: ${:.8}
Liquidity: ${:.2}
24h Volume: ${:.2}
Description: {}
Type: {}
Tags: {}
Risk Score: {}
Positive Indicators: {}
Flags: {}"#,
        or_na(analysis.url.as_deref()),
        or_na(analysis.token_name.as_deref()),
        or_na(analysis.token_symbol.as_deref()),
        analysis.token_address,
        analysis.chain,
        or_na(analysis.dex_id.as_deref()),
        analysis.pair_address,
        metrics.price_usd,
        metrics.liquidity_usd,
        metrics.volume_24h,
        or_na(profile.description.as_deref()),
        or_na(profile.kind.as_deref()),
        profile.tags.join(", "),
        analysis.risk_score,
        analysis.positive_indicators.join(", "),
        analysis.flags.join(", "),
    );

    for report in &analysis.agent_reports {
        msg.push_str(&format!("\n{} agent: {}", report.agent_type, report.analysis));
    }

    msg
}

/// Emit the alert through the log
pub fn alert(analysis: &Analysis) {
    info!(target: "dex_token_scanner::alert", "{}", format_alert(analysis));
}
