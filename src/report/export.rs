//! Persisted artifacts: a CSV of promising tokens and a JSON snapshot
//!
//! Each file is written to a `.tmp` sibling and renamed into place, CSV
//! first, so readers never see a partially written file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::scanner::analyzer::Analysis;

/// Structured snapshot as read back from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated: DateTime<Utc>,
    pub total_tokens_analyzed: usize,
    pub promising_tokens: Vec<Analysis>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    last_updated: DateTime<Utc>,
    total_tokens_analyzed: usize,
    promising_tokens: &'a [Analysis],
}

/// One flattened CSV row. Nested lists are JSON-encoded cells.
#[derive(Serialize)]
struct AnalysisRow<'a> {
    timestamp: String,
    url: Option<&'a str>,
    token_address: &'a str,
    token_name: Option<&'a str>,
    token_symbol: Option<&'a str>,
    chain: &'a str,
    dex_id: Option<&'a str>,
    pair_address: &'a str,
    quote_token: Option<&'a str>,
    creation_time: Option<i64>,
    description: Option<&'a str>,
    profile_type: Option<&'a str>,
    tags: String,
    social_links: String,
    liquidity_usd: f64,
    price_usd: f64,
    price_change_5m: f64,
    price_change_1h: f64,
    price_change_24h: f64,
    volume_24h: f64,
    volume_to_liquidity_ratio: Option<f64>,
    risk_score: i32,
    flags: String,
    positive_indicators: String,
    agent_reports: String,
}

impl<'a> AnalysisRow<'a> {
    fn new(a: &'a Analysis) -> Result<Self> {
        Ok(Self {
            timestamp: a.timestamp.to_rfc3339(),
            url: a.url.as_deref(),
            token_address: &a.token_address,
            token_name: a.token_name.as_deref(),
            token_symbol: a.token_symbol.as_deref(),
            chain: &a.chain,
            dex_id: a.dex_id.as_deref(),
            pair_address: &a.pair_address,
            quote_token: a.quote_token.as_deref(),
            creation_time: a.creation_time,
            description: a.profile_info.description.as_deref(),
            profile_type: a.profile_info.kind.as_deref(),
            tags: serde_json::to_string(&a.profile_info.tags)?,
            social_links: serde_json::to_string(&a.profile_info.social_links)?,
            liquidity_usd: a.metrics.liquidity_usd,
            price_usd: a.metrics.price_usd,
            price_change_5m: a.metrics.price_change_5m,
            price_change_1h: a.metrics.price_change_1h,
            price_change_24h: a.metrics.price_change_24h,
            volume_24h: a.metrics.volume_24h,
            volume_to_liquidity_ratio: a.metrics.volume_to_liquidity_ratio,
            risk_score: a.risk_score,
            flags: serde_json::to_string(&a.flags)?,
            positive_indicators: serde_json::to_string(&a.positive_indicators)?,
            agent_reports: serde_json::to_string(&a.agent_reports)?,
        })
    }
}

/// Render promising analyses as CSV. No rows means an empty file.
pub fn render_csv(promising: &[Analysis]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for analysis in promising {
        writer.serialize(AnalysisRow::new(analysis)?)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))
}

pub fn render_snapshot(promising: &[Analysis], total_tokens_analyzed: usize) -> Result<String> {
    let snapshot = SnapshotRef {
        last_updated: Utc::now(),
        total_tokens_analyzed,
        promising_tokens: promising,
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Writes both artifacts; concurrent exports are serialized
pub struct Exporter {
    csv_path: PathBuf,
    json_path: PathBuf,
    write_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_path: json_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.csv_path, &config.json_path)
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub async fn export(&self, promising: &[Analysis], total_tokens_analyzed: usize) -> Result<()> {
        let csv = render_csv(promising)?;
        let json = render_snapshot(promising, total_tokens_analyzed)?;

        let _guard = self.write_lock.lock().await;
        write_atomic(&self.csv_path, &csv).await?;
        write_atomic(&self.json_path, json.as_bytes()).await?;

        debug!(
            "Exported {} promising tokens ({} analyzed) to {} and {}",
            promising.len(),
            total_tokens_analyzed,
            self.csv_path.display(),
            self.json_path.display()
        );
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let export_err = |e: std::io::Error| Error::Export {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(export_err)?;
    }

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, contents).await.map_err(export_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(export_err(e));
    }
    Ok(())
}
