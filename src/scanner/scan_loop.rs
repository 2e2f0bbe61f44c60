//! Continuous discovery → enrichment → evaluation → alert/export loop
//!
//! Each cycle runs in its own task so a panic while processing one bad
//! response ends that cycle only; the loop logs it, backs off and carries on.
//! Cancellation is honoured at every suspension point.

use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agents::{self, TokenAgent};
use crate::config::{Config, CriteriaConfig};
use crate::dexscreener::{MarketDataSource, TokenProfile};
use crate::error::Result;
use crate::report::AlertExporter;
use crate::scanner::analyzer::{analyze_token, Analysis};
use crate::scanner::dedup::DedupStore;
use crate::scanner::evaluator::OpportunityEvaluator;
use crate::scanner::rate_limiter::RateLimiter;

/// Timing and throughput knobs for the loop
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Minimum spacing between rate-limited provider calls
    pub rate_limit_spacing: Duration,
    pub cycle_interval: Duration,
    pub error_backoff: Duration,
    pub max_concurrent_tokens: usize,
    pub agent_timeout: Duration,
    pub criteria: CriteriaConfig,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rate_limit_spacing: RateLimiter::new(config.scanner.requests_per_minute).spacing(),
            cycle_interval: config.scanner.cycle_interval(),
            error_backoff: config.scanner.error_backoff(),
            max_concurrent_tokens: config.scanner.max_concurrent_tokens.max(1),
            agent_timeout: Duration::from_millis(config.agents.timeout_ms),
            criteria: config.criteria.clone(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What happened to a single discovery profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    /// Profile lacks a chain id or token address
    Skipped,
    /// Provider returned no usable primary pair
    NoPairs,
    /// Primary pair was already analyzed
    Duplicate,
    /// Analysis could not be built; the record was dropped
    Dropped,
    /// Analyzed but not promising
    Rejected,
    Promising,
    Cancelled,
}

/// Per-cycle tallies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub profiles: usize,
    pub skipped: usize,
    pub pairs_missing: usize,
    pub duplicates: usize,
    pub analyzed: usize,
    pub dropped: usize,
    pub promising: usize,
    pub cancelled: bool,
}

impl CycleReport {
    pub fn log(&self) {
        info!(
            "Completed scan cycle: {} profiles, {} analyzed, {} promising, {} duplicates, {} without pairs, {} skipped, {} dropped",
            self.profiles,
            self.analyzed,
            self.promising,
            self.duplicates,
            self.pairs_missing,
            self.skipped,
            self.dropped
        );
    }

    fn record(&mut self, outcome: TokenOutcome) {
        match outcome {
            TokenOutcome::Skipped => self.skipped += 1,
            TokenOutcome::NoPairs => self.pairs_missing += 1,
            TokenOutcome::Duplicate => self.duplicates += 1,
            TokenOutcome::Dropped => self.dropped += 1,
            TokenOutcome::Rejected => self.analyzed += 1,
            TokenOutcome::Promising => {
                self.analyzed += 1;
                self.promising += 1;
            }
            TokenOutcome::Cancelled => self.cancelled = true,
        }
    }
}

/// Lifetime counters
#[derive(Debug, Default)]
pub struct ScanStats {
    cycles: AtomicU64,
    failures: AtomicU64,
    analyzed: AtomicU64,
    promising: AtomicU64,
}

impl ScanStats {
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn analyzed(&self) -> u64 {
        self.analyzed.load(Ordering::Relaxed)
    }

    pub fn promising(&self) -> u64 {
        self.promising.load(Ordering::Relaxed)
    }
}

pub struct ScanLoop {
    source: Arc<dyn MarketDataSource>,
    limiter: RateLimiter,
    dedup: DedupStore,
    evaluator: OpportunityEvaluator,
    reporter: AlertExporter,
    agents: Vec<Arc<dyn TokenAgent>>,
    /// Every analysis that passed evaluation, in discovery order
    promising: Mutex<Vec<Analysis>>,
    settings: ScanSettings,
    stats: ScanStats,
    /// `total_tokens_analyzed` of the last successful export
    exported_total: AtomicUsize,
}

impl ScanLoop {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        reporter: AlertExporter,
        settings: ScanSettings,
    ) -> Self {
        Self {
            source,
            limiter: RateLimiter::with_spacing(settings.rate_limit_spacing),
            dedup: DedupStore::new(),
            evaluator: OpportunityEvaluator::new(settings.criteria.clone()),
            reporter,
            agents: Vec::new(),
            promising: Mutex::new(Vec::new()),
            settings,
            stats: ScanStats::default(),
            exported_total: AtomicUsize::new(0),
        }
    }

    /// Build the loop with everything the configuration asks for
    pub fn from_config(source: Arc<dyn MarketDataSource>, config: &Config) -> Result<Self> {
        let agents = agents::from_config(&config.agents)?;
        Ok(Self::new(
            source,
            AlertExporter::from_config(&config.export),
            ScanSettings::from_config(config),
        )
        .with_agents(agents))
    }

    pub fn with_agents(mut self, agents: Vec<Arc<dyn TokenAgent>>) -> Self {
        self.agents = agents;
        self
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Snapshot of the promising set
    pub async fn promising_tokens(&self) -> Vec<Analysis> {
        self.promising.lock().await.clone()
    }

    /// Run cycles until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            "Starting token scanner (spacing {:?}, cycle interval {:?}, workers {})",
            self.settings.rate_limit_spacing,
            self.settings.cycle_interval,
            self.settings.max_concurrent_tokens
        );

        while !cancel.is_cancelled() {
            let this = self.clone();
            let token = cancel.clone();
            let cycle = tokio::spawn(async move { this.run_cycle(&token).await });

            let pause = match cycle.await {
                Ok(report) if report.cancelled => break,
                Ok(report) => {
                    report.log();
                    self.settings.cycle_interval
                }
                Err(e) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    error!("Error during token scanning: {}", e);
                    self.settings.error_backoff
                }
            };

            debug!("Waiting {:?} before next scan", pause);
            if !sleep_or_cancel(pause, &cancel).await {
                break;
            }
        }

        info!(
            "Token scanner stopped after {} cycles ({} failed), {} promising tokens",
            self.stats.cycles(),
            self.stats.failures(),
            self.stats.promising()
        );
    }

    /// Single cycle outside the scheduler. Unlike [`ScanLoop::run`] a panic
    /// here propagates to the caller.
    pub async fn run_once(&self, cancel: &CancellationToken) -> CycleReport {
        let report = self.run_cycle(cancel).await;
        if !report.cancelled {
            report.log();
        }
        report
    }

    /// Run exactly one discovery cycle
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::default();

        let profiles = tokio::select! {
            _ = cancel.cancelled() => {
                report.cancelled = true;
                return report;
            }
            profiles = self.source.fetch_latest_profiles() => profiles,
        };

        report.profiles = profiles.len();
        if profiles.is_empty() {
            info!("No token profiles retrieved this cycle");
        } else {
            info!("Processing {} token profiles", profiles.len());

            let outcomes: Vec<TokenOutcome> = stream::iter(profiles)
                .map(|profile| async move { self.process_profile(&profile, cancel).await })
                .buffer_unordered(self.settings.max_concurrent_tokens)
                .collect()
                .await;

            for outcome in outcomes {
                report.record(outcome);
            }

            // pairs analyzed after the last promising hit still count
            self.refresh_snapshot().await;
        }

        self.stats.cycles.fetch_add(1, Ordering::Relaxed);
        self.stats
            .analyzed
            .fetch_add(report.analyzed as u64, Ordering::Relaxed);
        report
    }

    async fn process_profile(&self, profile: &TokenProfile, cancel: &CancellationToken) -> TokenOutcome {
        if cancel.is_cancelled() {
            return TokenOutcome::Cancelled;
        }

        let Some((chain, token)) = profile.target() else {
            return TokenOutcome::Skipped;
        };

        let pairs = tokio::select! {
            _ = cancel.cancelled() => return TokenOutcome::Cancelled,
            pairs = async {
                self.limiter.acquire().await;
                self.source.fetch_pairs_for_token(chain, token).await
            } => pairs,
        };

        // the first pair returned is the primary one
        let Some(pair) = pairs.into_iter().next() else {
            debug!(chain = %chain, token = %token, "No pairs for token");
            return TokenOutcome::NoPairs;
        };
        let Some(pair_address) = pair.pair_address.clone().filter(|p| !p.is_empty()) else {
            debug!(chain = %chain, token = %token, "Primary pair has no address");
            return TokenOutcome::NoPairs;
        };

        // released on drop unless committed, so a panic or cancellation
        // below leaves the pair eligible for a later cycle
        let Some(claim) = self.dedup.try_claim(&pair_address) else {
            return TokenOutcome::Duplicate;
        };

        let analysis = match analyze_token(profile, &pair) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(chain = %chain, pair = %pair_address, "Error analyzing token: {}", e);
                return TokenOutcome::Dropped;
            }
        };

        let evaluation = self.evaluator.evaluate(&analysis);
        if !evaluation.is_promising() {
            debug!(
                pair = %pair_address,
                risk_score = analysis.risk_score,
                "Not promising: {}",
                evaluation.summary()
            );
            claim.commit();
            return TokenOutcome::Rejected;
        }

        self.record_promising(analysis).await;
        claim.commit();
        TokenOutcome::Promising
    }

    /// Append to the promising set, alert and export. The set stays locked
    /// until the export finishes so exports never interleave.
    async fn record_promising(&self, mut analysis: Analysis) {
        if !self.agents.is_empty() {
            analysis.agent_reports =
                agents::run_agents(&self.agents, &analysis, self.settings.agent_timeout).await;
        }

        let mut promising = self.promising.lock().await;
        self.reporter.alert(&analysis);
        promising.push(analysis);
        self.stats.promising.fetch_add(1, Ordering::Relaxed);

        let total = self.dedup.len();
        if self.reporter.export(&promising, total).await {
            self.exported_total.store(total, Ordering::Relaxed);
        }
    }

    /// Re-export when more pairs were analyzed since the last export.
    /// Nothing is written until the first promising token is found.
    async fn refresh_snapshot(&self) {
        let promising = self.promising.lock().await;
        let total = self.dedup.len();
        if promising.is_empty() || total == self.exported_total.load(Ordering::Relaxed) {
            return;
        }
        if self.reporter.export(&promising, total).await {
            self.exported_total.store(total, Ordering::Relaxed);
        }
    }
}

/// Sleep for `duration`; false if cancelled first
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
