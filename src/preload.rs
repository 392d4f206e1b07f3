//! Batch preloading behind the loading screen.
//!
//! Every asset in the batch gets exactly one probe, raced against a per-kind
//! timeout. A probe can settle by loading, erroring or timing out and all
//! three count as progress: a broken asset must never keep the visitor on the
//! loading screen. The run resolves once, after every gating probe settled and
//! the display delay elapsed, unless it was cancelled first.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::asset::{AssetBatch, AssetDescriptor, AssetKind};
use crate::error::MediaError;
use crate::probe::Probe;

/// Which assets gate the reveal of the main content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Wait for every asset in the batch.
    FullBatch,
    /// Wait only for `locators`, and never longer than `max_wait_ms` overall.
    Critical {
        locators: Vec<String>,
        max_wait_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadSettings {
    pub image_timeout_ms: u64,
    pub video_timeout_ms: u64,
    /// Time the bar sits at 100% before the content is revealed.
    pub display_delay_ms: u64,
    pub readiness: ReadinessPolicy,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            image_timeout_ms: 10_000,
            video_timeout_ms: 15_000,
            display_delay_ms: 800,
            readiness: ReadinessPolicy::FullBatch,
        }
    }
}

impl PreloadSettings {
    pub fn timeout_for(&self, kind: AssetKind) -> Duration {
        match kind {
            AssetKind::Image => Duration::from_millis(self.image_timeout_ms),
            AssetKind::Video => Duration::from_millis(self.video_timeout_ms),
        }
    }

    pub fn display_delay(&self) -> Duration {
        Duration::from_millis(self.display_delay_ms)
    }
}

/// Settled-probe counter for one run. The total is fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    settled: usize,
    total: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self { settled: 0, total }
    }

    /// Count one more settled probe and return the new percentage.
    pub fn settle(&mut self) -> u8 {
        self.settled = (self.settled + 1).min(self.total);
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.settled * 100 / self.total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.settled >= self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    Loaded,
    Errored,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub loaded: usize,
    pub errored: usize,
    pub timed_out: usize,
    /// The critical-asset wait cap fired before every gating probe settled.
    pub capped: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            loaded: 0,
            errored: 0,
            timed_out: 0,
            capped: false,
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, reason: SettleReason) {
        match reason {
            SettleReason::Loaded => self.loaded += 1,
            SettleReason::Errored => self.errored += 1,
            SettleReason::TimedOut => self.timed_out += 1,
        }
    }

    pub fn settled(&self) -> usize {
        self.loaded + self.errored + self.timed_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(BatchReport),
    Cancelled,
}

/// Receives the progress percentage after each settle.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl ProgressSink for futures::channel::mpsc::UnboundedSender<u8> {
    fn on_progress(&self, percent: u8) {
        // The receiver goes away with the loading screen
        let _ = self.unbounded_send(percent);
    }
}

pub struct BatchLoader {
    probe: Arc<dyn Probe>,
    settings: PreloadSettings,
}

impl BatchLoader {
    pub fn new(probe: Arc<dyn Probe>, settings: PreloadSettings) -> Self {
        Self { probe, settings }
    }

    /// Probe every gating asset in `batch` and resolve once they have all settled.
    ///
    /// Progress is reported to `sink` after each settle and is non-decreasing;
    /// 100 is always the last value reported by a completed run. Once `cancel`
    /// fires nothing more reaches `sink` and the run resolves to
    /// [`RunOutcome::Cancelled`]. In-flight probes are left to finish on their
    /// own; only their results are dropped.
    pub async fn run(
        &self,
        batch: &AssetBatch,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let started = Instant::now();

        let (gating, deadline) = match &self.settings.readiness {
            ReadinessPolicy::FullBatch => (batch.clone(), None),
            ReadinessPolicy::Critical {
                locators,
                max_wait_ms,
            } => (
                batch.retain_locators(locators),
                Some(started + Duration::from_millis(*max_wait_ms)),
            ),
        };

        log::info!(
            "Preloading {} of {} assets ({:?})",
            gating.len(),
            batch.len(),
            self.settings.readiness
        );

        if gating.is_empty() {
            log::debug!("Nothing gates the reveal");
        }

        let mut progress = BatchProgress::new(gating.len());
        let mut report = BatchReport::new(gating.len());
        let mut last_emitted: Option<u8> = None;

        let mut pending: FuturesUnordered<_> = gating
            .iter()
            .cloned()
            .map(|asset| {
                let probe = Arc::clone(&self.probe);
                let budget = self.settings.timeout_for(asset.kind);
                async move {
                    let locator = asset.locator.clone();
                    match tokio::spawn(settle(probe, asset, budget)).await {
                        Ok(reason) => reason,
                        Err(e) => {
                            log::error!("Probe for {} aborted: {}", locator, e);
                            SettleReason::Errored
                        }
                    }
                }
            })
            .collect();

        let cap = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(cap);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("Preload cancelled after {} settles", report.settled());
                    return RunOutcome::Cancelled;
                }
                _ = &mut cap => {
                    log::warn!(
                        "Critical assets not ready after {:?} ({} of {} settled), revealing anyway",
                        started.elapsed(),
                        report.settled(),
                        report.total
                    );
                    report.capped = true;
                    break;
                }
                next = pending.next() => match next {
                    Some(reason) => {
                        report.record(reason);
                        let percent = progress.settle();
                        sink.on_progress(percent);
                        last_emitted = Some(percent);
                    }
                    None => break,
                },
            }
        }

        debug_assert!(report.capped || progress.is_complete());
        if last_emitted != Some(100) {
            sink.on_progress(100);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RunOutcome::Cancelled,
            _ = tokio::time::sleep(self.settings.display_delay()) => {}
        }

        report.elapsed = started.elapsed();
        log::info!(
            "Preload complete in {:?}: {} loaded, {} errored, {} timed out",
            report.elapsed,
            report.loaded,
            report.errored,
            report.timed_out
        );
        RunOutcome::Completed(report)
    }
}

/// Race one probe against its budget. Every path is a successful settle.
async fn settle(probe: Arc<dyn Probe>, asset: AssetDescriptor, budget: Duration) -> SettleReason {
    match tokio::time::timeout(budget, probe.probe(&asset)).await {
        Ok(Ok(())) => SettleReason::Loaded,
        Ok(Err(e @ MediaError::LoadTimeout { .. })) => {
            log::warn!("{}", e);
            SettleReason::TimedOut
        }
        Ok(Err(e)) => {
            log::warn!("{}", e);
            SettleReason::Errored
        }
        Err(_) => {
            log::warn!(
                "{}",
                MediaError::LoadTimeout {
                    locator: asset.locator,
                    kind: asset.kind,
                    budget,
                }
            );
            SettleReason::TimedOut
        }
    }
}
