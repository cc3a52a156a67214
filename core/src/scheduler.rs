//! # Background Discovery
//!
//! Re-runs broadcast discovery on a fixed period so plugs that join
//! the network show up without anyone asking. Each pass claims the
//! scan slot like a foreground scan would; when a foreground scan is
//! in the way the pass is skipped, never queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use plugscout_common::discovery::{DiscoveryRequest, DiscoverySummary};
use plugscout_common::error::HubError;
use plugscout_common::scan::ScanKind;
use plugscout_common::{debug, info, warn};

use crate::discovery::DiscoveryOrchestrator;
use crate::progress::ScanProgress;

/// Counters shared between the scheduler task and status callers.
#[derive(Debug)]
pub struct DiscoveryStats {
    auto_enabled: AtomicBool,
    runs: AtomicU64,
    /// Seconds since the epoch; zero means never.
    last_run_unix: AtomicU64,
}

impl DiscoveryStats {
    pub fn new(auto_enabled: bool) -> Self {
        Self {
            auto_enabled: AtomicBool::new(auto_enabled),
            runs: AtomicU64::new(0),
            last_run_unix: AtomicU64::new(0),
        }
    }

    pub fn auto_enabled(&self) -> bool {
        self.auto_enabled.load(Ordering::SeqCst)
    }

    pub fn set_auto_enabled(&self, enabled: bool) {
        self.auto_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn mark_run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.last_run_unix.store(now, Ordering::SeqCst);
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn last_run(&self) -> Option<SystemTime> {
        match self.last_run_unix.load(Ordering::SeqCst) {
            0 => None,
            secs => Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
        }
    }
}

/// Owns the background task. Dropping the scheduler stops it.
#[derive(Debug)]
pub struct DiscoveryScheduler {
    handle: JoinHandle<()>,
}

impl DiscoveryScheduler {
    pub fn spawn(
        orchestrator: Arc<DiscoveryOrchestrator>,
        progress: ScanProgress,
        stats: Arc<DiscoveryStats>,
        period: Duration,
    ) -> Self {
        let handle = tokio::spawn(run_loop(orchestrator, progress, stats, period));
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for DiscoveryScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_loop(
    orchestrator: Arc<DiscoveryOrchestrator>,
    progress: ScanProgress,
    stats: Arc<DiscoveryStats>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The immediate first tick is consumed; the first real pass
    // happens one full interval after startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !stats.auto_enabled() {
            debug!("Background discovery is disabled, skipping pass");
            continue;
        }
        match tick(&orchestrator, &progress, &stats).await {
            Ok(summary) => {
                if !summary.strategy_failures.is_empty() {
                    warn!(
                        "Background discovery finished with failures: {}",
                        summary.strategy_failures.join("; ")
                    );
                    // Spread retries out so a flapping network is not
                    // hammered on an exact cadence.
                    let backoff = rand::random_range(5..=15);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }
            Err(HubError::ScanActive(_)) => {
                info!("Background discovery skipped: a scan is already running");
            }
            Err(e) => warn!("Background discovery failed: {e}"),
        }
    }
}

/// One scheduled pass: claim the slot, broadcast, merge, release.
pub async fn tick(
    orchestrator: &DiscoveryOrchestrator,
    progress: &ScanProgress,
    stats: &DiscoveryStats,
) -> Result<DiscoverySummary, HubError> {
    let guard = progress.begin(ScanKind::Background, "background discovery", 0)?;
    let request = DiscoveryRequest {
        broadcast: true,
        ..DiscoveryRequest::default()
    };
    let summary = orchestrator.discover(&request, Some(&guard)).await;
    guard.finish(format!(
        "Background discovery complete, {} device(s) added",
        summary.added
    ));
    stats.mark_run();
    Ok(summary)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
