//! # Discovery Orchestration
//!
//! Runs the requested discovery strategies and folds every candidate
//! address into the registry. One strategy failing is a line in the
//! summary, never a failure of the whole pass: broadcast can be
//! blocked, a sweep can be rejected, and manual input can contain
//! typos, yet whatever did answer is still committed.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use plugscout_common::config::HubConfig;
use plugscout_common::control::{BroadcastDiscovery, DeviceControl};
use plugscout_common::device::DeviceIdentity;
use plugscout_common::discovery::{
    split_manual_input, DiscoveryRequest, DiscoverySummary, MergeOutcome,
};
use plugscout_common::warn;

use crate::alias::AliasStore;
use crate::progress::ScanGuard;
use crate::registry::DeviceRegistry;
use crate::scanner::{self, SweepOptions};

pub struct DiscoveryOrchestrator {
    cfg: HubConfig,
    control: Arc<dyn DeviceControl>,
    broadcast: Arc<dyn BroadcastDiscovery>,
    registry: Arc<DeviceRegistry>,
    aliases: Arc<Mutex<AliasStore>>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        cfg: HubConfig,
        control: Arc<dyn DeviceControl>,
        broadcast: Arc<dyn BroadcastDiscovery>,
        registry: Arc<DeviceRegistry>,
        aliases: Arc<Mutex<AliasStore>>,
    ) -> Self {
        Self {
            cfg,
            control,
            broadcast,
            registry,
            aliases,
        }
    }

    /// Run one discovery pass. A sweep needs the scan slot, so the
    /// caller passes the guard in when the request carries a range;
    /// broadcast and manual candidates run without one.
    pub async fn discover(
        &self,
        request: &DiscoveryRequest,
        guard: Option<&ScanGuard>,
    ) -> DiscoverySummary {
        let mut summary = DiscoverySummary::default();
        let mut candidates: Vec<Ipv4Addr> = Vec::new();

        if request.broadcast {
            match self.broadcast.discover(self.cfg.broadcast_window).await {
                Ok(addrs) => candidates.extend(addrs),
                Err(e) => {
                    warn!("Broadcast discovery failed: {e}");
                    summary.strategy_failures.push(format!("broadcast: {e}"));
                }
            }
        }

        if let Some(range) = &request.sweep {
            match self.sweep_candidates(range, guard).await {
                Ok(addrs) => candidates.extend(addrs),
                Err(e) => {
                    warn!("Range sweep failed: {e}");
                    summary.strategy_failures.push(format!("sweep: {e}"));
                }
            }
        }

        candidates.sort_unstable();
        candidates.dedup();
        let mut work: Vec<(String, Ipv4Addr)> = candidates
            .into_iter()
            .map(|addr| (addr.to_string(), addr))
            .collect();

        if let Some(manual) = &request.manual {
            for token in split_manual_input(manual) {
                match token.parse::<Ipv4Addr>() {
                    Ok(addr) => work.push((token, addr)),
                    Err(_) => summary.record(
                        token,
                        MergeOutcome::Failed("not a valid IPv4 address".to_string()),
                    ),
                }
            }
        }

        self.identify_and_merge(work, &mut summary, guard).await;
        summary
    }

    async fn sweep_candidates(
        &self,
        range: &plugscout_common::network::range::NetworkRange,
        guard: Option<&ScanGuard>,
    ) -> anyhow::Result<Vec<Ipv4Addr>> {
        let guard = guard.ok_or_else(|| anyhow::anyhow!("range sweep needs the scan slot"))?;
        scanner::sweep(range, SweepOptions::from(&self.cfg), guard).await
    }

    /// Identify every candidate concurrently and merge the successes.
    /// Registry writes serialize inside the registry; identification
    /// runs under the sweep concurrency limit.
    pub async fn identify_and_merge(
        &self,
        work: Vec<(String, Ipv4Addr)>,
        summary: &mut DiscoverySummary,
        guard: Option<&ScanGuard>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.cfg.scan_concurrency.max(1)));
        let mut jobs: JoinSet<(String, Result<DeviceIdentity, String>)> = JoinSet::new();

        for (input, addr) in work {
            let control = Arc::clone(&self.control);
            let permit = Arc::clone(&semaphore);
            jobs.spawn(async move {
                let Ok(_permit) = permit.acquire_owned().await else {
                    return (input, Err("identify pool closed".to_string()));
                };
                let identified = control.identify(addr).await.map_err(|e| format!("{e:#}"));
                (input, identified)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((input, Ok(identity))) => {
                    let alias = self.aliases.lock().await.get(&identity.id);
                    let outcome = self.registry.merge(identity, alias).await;
                    if let Some(guard) = guard {
                        if matches!(outcome, MergeOutcome::Added(_)) {
                            guard.set_step(format!("Found {input}"));
                        }
                    }
                    summary.record(input, outcome);
                }
                Ok((input, Err(reason))) => {
                    summary.record(input, MergeOutcome::Failed(reason));
                }
                Err(e) => {
                    summary.strategy_failures.push(format!("identify worker: {e}"));
                }
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
