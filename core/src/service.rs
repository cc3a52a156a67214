//! # Hub
//!
//! The engine's front door. Owns the registry, the alias store, the
//! scan slot and the background scheduler, and exposes every operation
//! the surface layers call: validate, scan, discover, status, switch,
//! rename, forget. Constructed once per process and shared behind an
//! `Arc`.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;

use plugscout_common::config::HubConfig;
use plugscout_common::control::{BroadcastDiscovery, DeviceControl, PlugCommand};
use plugscout_common::device::{Device, DeviceId, DeviceIdentity, PowerState, StatusReport};
use plugscout_common::discovery::{DiscoveryRequest, DiscoveryStatus, DiscoverySummary};
use plugscout_common::error::{HubError, ValidationError};
use plugscout_common::network::range::{NetworkRange, RangeInfo};
use plugscout_common::scan::{ScanKind, ScanSnapshot, ScanTarget};
use plugscout_common::warn;

use crate::alias::AliasStore;
use crate::autodetect;
use crate::client::{HttpPlugClient, SsdpDiscovery};
use crate::discovery::DiscoveryOrchestrator;
use crate::progress::{ScanGuard, ScanProgress};
use crate::registry::DeviceRegistry;
use crate::scanner::{self, SweepOptions};
use crate::scheduler::{DiscoveryScheduler, DiscoveryStats};
use crate::status::{self, StatusOptions};

pub struct Hub {
    cfg: HubConfig,
    registry: Arc<DeviceRegistry>,
    aliases: Arc<Mutex<AliasStore>>,
    control: Arc<dyn DeviceControl>,
    progress: ScanProgress,
    orchestrator: Arc<DiscoveryOrchestrator>,
    stats: Arc<DiscoveryStats>,
    scheduler: Mutex<Option<DiscoveryScheduler>>,
}

impl Hub {
    /// Build a hub with the production protocol clients.
    pub async fn new(cfg: HubConfig) -> Self {
        let control = Arc::new(HttpPlugClient::from_config(&cfg));
        let broadcast = Arc::new(SsdpDiscovery::default());
        Self::with_clients(cfg, control, broadcast).await
    }

    /// Build a hub around caller-supplied collaborators.
    pub async fn with_clients(
        cfg: HubConfig,
        control: Arc<dyn DeviceControl>,
        broadcast: Arc<dyn BroadcastDiscovery>,
    ) -> Self {
        let aliases = Arc::new(Mutex::new(AliasStore::open(cfg.alias_path.clone()).await));
        let registry = Arc::new(DeviceRegistry::new());
        let orchestrator = Arc::new(DiscoveryOrchestrator::new(
            cfg.clone(),
            Arc::clone(&control),
            broadcast,
            Arc::clone(&registry),
            Arc::clone(&aliases),
        ));
        Self {
            cfg,
            registry,
            aliases,
            control,
            progress: ScanProgress::new(),
            orchestrator,
            stats: Arc::new(DiscoveryStats::new(true)),
            scheduler: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.cfg
    }

    /// Validate a range string and derive its display fields.
    pub fn validate(&self, input: &str) -> Result<RangeInfo, ValidationError> {
        let range: NetworkRange = input.parse()?;
        Ok(range.info(input))
    }

    /// Run a full scan: resolve the target, sweep it, identify what
    /// answered and merge into the registry. Rejected when another
    /// scan holds the slot.
    pub async fn scan(&self, target: ScanTarget) -> Result<DiscoverySummary, HubError> {
        let (kind, label) = target.describe();
        let guard = self.progress.begin(kind, label, 0)?;
        Ok(self.scan_with_guard(target, guard).await)
    }

    async fn scan_with_guard(&self, target: ScanTarget, guard: ScanGuard) -> DiscoverySummary {
        let mut summary = DiscoverySummary::default();

        let hosts: Vec<Ipv4Addr> = match target {
            ScanTarget::Auto => {
                guard.set_step("Detecting network range");
                guard.set_percent(5);
                match autodetect::detect_ranges(&self.cfg).await.into_iter().next() {
                    Some(range) => {
                        guard.set_label(format!("scan of {range}"));
                        range.hosts().collect()
                    }
                    None => {
                        summary
                            .strategy_failures
                            .push("auto-detect: no candidate ranges".to_string());
                        guard.abort("Scan failed");
                        return summary;
                    }
                }
            }
            ScanTarget::Range(range) => range.hosts().collect(),
            ScanTarget::Single(addr) => vec![addr],
        };
        guard.set_percent(10);

        let found =
            match scanner::sweep_hosts(hosts, SweepOptions::from(&self.cfg), &guard).await {
                Ok(found) => found,
                Err(e) => {
                    summary.strategy_failures.push(format!("sweep: {e}"));
                    guard.abort("Scan failed");
                    return summary;
                }
            };

        guard.set_percent(92);
        guard.set_step(format!("Identifying {} candidate(s)", found.len()));
        let work = found
            .into_iter()
            .map(|addr| (addr.to_string(), addr))
            .collect();
        self.orchestrator
            .identify_and_merge(work, &mut summary, Some(&guard))
            .await;
        self.stats.mark_run();

        let responded = summary.added + summary.already_known;
        if guard.cancel_requested() {
            guard.abort(format!("Scan cancelled, found {responded} device(s)"));
        } else {
            guard.finish(format!("Scan complete, found {responded} device(s)"));
        }
        summary
    }

    pub fn scan_progress(&self) -> ScanSnapshot {
        self.progress.snapshot()
    }

    pub fn cancel_scan(&self) -> Result<(), HubError> {
        self.progress.request_cancel()
    }

    /// Run a discovery pass. Every pass claims the scan slot, so
    /// discovery and scans never interleave their registry merges.
    /// Rejected when another scan holds the slot.
    pub async fn discover(&self, request: DiscoveryRequest) -> Result<DiscoverySummary, HubError> {
        let label = match &request.sweep {
            Some(range) => format!("discovery sweep of {range}"),
            None => "discovery pass".to_string(),
        };
        let guard = self.progress.begin(ScanKind::Network, label, 0)?;
        let summary = self.orchestrator.discover(&request, Some(&guard)).await;
        if guard.cancel_requested() {
            guard.abort(format!(
                "Discovery cancelled, {} device(s) added",
                summary.added
            ));
        } else {
            guard.finish(format!(
                "Discovery complete, {} device(s) added",
                summary.added
            ));
        }
        self.stats.mark_run();
        Ok(summary)
    }

    pub async fn device_list(&self) -> Vec<Device> {
        self.registry.snapshot().await
    }

    pub async fn device(&self, id: &DeviceId) -> Option<Device> {
        self.registry.get(id).await
    }

    /// Check every known device's state in parallel.
    pub async fn device_status(&self) -> StatusReport {
        let devices = self.registry.snapshot().await;
        status::check_all(
            Arc::clone(&self.control),
            devices,
            StatusOptions::from(&self.cfg),
        )
        .await
    }

    /// One-shot identity and state probe of an arbitrary address,
    /// without touching the registry.
    pub async fn probe_address(&self, addr: Ipv4Addr) -> Result<(DeviceIdentity, PowerState)> {
        let identity = self
            .control
            .identify(addr)
            .await
            .with_context(|| format!("no plug answered at {addr}"))?;
        let state = self
            .control
            .query_state(addr)
            .await
            .unwrap_or(PowerState::Unknown);
        Ok((identity, state))
    }

    /// Switch a plug by address, registry or not.
    pub async fn control_address(&self, addr: Ipv4Addr, command: PlugCommand) -> Result<PowerState> {
        self.control.invoke(addr, command).await
    }

    /// Switch a plug on record.
    pub async fn control_device(&self, id: &DeviceId, command: PlugCommand) -> Result<PowerState> {
        let device = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| HubError::UnknownDevice(id.clone()))?;
        self.control.invoke(device.addr, command).await
    }

    /// Apply one command to every known device concurrently. Each row
    /// carries its own outcome; one dead plug never blocks the rest.
    pub async fn control_all(&self, command: PlugCommand) -> Vec<(Device, Result<PowerState>)> {
        let devices = self.registry.snapshot().await;
        let semaphore = Arc::new(Semaphore::new(self.cfg.status_concurrency.max(1)));
        let per_device = self.cfg.status_timeout;

        let mut pending: std::collections::HashMap<usize, Device> =
            devices.iter().cloned().enumerate().collect();
        let mut jobs: JoinSet<(usize, Result<PowerState>)> = JoinSet::new();
        for (index, device) in devices.into_iter().enumerate() {
            let control = Arc::clone(&self.control);
            let permits = Arc::clone(&semaphore);
            jobs.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = match timeout(per_device, control.invoke(device.addr, command)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("no answer within {per_device:?}")),
                };
                (index, outcome)
            });
        }

        let mut rows: Vec<(Device, Result<PowerState>)> = Vec::new();
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(device) = pending.remove(&index) {
                        rows.push((device, outcome));
                    }
                }
                Err(e) => warn!("Switch worker failed: {e}"),
            }
        }
        for (_, device) in pending {
            rows.push((
                device,
                Err(HubError::Task("switch worker crashed".to_string()).into()),
            ));
        }

        rows.sort_by(|(a, _), (b, _)| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }

    /// Drop one device from the registry and its stored alias.
    pub async fn forget_device(&self, id: &DeviceId) -> Result<Device, HubError> {
        let device = self.registry.forget(id).await?;
        if let Err(e) = self.aliases.lock().await.remove(id).await {
            warn!("Could not drop alias for {id}: {e}");
        }
        Ok(device)
    }

    /// Empty the registry. Returns how many devices were dropped.
    pub async fn forget_all(&self) -> usize {
        let removed = self.registry.forget_all().await;
        let ids: Vec<DeviceId> = removed.iter().map(|d| d.id.clone()).collect();
        if let Err(e) = self.aliases.lock().await.remove_many(&ids).await {
            warn!("Could not drop aliases: {e}");
        }
        removed.len()
    }

    /// Set or clear a device's alias. Whitespace-only input clears.
    pub async fn rename_device(&self, id: &DeviceId, alias: &str) -> Result<Device> {
        let trimmed = alias.trim();
        let device = if trimmed.is_empty() {
            let device = self.registry.rename(id, None).await?;
            self.aliases.lock().await.remove(id).await?;
            device
        } else {
            let device = self
                .registry
                .rename(id, Some(trimmed.to_string()))
                .await?;
            self.aliases
                .lock()
                .await
                .set(id.clone(), trimmed.to_string())
                .await?;
            device
        };
        Ok(device)
    }

    /// Rename by address: identify the plug, make sure it is on
    /// record, then alias it.
    pub async fn rename_address(&self, addr: Ipv4Addr, alias: &str) -> Result<Device> {
        let identity = self
            .control
            .identify(addr)
            .await
            .with_context(|| format!("no plug answered at {addr}"))?;
        let id = identity.id.clone();
        let stored = self.aliases.lock().await.get(&id);
        self.registry.merge(identity, stored).await;
        self.rename_device(&id, alias).await
    }

    /// Forget by address: identify the plug, then drop its record.
    pub async fn forget_address(&self, addr: Ipv4Addr) -> Result<Device> {
        let identity = self
            .control
            .identify(addr)
            .await
            .with_context(|| format!("no plug answered at {addr}"))?;
        Ok(self.forget_device(&identity.id).await?)
    }

    /// Start the background scheduler if it is not already running.
    pub async fn spawn_scheduler(&self) {
        let mut slot = self.scheduler.lock().await;
        if slot.as_ref().is_some_and(|s| s.is_running()) {
            return;
        }
        *slot = Some(DiscoveryScheduler::spawn(
            Arc::clone(&self.orchestrator),
            self.progress.clone(),
            Arc::clone(&self.stats),
            self.cfg.background_interval,
        ));
    }

    /// Toggle scheduled discovery. Enabling also starts the scheduler
    /// task when none is running; disabling leaves the task parked.
    pub async fn set_auto_discovery(&self, enabled: bool) {
        self.stats.set_auto_enabled(enabled);
        if enabled {
            self.spawn_scheduler().await;
        }
    }

    pub async fn discovery_status(&self) -> DiscoveryStatus {
        let scheduler_running = self
            .scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_running());
        DiscoveryStatus {
            auto_enabled: self.stats.auto_enabled(),
            scheduler_running,
            runs: self.stats.runs(),
            last_run: self.stats.last_run(),
            interval: self.cfg.background_interval,
            known_devices: self.registry.len().await,
        }
    }

    /// Stop the background scheduler.
    pub async fn shutdown(&self) {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown();
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
