//! # Batch Status
//!
//! Queries every known device's relay state in parallel. Two clocks
//! bound the batch: a per-device timeout classifies one slow plug as
//! offline, and an overall deadline stops the whole pass so N slow
//! plugs cannot sum to an unbounded wait. Devices still pending at the
//! deadline get a synthetic offline row.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use plugscout_common::config::HubConfig;
use plugscout_common::control::DeviceControl;
use plugscout_common::debug;
use plugscout_common::device::{
    Connectivity, Device, DeviceStatus, PowerState, StatusReport, StatusSummary,
};

#[derive(Debug, Clone, Copy)]
pub struct StatusOptions {
    pub concurrency: usize,
    pub per_device_timeout: Duration,
    pub deadline: Duration,
}

impl From<&HubConfig> for StatusOptions {
    fn from(cfg: &HubConfig) -> Self {
        Self {
            concurrency: cfg.status_concurrency.max(1),
            per_device_timeout: cfg.status_timeout,
            deadline: cfg.status_deadline,
        }
    }
}

/// Check every device in `devices` and report per-device rows plus a
/// summary. Zero devices is a valid batch with all-zero counts.
pub async fn check_all(
    control: Arc<dyn DeviceControl>,
    devices: Vec<Device>,
    opts: StatusOptions,
) -> StatusReport {
    let checked_at = SystemTime::now();
    let started = Instant::now();

    if devices.is_empty() {
        return StatusReport {
            devices: Vec::new(),
            summary: StatusSummary::default(),
            checked_at,
            elapsed: started.elapsed(),
        };
    }

    let semaphore = Arc::new(Semaphore::new(opts.concurrency));
    let mut pending: HashMap<plugscout_common::device::DeviceId, Device> = devices
        .iter()
        .map(|device| (device.id.clone(), device.clone()))
        .collect();

    let mut queries: JoinSet<DeviceStatus> = JoinSet::new();
    for device in devices {
        let control = Arc::clone(&control);
        let permits = Arc::clone(&semaphore);
        let per_device = opts.per_device_timeout;
        queries.spawn(async move {
            // A closed pool means the batch is shutting down; the row
            // is synthesized from the deadline path in that case.
            let _permit = permits.acquire_owned().await.ok();
            let (power, connectivity, detail) =
                check_one(control.as_ref(), device.addr, per_device).await;
            DeviceStatus {
                id: device.id.clone(),
                name: device.display_name().to_string(),
                addr: device.addr,
                power,
                connectivity,
                detail,
            }
        });
    }

    let mut rows = collect_rows(&mut queries, &mut pending, opts.deadline).await;
    for (_, device) in pending {
        rows.push(timeout_row(&device));
    }

    rows.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    let summary = StatusSummary::tally(&rows);
    StatusReport {
        devices: rows,
        summary,
        checked_at,
        elapsed: started.elapsed(),
    }
}

async fn collect_rows(
    queries: &mut JoinSet<DeviceStatus>,
    pending: &mut HashMap<plugscout_common::device::DeviceId, Device>,
    deadline: Duration,
) -> Vec<DeviceStatus> {
    let cutoff = tokio::time::sleep(deadline);
    tokio::pin!(cutoff);

    let mut rows = Vec::new();
    loop {
        tokio::select! {
            () = &mut cutoff => {
                queries.abort_all();
                break;
            }
            joined = queries.join_next() => match joined {
                None => break,
                Some(Ok(row)) => {
                    pending.remove(&row.id);
                    rows.push(row);
                }
                Some(Err(e)) => debug!("Status query task failed: {e}"),
            },
        }
    }
    rows
}

fn timeout_row(device: &Device) -> DeviceStatus {
    DeviceStatus {
        id: device.id.clone(),
        name: device.display_name().to_string(),
        addr: device.addr,
        power: PowerState::Unknown,
        connectivity: Connectivity::Offline,
        detail: Some("batch deadline reached before this device answered".to_string()),
    }
}

async fn check_one(
    control: &dyn DeviceControl,
    addr: std::net::Ipv4Addr,
    per_device: Duration,
) -> (PowerState, Connectivity, Option<String>) {
    match timeout(per_device, control.query_state(addr)).await {
        Ok(Ok(PowerState::Unknown)) => (
            PowerState::Unknown,
            Connectivity::Unknown,
            Some("unrecognized state value".to_string()),
        ),
        Ok(Ok(state)) => (state, Connectivity::Online, None),
        Ok(Err(e)) => (
            PowerState::Unknown,
            Connectivity::Offline,
            Some(format!("{e:#}")),
        ),
        Err(_) => (
            PowerState::Unknown,
            Connectivity::Offline,
            Some(format!("no answer within {per_device:?}")),
        ),
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
