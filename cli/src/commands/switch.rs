use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::bail;
use clap::ValueEnum;
use colored::*;

use plugscout_common::control::PlugCommand;
use plugscout_common::device::Device;
use plugscout_common::discovery::DiscoveryRequest;
use plugscout_common::{info, success, warn};
use plugscout_core::service::Hub;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Action {
    On,
    Off,
    Toggle,
}

impl From<Action> for PlugCommand {
    fn from(action: Action) -> Self {
        match action {
            Action::On => PlugCommand::TurnOn,
            Action::Off => PlugCommand::TurnOff,
            Action::Toggle => PlugCommand::Toggle,
        }
    }
}

/// What a selector on the command line resolved to.
pub enum Selected {
    Addr(Ipv4Addr),
    Device(Device),
}

/// Resolve a user-supplied selector: a literal address is used as is,
/// anything else is matched against alias, reported name or id after
/// a broadcast pass fills the registry.
pub async fn resolve(hub: &Arc<Hub>, selector: &str) -> anyhow::Result<Selected> {
    if let Ok(addr) = selector.parse::<Ipv4Addr>() {
        return Ok(Selected::Addr(addr));
    }

    if hub.device_list().await.is_empty() {
        info!("No devices on record yet, searching the network");
        let request = DiscoveryRequest {
            broadcast: true,
            ..DiscoveryRequest::default()
        };
        if let Err(e) = hub.discover(request).await {
            warn!("Discovery before lookup failed: {e}");
        }
    }

    let wanted = selector.to_lowercase();
    let devices = hub.device_list().await;
    let matched = devices.into_iter().find(|device| {
        device.display_name().to_lowercase() == wanted
            || device.reported_name.to_lowercase() == wanted
            || device.id.as_str() == selector
    });
    match matched {
        Some(device) => Ok(Selected::Device(device)),
        None => bail!("no device matches '{selector}'; try an address or run 'discover' first"),
    }
}

pub async fn switch_one(hub: &Arc<Hub>, selector: &str, action: Action) -> anyhow::Result<()> {
    let (label, state) = match resolve(hub, selector).await? {
        Selected::Addr(addr) => (
            addr.to_string(),
            hub.control_address(addr, action.into()).await?,
        ),
        Selected::Device(device) => {
            let state = hub.control_device(&device.id, action.into()).await?;
            (device.display_name().to_string(), state)
        }
    };
    success!("{} is now {}", label.bold(), state.to_string().bold());
    Ok(())
}

pub async fn switch_all(hub: &Arc<Hub>, action: Action) -> anyhow::Result<()> {
    let rows = hub.control_all(action.into()).await;
    if rows.is_empty() {
        warn!("No devices on record; run 'scan' or 'discover' first");
        return Ok(());
    }

    let mut failures = 0usize;
    for (device, outcome) in &rows {
        match outcome {
            Ok(state) => success!(
                "{} is now {}",
                device.display_name().bold(),
                state.to_string().bold()
            ),
            Err(e) => {
                failures += 1;
                warn!("{} did not answer: {e}", device.display_name());
            }
        }
    }
    if failures > 0 {
        warn!("{failures} of {} device(s) failed", rows.len());
    }
    Ok(())
}
