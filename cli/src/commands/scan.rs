use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use colored::*;

use plugscout_common::config::HubConfig;
use plugscout_common::discovery::DiscoverySummary;
use plugscout_common::network::range::NetworkRange;
use plugscout_common::scan::ScanTarget;
use plugscout_common::{success, warn};
use plugscout_core::service::Hub;

use crate::commands::devices;
use crate::terminal::{print, progress};

#[derive(Args)]
pub struct ScanArgs {
    /// Range (CIDR or dotted mask) or single address to sweep;
    /// picks a plausible local range when omitted
    pub target: Option<String>,
}

/// Parse a range string and show what sweeping it would cover.
pub fn validate(cfg: &HubConfig, input: &str) -> anyhow::Result<()> {
    let range: NetworkRange = input.parse()?;
    let info = range.info(input);

    print::tree_head(0, &info.canonical);
    print::as_tree_one_level(vec![
        ("Network".to_string(), info.network.to_string().normal()),
        ("Broadcast".to_string(), info.broadcast.to_string().normal()),
        (
            "Hosts".to_string(),
            format!("{} ({} - {})", info.host_count, info.first_host, info.last_host).normal(),
        ),
        ("Port".to_string(), cfg.control_port.to_string().normal()),
        (
            "Estimate".to_string(),
            info.estimated_scan_time.yellow(),
        ),
    ]);
    Ok(())
}

pub async fn scan(hub: &Arc<Hub>, args: ScanArgs) -> anyhow::Result<()> {
    let target = parse_target(args.target.as_deref())?;
    let summary = run_with_progress(hub, {
        let hub = Arc::clone(hub);
        tokio::spawn(async move { hub.scan(target).await })
    })
    .await?;

    report(&summary);
    if summary.added + summary.already_known > 0 {
        print::blank();
        devices::list(hub).await?;
    }
    Ok(())
}

fn parse_target(input: Option<&str>) -> anyhow::Result<ScanTarget> {
    let Some(input) = input else {
        return Ok(ScanTarget::Auto);
    };
    if let Ok(addr) = input.parse::<Ipv4Addr>() {
        return Ok(ScanTarget::Single(addr));
    }
    let range: NetworkRange = input.parse()?;
    Ok(ScanTarget::Range(range))
}

/// Drive the progress bar off tracker snapshots while the spawned
/// operation runs. Ctrl-C requests cancellation instead of quitting;
/// the scan winds down and reports what it found.
pub async fn run_with_progress(
    hub: &Arc<Hub>,
    mut task: tokio::task::JoinHandle<
        Result<DiscoverySummary, plugscout_common::error::HubError>,
    >,
) -> anyhow::Result<DiscoverySummary> {
    let bar = progress::scan_bar();
    let mut ticker = tokio::time::interval(Duration::from_millis(120));

    let outcome = loop {
        tokio::select! {
            joined = &mut task => break joined.context("scan task crashed")?,
            _ = tokio::signal::ctrl_c() => {
                if hub.cancel_scan().is_ok() {
                    bar.set_message("Cancelling, letting probes drain".to_string());
                }
            }
            _ = ticker.tick() => progress::apply(&bar, &hub.scan_progress()),
        }
    };
    bar.finish_and_clear();
    Ok(outcome?)
}

pub fn report(summary: &DiscoverySummary) {
    for failure in &summary.strategy_failures {
        warn!("Strategy failed: {failure}");
    }
    let line = format!(
        "{} new, {} already known, {} failed",
        summary.added.to_string().green().bold(),
        summary.already_known,
        summary.failed
    );
    success!("{line}");
}
