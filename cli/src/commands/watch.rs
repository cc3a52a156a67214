use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use plugscout_common::discovery::DiscoveryRequest;
use plugscout_common::{info, warn};
use plugscout_core::service::Hub;

use crate::commands::status;
use crate::terminal::print;

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between status passes
    #[arg(long, default_value_t = 30)]
    pub interval: u64,
}

/// Run until interrupted: one broadcast pass up front, background
/// discovery on the engine's own interval, and a status report every
/// `interval` seconds.
pub async fn watch(hub: &Arc<Hub>, args: WatchArgs) -> anyhow::Result<()> {
    let request = DiscoveryRequest {
        broadcast: true,
        ..DiscoveryRequest::default()
    };
    match hub.discover(request).await {
        Ok(summary) => info!(
            "Initial discovery: {} new, {} already known",
            summary.added, summary.already_known
        ),
        Err(e) => warn!("Initial discovery failed: {e}"),
    }

    hub.set_auto_discovery(true).await;
    let pause = Duration::from_secs(args.interval.max(1));

    loop {
        status::status(hub).await?;
        print::blank();

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }
    }
}
