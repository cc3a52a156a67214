use std::sync::Arc;

use clap::Args;
use colored::*;

use plugscout_common::discovery::{DiscoveryRequest, MergeOutcome};
use plugscout_common::network::range::NetworkRange;
use plugscout_core::service::Hub;

use crate::commands::scan;
use crate::terminal::print;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Addresses to try directly, separated by spaces, commas or
    /// semicolons
    pub addresses: Vec<String>,

    /// Skip the multicast search
    #[arg(long)]
    pub no_broadcast: bool,

    /// Also sweep this range for open control ports
    #[arg(long, value_name = "RANGE")]
    pub range: Option<String>,
}

pub async fn discover(hub: &Arc<Hub>, args: DiscoverArgs) -> anyhow::Result<()> {
    let sweep: Option<NetworkRange> = match &args.range {
        Some(input) => Some(input.parse()?),
        None => None,
    };
    let manual = if args.addresses.is_empty() {
        None
    } else {
        Some(args.addresses.join(" "))
    };
    let request = DiscoveryRequest {
        broadcast: !args.no_broadcast,
        sweep,
        manual,
    };

    // Every pass holds the scan slot; only a sweep runs long enough
    // to be worth a progress bar.
    let summary = if request.sweep.is_some() {
        scan::run_with_progress(hub, {
            let hub = Arc::clone(hub);
            tokio::spawn(async move { hub.discover(request).await })
        })
        .await?
    } else {
        hub.discover(request).await?
    };

    for (idx, row) in summary.outcomes.iter().enumerate() {
        let (verdict, detail): (ColoredString, String) = match &row.outcome {
            MergeOutcome::Added(id) => ("added".green().bold(), id.to_string()),
            MergeOutcome::AlreadyKnown(id) => ("known".cyan(), id.to_string()),
            MergeOutcome::Failed(reason) => ("failed".red().bold(), reason.clone()),
        };
        print::tree_head(idx, &row.input);
        print::as_tree_one_level(vec![
            ("Outcome".to_string(), verdict),
            ("Detail".to_string(), detail.normal()),
        ]);
    }
    if summary.outcomes.is_empty() {
        print::no_results("plugs");
    }

    print::blank();
    scan::report(&summary);
    Ok(())
}
