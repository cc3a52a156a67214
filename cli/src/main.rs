mod commands;
mod terminal;

use std::sync::Arc;

use commands::{CommandLine, Commands, devices, discover, manage, scan, status, switch, watch};
use plugscout_core::service::Hub;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    logging::init(cli.verbose);

    let cfg = cli.hub_config();

    match cli.command {
        Commands::Validate { range } => {
            print::header("validating range");
            scan::validate(&cfg, &range)
        }
        command => {
            let hub = Arc::new(Hub::new(cfg).await);
            let result = dispatch(&hub, command).await;
            hub.shutdown().await;
            result
        }
    }
}

async fn dispatch(hub: &Arc<Hub>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate { .. } => unreachable!("handled without a hub"),
        Commands::Scan(args) => {
            print::header("scanning for plugs");
            scan::scan(hub, args).await
        }
        Commands::Discover(args) => {
            print::header("running discovery");
            discover::discover(hub, args).await
        }
        Commands::Devices => {
            print::header("known devices");
            devices::list(hub).await
        }
        Commands::Probe { address } => {
            print::header("probing address");
            devices::probe(hub, address).await
        }
        Commands::Status => {
            print::header("device status");
            status::status(hub).await
        }
        Commands::On { device } => switch::switch_one(hub, &device, switch::Action::On).await,
        Commands::Off { device } => switch::switch_one(hub, &device, switch::Action::Off).await,
        Commands::Toggle { device } => {
            switch::switch_one(hub, &device, switch::Action::Toggle).await
        }
        Commands::All { action } => {
            print::header("switching all devices");
            switch::switch_all(hub, action).await
        }
        Commands::Rename { device, alias } => manage::rename(hub, &device, &alias).await,
        Commands::Forget { device, all } => manage::forget(hub, device.as_deref(), all).await,
        Commands::Watch(args) => {
            print::header("watching the network");
            watch::watch(hub, args).await
        }
    }
}
