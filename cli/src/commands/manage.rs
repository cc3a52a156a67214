use std::sync::Arc;

use anyhow::bail;
use colored::*;

use plugscout_common::success;
use plugscout_core::service::Hub;

use crate::commands::switch::{self, Selected};

pub async fn rename(hub: &Arc<Hub>, selector: &str, alias: &str) -> anyhow::Result<()> {
    let device = match switch::resolve(hub, selector).await? {
        Selected::Addr(addr) => hub.rename_address(addr, alias).await?,
        Selected::Device(device) => hub.rename_device(&device.id, alias).await?,
    };
    if device.alias.is_some() {
        success!(
            "{} is now called {}",
            device.reported_name,
            device.display_name().bold()
        );
    } else {
        success!("Alias cleared, back to {}", device.display_name().bold());
    }
    Ok(())
}

pub async fn forget(
    hub: &Arc<Hub>,
    selector: Option<&str>,
    all: bool,
) -> anyhow::Result<()> {
    match (selector, all) {
        (Some(selector), false) => {
            let device = match switch::resolve(hub, selector).await? {
                Selected::Addr(addr) => hub.forget_address(addr).await?,
                Selected::Device(device) => hub.forget_device(&device.id).await?,
            };
            let remaining = hub.device_list().await.len();
            success!(
                "Forgot {}, {remaining} device(s) remain",
                device.display_name().bold()
            );
        }
        (None, true) => {
            let removed = hub.forget_all().await;
            success!("Forgot {removed} device(s)");
        }
        (None, false) => bail!("name a device or pass --all"),
        (Some(_), true) => unreachable!("clap rejects the combination"),
    }
    Ok(())
}
