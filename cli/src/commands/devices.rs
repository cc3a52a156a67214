use std::net::Ipv4Addr;
use std::sync::Arc;

use colored::*;

use plugscout_common::device::Device;
use plugscout_core::service::Hub;

use crate::terminal::{colors, print};

pub async fn list(hub: &Arc<Hub>) -> anyhow::Result<()> {
    let devices = hub.device_list().await;
    if devices.is_empty() {
        print::no_results("devices");
        return Ok(());
    }

    for (idx, device) in devices.iter().enumerate() {
        print_device(idx, device);
        if idx + 1 != devices.len() {
            print::blank();
        }
    }
    Ok(())
}

/// One-shot look at an address; nothing is added to the registry.
pub async fn probe(hub: &Arc<Hub>, addr: Ipv4Addr) -> anyhow::Result<()> {
    let (identity, state) = hub.probe_address(addr).await?;

    print::tree_head(0, &identity.reported_name);
    let mut details: Vec<(String, ColoredString)> = vec![
        ("Address".to_string(), addr.to_string().color(colors::ADDR)),
        ("Power".to_string(), state.to_string().normal()),
    ];
    if let Some(model) = &identity.model {
        details.push(("Model".to_string(), model.clone().normal()));
    }
    if let Some(serial) = &identity.serial {
        details.push(("Serial".to_string(), serial.clone().dimmed()));
    }
    details.push(("Id".to_string(), identity.id.to_string().dimmed()));
    print::as_tree_one_level(details);
    Ok(())
}

fn print_device(idx: usize, device: &Device) {
    print::tree_head(idx, device.display_name());

    let mut details: Vec<(String, ColoredString)> = vec![(
        "Address".to_string(),
        device.addr.to_string().color(colors::ADDR),
    )];
    if device.alias.is_some() {
        details.push((
            "Reported".to_string(),
            device.reported_name.clone().normal(),
        ));
    }
    if let Some(model) = &device.model {
        details.push(("Model".to_string(), model.clone().normal()));
    }
    if let Some(serial) = &device.serial {
        details.push(("Serial".to_string(), serial.clone().dimmed()));
    }
    details.push(("Id".to_string(), device.id.to_string().dimmed()));

    print::as_tree_one_level(details);
}
