use std::sync::Arc;

use colored::*;

use plugscout_common::device::{Connectivity, DeviceStatus, StatusReport};
use plugscout_core::service::Hub;

use crate::terminal::{colors, print};

pub async fn status(hub: &Arc<Hub>) -> anyhow::Result<()> {
    let report = hub.device_status().await;
    if report.devices.is_empty() {
        print::no_results("devices");
        return Ok(());
    }

    for (idx, row) in report.devices.iter().enumerate() {
        print_row(idx, row);
        if idx + 1 != report.devices.len() {
            print::blank();
        }
    }
    print_summary(&report);
    Ok(())
}

fn print_row(idx: usize, row: &DeviceStatus) {
    print::tree_head(idx, &row.name);

    let connectivity: ColoredString = match row.connectivity {
        Connectivity::Online => "online".green().bold(),
        Connectivity::Offline => "offline".red().bold(),
        Connectivity::Unknown => "unknown".yellow().bold(),
    };
    let mut details: Vec<(String, ColoredString)> = vec![
        (
            "Address".to_string(),
            row.addr.to_string().color(colors::ADDR),
        ),
        ("State".to_string(), connectivity),
        ("Power".to_string(), row.power.to_string().normal()),
    ];
    if let Some(detail) = &row.detail {
        details.push(("Detail".to_string(), detail.clone().dimmed()));
    }
    print::as_tree_one_level(details);
}

fn print_summary(report: &StatusReport) {
    let summary = report.summary;
    let online: ColoredString = format!("{} online", summary.online).green().bold();
    let offline: ColoredString = format!("{} offline", summary.offline).red();
    let unknown: ColoredString = format!("{} unknown", summary.unknown).yellow();
    let elapsed: ColoredString = format!("{:.2}s", report.elapsed.as_secs_f64())
        .yellow()
        .bold();
    let line = format!(
        "{} device(s): {online}, {offline}, {unknown} in {elapsed}",
        summary.total
    )
    .color(colors::TEXT_DEFAULT);

    print::fat_separator();
    print::centerln(&line);
}
