use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use plugscout_common::scan::ScanSnapshot;

/// Bar over the 0..=100 percent scale the tracker reports.
pub fn scan_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:32.cyan/blue}] {percent:>3}% {msg}",
    )
    .expect("static template")
    .progress_chars("█▓░")
    .tick_strings(&[
        "▁▁▁▁▁",
        "▁▂▂▂▁",
        "▁▄▂▄▁",
        "▂▄▆▄▂",
        "▄▆█▆▄",
        "▂▄▆▄▂",
        "▁▄▂▄▁",
        "▁▂▂▂▁",
    ]);
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Push one tracker snapshot onto the bar.
pub fn apply(bar: &ProgressBar, snapshot: &ScanSnapshot) {
    bar.set_position(u64::from(snapshot.percent));

    let mut msg = snapshot.step.clone();
    if snapshot.total > 0 {
        msg.push_str(&format!(
            " ({}/{} probed, {} found",
            snapshot.scanned, snapshot.total, snapshot.found
        ));
        if let Some(eta) = snapshot.eta {
            msg.push_str(&format!(", ~{}s left", eta.as_secs()));
        }
        msg.push(')');
    }
    bar.set_message(msg);
}
