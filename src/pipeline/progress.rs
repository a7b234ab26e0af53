//! Per-cluster progress bar (feature: `progress`).

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over `total` clusters, ticking on its own every 200 ms.
pub(crate) fn cluster_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total.max(1) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise} | {msg}",
        )
        .expect("indicatif template"),
    );
    pb.set_message("clusters");
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}
