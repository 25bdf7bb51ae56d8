//! Spinner for `init`, the one stage that never prompts.

#![allow(clippy::expect_used)] // templates are literals

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// A ticking spinner when `show`, otherwise a hidden bar that swallows updates.
#[must_use]
pub fn maybe_spinner(show: bool, msg: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner().with_style(
        ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("  {spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn settle(pb: &ProgressBar, mark: &'static str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {prefix} {msg}")
            .expect("valid template"),
    );
    pb.set_prefix(mark);
}

pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    settle(pb, "✓");
    pb.finish_with_message(msg.to_string());
}

/// Leaves the failed line on screen; the error itself is printed by `main`.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    settle(pb, "✗");
    pb.abandon_with_message(msg.to_string());
}
