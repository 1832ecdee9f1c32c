// Rangeload - progress.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;

/// Sink for per-segment transfer progress.
///
/// Fetch tasks report through this from concurrent contexts; implementations
/// must tolerate interleaved calls for different labels. Passed into the
/// manager at construction; visibility is a capability, not a process-wide
/// flag.
pub trait ProgressReporter: Send + Sync {
    fn segment_started(&self, label: &str, total_bytes: u64);
    fn segment_advanced(&self, label: &str, bytes: u64);
    fn segment_finished(&self, label: &str);
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn segment_started(&self, _label: &str, _total_bytes: u64) {}
    fn segment_advanced(&self, _label: &str, _bytes: u64) {}
    fn segment_finished(&self, _label: &str) {}
}

/// Console display: one indicatif bar per segment under a `MultiProgress`.
pub struct ConsoleProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        ConsoleProgress {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:12} {bar:40.cyan/blue} {bytes}/{total_bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn segment_started(&self, label: &str, total_bytes: u64) {
        let bar = self.multi.add(ProgressBar::new(total_bytes));
        bar.set_style(Self::bar_style());
        bar.set_message(label.to_string());
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(label.to_string(), bar);
        }
    }

    fn segment_advanced(&self, label: &str, bytes: u64) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(label) {
                bar.inc(bytes);
            }
        }
    }

    fn segment_finished(&self, label: &str) {
        // Dropping the entry keeps a reused reporter from accumulating stale
        // bars and lets a later job reuse the label.
        if let Ok(mut bars) = self.bars.lock() {
            if let Some(bar) = bars.remove(label) {
                bar.finish();
            }
        }
    }
}
