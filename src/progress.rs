//! Progress bar for labeling runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use review_trends::{LabelingReport, ProgressSink};

/// Renders labeling progress on stderr.
pub(crate) struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Creates a bar for `total` reviews; hidden when `visible` is false.
    pub(crate) fn new(total: usize, visible: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        if visible {
            bar.set_style(
                ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_review(&self, processed: usize, _total: usize, topic: &str) {
        self.bar.set_position(processed as u64);
        self.bar.set_message(topic.to_string());
    }

    fn on_finish(&self, _report: &LabelingReport) {
        self.bar.finish_and_clear();
    }
}
