use indicatif::{ProgressBar, ProgressStyle};
use log::log_enabled;

const K_PROGRESS_TIMES: usize = 20;

/// Progress over generation attempts. Hidden unless info logs are on.
pub(crate) struct Bar {
    bar: ProgressBar,
    prev_log: usize,
    delta: usize,
}

impl Bar {
    pub(crate) fn new(total_attempts: usize) -> Self {
        let bar = if log_enabled!(log::Level::Info) {
            let bar = ProgressBar::new(total_attempts as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("[{bar:60.green}] {pos}/{len} attempts")
            {
                bar.set_style(style);
            }
            bar.set_position(0);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            bar,
            prev_log: 0,
            delta: (total_attempts / K_PROGRESS_TIMES).max(1),
        }
    }

    pub(crate) fn make_progress(&mut self, attempt: usize) {
        let d = attempt / self.delta;
        if d > self.prev_log {
            self.prev_log = d;
            self.bar.set_position(attempt as u64)
        }
    }

    pub(crate) fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
