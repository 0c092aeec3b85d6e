use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct ProgressBarBuilder {
    template: &'static str,
    len: Option<u64>,
    quiet: bool,
}

impl ProgressBarBuilder {
    pub fn new(template: &'static str, quiet: bool) -> Self {
        Self {
            template,
            len: None,
            quiet,
        }
    }

    pub fn len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    pub fn build(self) -> ProgressBar {
        let pbar = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };

        if self.quiet {
            pbar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            pbar.enable_steady_tick(Duration::from_millis(200));
        }

        if let Ok(style) = ProgressStyle::with_template(self.template) {
            pbar.set_style(style);
        }

        pbar
    }
}
