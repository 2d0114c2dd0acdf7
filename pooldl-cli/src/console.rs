//! Console rendering of a sync run.
//!
//! Each post gets one line, `Fetching image #N...`, drawn as an `indicatif`
//! bar with the download percentage and finished with the status word.
//! Lookups show a spinner. When the draw target is not a terminal the bars
//! stay hidden and only the finished lines are written to `out`.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pooldl_core::{PoolId, PoolSummary, PostId};
use pooldl_sync::{PostOutcome, Reporter, RunPhase, RunSummary};

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const LINE_TEMPLATE: &str = "{msg}";
const DOWNLOAD_TEMPLATE: &str = "{msg} {percent}%";

const TICK: Duration = Duration::from_millis(100);

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// [`Reporter`] that renders progress bars and writes finished lines to
/// `out`.
pub struct ConsoleReporter<W: Write> {
    out: W,
    draw_target: fn() -> ProgressDrawTarget,
    /// "Getting pool info..." / prefetch pages.
    spinner: Option<ProgressBar>,
    /// Line of the post being processed.
    post: Option<ProgressBar>,
    /// Text of the current post line, without progress or status.
    line: String,
}

impl<W: Write> ConsoleReporter<W> {
    /// `draw_target` builds the target of each bar, e.g.
    /// [`ProgressDrawTarget::stdout`].
    pub fn new(out: W, draw_target: fn() -> ProgressDrawTarget) -> Self {
        Self {
            out,
            draw_target,
            spinner: None,
            post: None,
            line: String::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar(&self, template: &str) -> ProgressBar {
        ProgressBar::with_draw_target(None, (self.draw_target)()).with_style(style(template))
    }

    /// Console output is best effort; a closed stdout must not fail a run.
    fn emit(&mut self, text: &str) {
        if self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()).is_err() {
            tracing::debug!("console write failed");
        }
    }

    fn spin(&mut self, message: impl Into<Cow<'static, str>>) {
        if self.spinner.is_none() {
            let spinner = self.bar(SPINNER_TEMPLATE);
            spinner.enable_steady_tick(TICK);
            self.spinner = Some(spinner);
        }
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message);
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print the end-of-run counts.
    pub fn summary(&mut self, summary: &RunSummary) {
        let mut text = String::new();
        if summary.downloaded > 0 {
            text.push_str(&format!("\nDownloaded {} images.\n", summary.downloaded));
        } else {
            text.push_str("\nNothing to download.\n");
        }
        if summary.removed > 0 {
            text.push_str(&format!("Removed {} images.\n", summary.removed));
        }
        if summary.failed > 0 {
            let failed = format!("Failed to download {} images.", summary.failed);
            text.push_str(&format!("{}\n", failed.red()));
        }
        text.push('\n');
        self.emit(&text);
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn phase(&mut self, phase: RunPhase) {
        match phase {
            RunPhase::Init => self.spin("Getting pool info..."),
            RunPhase::Synchronizing | RunPhase::Done => self.stop_spinner(),
            _ => {}
        }
    }

    fn pool_not_found(&mut self, pool_id: PoolId) {
        self.stop_spinner();
        let text = format!("Pool not found: {pool_id}");
        self.emit(&format!("{}\n\n", text.yellow()));
    }

    fn pool_resolved(&mut self, pool: &PoolSummary, download_dir: &Path) {
        self.stop_spinner();
        self.emit(&format!(
            "Pool: {} ({} images)\n{}\n\n",
            pool.name.bold(),
            pool.image_count,
            format!("Saving to {}", download_dir.display()).dimmed()
        ));
    }

    fn prefetch_page(&mut self, page: usize, pages: usize) {
        self.spin(format!("Prefetching post data... page {page}/{pages}"));
    }

    fn post_started(&mut self, index: usize, _total: usize, _post_id: PostId) {
        self.line = format!("Fetching image #{index}...");
        let bar = self.bar(LINE_TEMPLATE);
        bar.set_message(self.line.clone());
        self.post = Some(bar);
    }

    fn download_started(&mut self, _index: usize, _post_id: PostId) {
        if let Some(bar) = &self.post {
            bar.set_style(style(DOWNLOAD_TEMPLATE));
        }
    }

    fn download_progress(&mut self, _index: usize, total: u64, transferred: u64) -> io::Result<()> {
        if total == 0 {
            return Ok(());
        }
        if let Some(bar) = &self.post {
            bar.set_length(total);
            bar.set_position(transferred.min(total));
        }
        Ok(())
    }

    fn post_finished(&mut self, outcome: &PostOutcome) {
        let status = match outcome {
            PostOutcome::Missing { .. } => "post does not exist!".yellow(),
            PostOutcome::Fileless { .. } => {
                "missing image url, authentication might be required!".yellow()
            }
            PostOutcome::Downloaded { .. } => "done".green(),
            PostOutcome::Unchanged { .. } => "no download required".dimmed(),
            PostOutcome::Failed { .. } => "fail".red(),
        };
        let finished = format!("{} {status}", std::mem::take(&mut self.line));
        match self.post.take() {
            Some(bar) if !bar.is_hidden() => {
                bar.set_style(style(LINE_TEMPLATE));
                bar.finish_with_message(finished);
            }
            _ => self.emit(&format!("{finished}\n")),
        }
    }
}
