//! Progress display and final summary
//!
//! The reporter is a pure consumer of the downloader's [`Event`] channel: it
//! keeps its own tally and never feeds anything back into a run.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::summary::RunReport;
use crate::types::{Event, Outcome};

/// How progress is rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressMode {
    /// Live bar on stderr
    Bar,
    /// Track events without drawing anything
    Hidden,
}

/// Running counts rebuilt from events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressTally {
    /// Candidates in the run (from `Started`)
    pub total: u64,
    /// Candidates saved
    pub saved: u64,
    /// Candidates the server did not have
    pub not_found: u64,
    /// Candidates that failed
    pub failed: u64,
    /// Set once `Finished` arrives
    pub finished: bool,
}

impl ProgressTally {
    /// Fold one event into the tally
    ///
    /// `Finished` carries the authoritative summary, so it replaces whatever
    /// was counted (events may have been skipped on lag).
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Started { total, .. } => {
                *self = Self {
                    total: u64::from(*total),
                    ..Self::default()
                };
            }
            Event::CandidateFinished { outcome, .. } => match outcome {
                Outcome::Saved { .. } => self.saved += 1,
                Outcome::NotFound => self.not_found += 1,
                Outcome::Failed { .. } => self.failed += 1,
            },
            Event::Finished { summary, .. } => {
                self.saved = summary.saved();
                self.not_found = summary.not_found();
                self.failed = summary.failed();
                self.finished = true;
            }
        }
    }

    /// Outcomes recorded so far
    pub fn completed(&self) -> u64 {
        self.saved + self.not_found + self.failed
    }

    /// Bar message
    pub fn message(&self) -> String {
        format!(
            "saved {} · not found {} · failed {}",
            self.saved, self.not_found, self.failed
        )
    }
}

/// Spawn a task that renders events from `rx` until the run finishes
///
/// Subscribe before starting the run so `Started` is not missed. The task
/// returns its final tally.
pub fn spawn_reporter(rx: broadcast::Receiver<Event>, mode: ProgressMode) -> JoinHandle<ProgressTally> {
    tokio::spawn(async move {
        let bar = match mode {
            ProgressMode::Bar => create_progress_bar(),
            ProgressMode::Hidden => ProgressBar::hidden(),
        };
        let mut tally = ProgressTally::default();
        let mut events = BroadcastStream::new(rx);

        while let Some(result) = events.next().await {
            let event = match result {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("Progress display lagged, skipped {} events", skipped);
                    continue;
                }
            };

            tally.apply(&event);
            match event {
                Event::Started { total, .. } => {
                    bar.set_length(u64::from(total));
                    bar.set_position(0);
                }
                Event::CandidateFinished { .. } => {
                    bar.set_position(tally.completed());
                }
                Event::Finished { .. } => {
                    bar.set_position(tally.completed());
                    bar.set_message(tally.message());
                    bar.finish_and_clear();
                    break;
                }
            }
            bar.set_message(tally.message());
        }

        tally
    })
}

/// Final report in the form printed at the end of a run
///
/// ```text
/// Total: 5, Downloaded: 3, Not Found: 1, Failed: 1
/// Saved to: downloads/default
/// ```
pub fn format_summary(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    if report.interrupted {
        out.push_str(&format!(
            "Interrupted after {} of {} candidates\n",
            summary.total(),
            report.requested
        ));
    }
    out.push_str(&format!(
        "Total: {}, Downloaded: {}, Not Found: {}, Failed: {}\n",
        summary.total(),
        summary.saved(),
        summary.not_found(),
        summary.failed()
    ));
    out.push_str(&format!("Saved to: {}", report.destination.display()));
    out
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
