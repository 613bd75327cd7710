//! Run accounting
//!
//! [`SummaryCounter`] is shared by every in-flight candidate and updated with
//! lock-free increments; [`RunSummary`] is the plain snapshot handed to
//! callers. `total` is always derived from the three outcome counts, so
//! `saved + not_found + failed == total` holds for every snapshot regardless
//! of the order or concurrency of updates.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Outcome;

/// Per-outcome counts for a run
///
/// Deserializing checks the invariant: a document whose `total` disagrees
/// with its counts is rejected, and a missing `total` is recomputed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRunSummary")]
pub struct RunSummary {
    total: u64,
    saved: u64,
    not_found: u64,
    failed: u64,
}

impl RunSummary {
    /// Build a summary from outcome counts
    pub fn new(saved: u64, not_found: u64, failed: u64) -> Self {
        Self {
            total: saved + not_found + failed,
            saved,
            not_found,
            failed,
        }
    }

    /// Fold a set of outcomes into a summary (order-independent)
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    /// Count one outcome
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Saved { .. } => self.saved += 1,
            Outcome::NotFound => self.not_found += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        self.total += 1;
    }

    /// Number of recorded outcomes
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Images saved
    pub fn saved(&self) -> u64 {
        self.saved
    }

    /// Candidates the server does not have
    pub fn not_found(&self) -> u64 {
        self.not_found
    }

    /// Candidates that failed to fetch, validate or write
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// `saved + not_found + failed == total`
    pub fn is_consistent(&self) -> bool {
        self.saved + self.not_found + self.failed == self.total
    }
}

/// Wire form of [`RunSummary`] before the invariant is checked
#[derive(Deserialize)]
struct RawRunSummary {
    #[serde(default)]
    total: Option<u64>,
    saved: u64,
    not_found: u64,
    failed: u64,
}

impl TryFrom<RawRunSummary> for RunSummary {
    type Error = String;

    fn try_from(raw: RawRunSummary) -> Result<Self, Self::Error> {
        let sum = raw
            .saved
            .checked_add(raw.not_found)
            .and_then(|n| n.checked_add(raw.failed))
            .ok_or_else(|| "outcome counts overflow".to_string())?;
        match raw.total {
            Some(total) if total != sum => Err(format!(
                "total {total} does not equal saved + not_found + failed ({sum})"
            )),
            _ => Ok(Self::new(raw.saved, raw.not_found, raw.failed)),
        }
    }
}

/// Shared, lock-free outcome accumulator
#[derive(Debug, Default)]
pub struct SummaryCounter {
    saved: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
}

impl SummaryCounter {
    /// Create a zeroed counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome
    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Saved { .. } => &self.saved,
            Outcome::NotFound => &self.not_found,
            Outcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counts
    pub fn snapshot(&self) -> RunSummary {
        RunSummary::new(
            self.saved.load(Ordering::Relaxed),
            self.not_found.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

/// Everything the caller learns about a finished run
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    /// Outcome counts for every candidate that finished
    pub summary: RunSummary,
    /// Number of candidates the run was asked to try
    pub requested: u32,
    /// Directory images were written to
    pub destination: PathBuf,
    /// Whether the run was cancelled before every candidate finished
    pub interrupted: bool,
    /// When dispatch began
    pub started_at: DateTime<Utc>,
    /// When the last outcome was recorded
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
