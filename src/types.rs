//! Core types and events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::summary::RunSummary;

/// Classified result of fetching and validating one candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A valid image was written (or already present, under the skip policy)
    Saved {
        /// Where the image lives on disk
        path: PathBuf,
    },
    /// The server has no image at this index
    NotFound,
    /// Fetch, validation or write failed
    Failed {
        /// One-line description of what went wrong
        reason: String,
    },
}

impl Outcome {
    /// Build a [`Outcome::Failed`] from anything displayable
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Outcome::Failed {
            reason: reason.to_string(),
        }
    }

    /// Short label used in logs and progress output
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Saved { .. } => "saved",
            Outcome::NotFound => "not_found",
            Outcome::Failed { .. } => "failed",
        }
    }
}

/// Event emitted while a gallery run progresses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The destination exists and candidates are about to be dispatched
    Started {
        /// Number of candidates in the run
        total: u32,
        /// Directory images are written to
        destination: PathBuf,
    },

    /// One candidate reached its final outcome
    CandidateFinished {
        /// Candidate index
        index: u32,
        /// Candidate URL
        url: String,
        /// Final outcome
        outcome: Outcome,
    },

    /// The run ended (completed or interrupted)
    Finished {
        /// Counts of recorded outcomes
        summary: RunSummary,
        /// Whether the run was cancelled before every candidate finished
        interrupted: bool,
    },
}
