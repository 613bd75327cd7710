//! Download orchestration
//!
//! [`GalleryDownloader`] turns a [`GallerySpec`] into files on disk:
//! - [`storage`] - destination creation and atomic per-file writes
//! - [`candidate`] - fetch, validate and persist a single candidate
//!
//! Candidates are dispatched through a bounded `buffer_unordered` stream,
//! so at most `max_concurrent_requests` are in flight at once. Outcomes
//! are folded into a lock-free [`SummaryCounter`] and broadcast as
//! [`Event`]s as they complete.

mod candidate;
pub(crate) mod storage;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{Fetcher, HttpImageSource, ImageSource};
use crate::gallery::GallerySpec;
use crate::summary::{RunReport, SummaryCounter};
use crate::types::Event;
use crate::validator::ImageValidator;

use candidate::{CandidateContext, process_candidate};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Gallery download orchestrator (cloneable - shared state is Arc-wrapped)
#[derive(Clone)]
pub struct GalleryDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Image source plus retry policy
    fetcher: Arc<Fetcher>,
    validator: ImageValidator,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Cancels every run started from this downloader
    cancel_token: CancellationToken,
}

impl GalleryDownloader {
    /// Create a downloader that fetches over HTTP
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let source = HttpImageSource::new(&config.http)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Create a downloader over any [`ImageSource`]
    pub fn with_source(config: Config, source: Arc<dyn ImageSource>) -> Self {
        let fetcher = Fetcher::new(source, config.retry.clone())
            .require_image_content_type(config.validation.require_image_content_type);
        let validator = ImageValidator::new(&config.validation);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            validator,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Subscribe to run events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Token that stops runs on this downloader when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop dispatching candidates and abort in-flight fetches
    ///
    /// Cancellation is permanent for this downloader.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Derive the gallery from `seed_url` and download it into
    /// `<downloads_root>/<folder>`
    pub async fn download_gallery(
        &self,
        seed_url: &str,
        folder: &str,
        max_images: u32,
    ) -> Result<RunReport> {
        let spec = GallerySpec::from_seed(seed_url, max_images)?;
        let destination = self.config.destination_for(folder);
        self.run(&spec, &destination).await
    }

    /// Try every candidate of `spec`, saving valid images under `destination`
    ///
    /// Only a destination that cannot be created is an error; every
    /// per-candidate problem is counted in the returned summary.
    pub async fn run(&self, spec: &GallerySpec, destination: &Path) -> Result<RunReport> {
        storage::ensure_destination(destination).await?;

        let requested = spec.max_images();
        let started_at = Utc::now();
        tracing::info!(
            base_url = spec.base_url(),
            identifier = spec.identifier(),
            total = requested,
            destination = %destination.display(),
            "Starting gallery download"
        );
        self.emit(Event::Started {
            total: requested,
            destination: destination.to_path_buf(),
        });

        let counter = SummaryCounter::new();
        let ctx = CandidateContext {
            fetcher: &self.fetcher,
            validator: &self.validator,
            collision: self.config.download.file_collision,
            destination,
            cancel_token: &self.cancel_token,
        };

        stream::iter(spec.candidates())
            .map(|candidate| {
                let ctx = &ctx;
                let counter = &counter;
                async move {
                    if self.cancel_token.is_cancelled() {
                        return;
                    }
                    let Some(outcome) = process_candidate(ctx, &candidate).await else {
                        return;
                    };
                    counter.record(&outcome);
                    self.emit(Event::CandidateFinished {
                        index: candidate.index,
                        url: candidate.url,
                        outcome,
                    });
                }
            })
            .buffer_unordered(self.config.download.concurrency())
            .for_each(|()| futures::future::ready(()))
            .await;

        let summary = counter.snapshot();
        let interrupted = summary.total() < u64::from(requested);
        if interrupted {
            tracing::warn!(
                completed = summary.total(),
                total = requested,
                "Gallery download interrupted"
            );
        } else {
            tracing::info!(
                saved = summary.saved(),
                not_found = summary.not_found(),
                failed = summary.failed(),
                "Gallery download finished"
            );
        }
        self.emit(Event::Finished {
            summary,
            interrupted,
        });

        Ok(RunReport {
            summary,
            requested,
            destination: destination.to_path_buf(),
            interrupted,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped.
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
