//! # gallery-fetch
//!
//! Concurrent downloader for numbered image galleries.
//!
//! A gallery index page such as `https://example.com/gallery/foo12/index.html`
//! implies image URLs `.../foo12/images/foo1.jpg`, `foo2.jpg`, and so on.
//! gallery-fetch tries every index up to a limit under a bounded number of
//! concurrent requests, keeps only bodies that decode as images, and reports
//! how many were saved, missing or failed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gallery_fetch::{Config, GalleryDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = GalleryDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader
//!         .download_gallery("https://example.com/gallery/foo12/index.html", "foo", 100)
//!         .await?;
//!     println!("{}", gallery_fetch::reporter::format_summary(&report));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Single-URL fetching with retry
pub mod fetcher;
/// Gallery URL derivation
pub mod gallery;
/// Progress display and summary formatting
pub mod reporter;
/// Retry logic with exponential backoff
pub mod retry;
/// Run summaries and reports
pub mod summary;
/// Core types and events
pub mod types;
/// Filesystem helpers
pub mod utils;
/// Image validation
pub mod validator;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{Config, FileCollisionAction};
pub use downloader::GalleryDownloader;
pub use error::{Error, FetchError, InvalidImageError, Result};
pub use fetcher::{FetchOutcome, FetchReport, Fetcher, HttpImageSource, ImageSource};
pub use gallery::{Candidate, GallerySpec};
pub use summary::{RunReport, RunSummary};
pub use types::{Event, Outcome};
pub use validator::ImageValidator;

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives SIGINT or SIGTERM (Ctrl+C elsewhere)
///
/// # Example
///
/// ```no_run
/// use gallery_fetch::{Config, GalleryDownloader, cancel_on_signal};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = GalleryDownloader::new(Config::default())?;
/// tokio::spawn(cancel_on_signal(downloader.cancel_token()));
/// downloader
///     .download_gallery("https://example.com/gallery/foo12/index.html", "foo", 50)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("Cancelling download");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Handlers may fail to register in restricted environments
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_on_signal_returns_when_token_is_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let waiter = tokio::spawn(cancel_on_signal(token.clone()));

        token.cancel();

        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("watcher should exit once the token is cancelled")
            .unwrap();
    }
}
