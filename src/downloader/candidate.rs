//! Per-candidate pipeline: fetch, validate, persist

use std::path::Path;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::config::FileCollisionAction;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::gallery::Candidate;
use crate::types::Outcome;
use crate::validator::ImageValidator;

use super::storage;

/// Shared, read-only state every candidate needs
pub(super) struct CandidateContext<'a> {
    pub(super) fetcher: &'a Fetcher,
    pub(super) validator: &'a ImageValidator,
    pub(super) collision: FileCollisionAction,
    pub(super) destination: &'a Path,
    pub(super) cancel_token: &'a CancellationToken,
}

/// Drive one candidate to its outcome
///
/// Returns `None` when cancelled before the image was written; such
/// candidates are not counted.
pub(super) async fn process_candidate(
    ctx: &CandidateContext<'_>,
    candidate: &Candidate,
) -> Option<Outcome> {
    let target = ctx.destination.join(&candidate.file_name);

    if ctx.collision == FileCollisionAction::Skip
        && tokio::fs::metadata(&target)
            .await
            .is_ok_and(|metadata| metadata.is_file())
    {
        tracing::debug!(
            index = candidate.index,
            path = %target.display(),
            "File already present, skipping"
        );
        return Some(Outcome::Saved { path: target });
    }

    let fetched = tokio::select! {
        biased;
        _ = ctx.cancel_token.cancelled() => {
            tracing::debug!(index = candidate.index, "Candidate cancelled in flight");
            return None;
        }
        fetched = fetch_and_validate(ctx, candidate) => fetched,
    };

    let bytes = match fetched {
        Ok(bytes) => bytes,
        Err(outcome) => return Some(outcome),
    };

    let outcome = match storage::write_image(&target, &bytes, ctx.collision).await {
        Ok(path) => {
            tracing::info!(
                index = candidate.index,
                path = %path.display(),
                bytes = bytes.len(),
                "Image saved"
            );
            Outcome::Saved { path }
        }
        Err(e) => {
            tracing::info!(
                index = candidate.index,
                path = %target.display(),
                error = %e,
                "Failed to write image"
            );
            Outcome::failed(format!("write failed: {e}"))
        }
    };
    Some(outcome)
}

/// Fetch the candidate and check the body decodes; any other result is the
/// candidate's final outcome.
async fn fetch_and_validate(
    ctx: &CandidateContext<'_>,
    candidate: &Candidate,
) -> Result<Bytes, Outcome> {
    let report = ctx.fetcher.fetch(&candidate.url).await;
    let retries = report.retries();
    let body = match report.outcome {
        FetchOutcome::Fetched(body) => body,
        FetchOutcome::NotFound => return Err(Outcome::NotFound),
        FetchOutcome::Failed(e) => {
            tracing::info!(
                index = candidate.index,
                url = %candidate.url,
                retries,
                error = %e,
                "Candidate failed"
            );
            return Err(Outcome::failed(e));
        }
    };

    // Decoding is CPU-bound; keep it off the async workers
    let validator = ctx.validator.clone();
    let bytes = body.bytes;
    let checked = bytes.clone();
    match tokio::task::spawn_blocking(move || validator.inspect(&checked)).await {
        Ok(Ok(info)) => {
            tracing::debug!(
                index = candidate.index,
                width = info.width,
                height = info.height,
                "Image validated"
            );
            Ok(bytes)
        }
        Ok(Err(e)) => {
            tracing::info!(index = candidate.index, url = %candidate.url, error = %e, "Invalid image");
            Err(Outcome::failed(format!("invalid image: {e}")))
        }
        Err(e) => Err(Outcome::failed(format!("validation task failed: {e}"))),
    }
}
