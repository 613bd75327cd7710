use super::*;
use crate::config::{FileCollisionAction, RetryConfig};
use crate::error::FetchError;
use crate::test_helpers::{Reply, ScriptedSource, jpeg_bytes};
use crate::types::Outcome;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;


const SEED: &str = "https://example.com/gallery/foo12/index.html";

fn image_url(index: u32) -> String {
    format!("https://example.com/gallery/foo12/images/foo{index}.jpg")
}

fn test_config(concurrency: usize, collision: FileCollisionAction) -> Config {
    let mut config = Config::default();
    config.download.max_concurrent_requests = concurrency;
    config.download.file_collision = collision;
    config.retry = RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

fn downloader(source: &Arc<ScriptedSource>, config: Config) -> GalleryDownloader {
    GalleryDownloader::with_source(config, Arc::clone(source) as Arc<dyn ImageSource>)
}

fn spec(max_images: u32) -> GallerySpec {
    GallerySpec::from_seed(SEED, max_images).unwrap()
}

/// Indices 1-3 valid, 4 missing, 5 refuses every connection
fn mixed_source() -> ScriptedSource {
    ScriptedSource::new()
        .with(image_url(1), Reply::Body(jpeg_bytes(4, 4), Some("image/jpeg")))
        .with(image_url(2), Reply::Body(jpeg_bytes(4, 4), Some("image/jpeg")))
        .with(image_url(3), Reply::Body(jpeg_bytes(4, 4), Some("image/jpeg")))
        .with(
            image_url(5),
            Reply::Error(FetchError::Connect("connection refused".to_string())),
        )
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
