//! Image bytes and configurations for end-to-end runs

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use gallery_fetch::config::{Config, FileCollisionAction, RetryConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// A small valid JPEG
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, 90]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .unwrap();
    cursor.into_inner()
}

/// Config rooted at `root` with millisecond retry delays
pub fn test_config(root: &Path, concurrency: usize, collision: FileCollisionAction) -> Config {
    let mut config = Config::default();
    config.download.downloads_root = root.to_path_buf();
    config.download.max_concurrent_requests = concurrency;
    config.download.file_collision = collision;
    config.http.timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Regular files under `dir`, recursively
pub fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}
