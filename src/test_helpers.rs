//! Shared test helpers: encoded image fixtures and a scripted image source.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::FetchError;
use crate::fetcher::{FetchedBody, ImageSource};

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 40) as u8, (y * 40) as u8, 128])
    });
    // GIF frames are RGBA, JPEG has no alpha channel
    let image = match format {
        ImageFormat::Gif => DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(image).to_rgba8()),
        _ => DynamicImage::ImageRgb8(image),
    };
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub(crate) fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Gif)
}

/// Scripted response for one URL
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// 200 with this body and content type
    Body(Vec<u8>, Option<&'static str>),
    /// Every attempt fails with this error
    Error(FetchError),
    /// Fail with the error for the first `n` attempts, then serve the body
    FlakyThen(usize, FetchError, Vec<u8>),
    /// Sleep, then serve the body
    Slow(Duration, Vec<u8>),
}

/// In-memory [`ImageSource`] answering from a URL → [`Reply`] table.
///
/// URLs without an entry answer 404. Every call is counted per URL.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    replies: HashMap<String, Reply>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(url.into(), reply);
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageSource for ScriptedSource {
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // let concurrent callers overlap
        tokio::time::sleep(Duration::from_millis(2)).await;

        let result = match self.replies.get(url) {
            None => Err(FetchError::NotFound { status: 404 }),
            Some(Reply::Body(bytes, content_type)) => Ok(FetchedBody {
                bytes: Bytes::from(bytes.clone()),
                content_type: content_type.map(str::to_string),
            }),
            Some(Reply::Error(err)) => Err(err.clone()),
            Some(Reply::FlakyThen(failures, err, bytes)) => {
                if attempt <= *failures {
                    Err(err.clone())
                } else {
                    Ok(FetchedBody {
                        bytes: Bytes::from(bytes.clone()),
                        content_type: Some("image/jpeg".to_string()),
                    })
                }
            }
            Some(Reply::Slow(delay, bytes)) => {
                tokio::time::sleep(*delay).await;
                Ok(FetchedBody {
                    bytes: Bytes::from(bytes.clone()),
                    content_type: Some("image/jpeg".to_string()),
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
