//! Configuration types for gallery-fetch
//!
//! A run is driven entirely by a [`Config`] passed to the downloader, so the
//! same core serves the interactive CLI, flag-driven invocations and tests.

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Download behavior configuration (destination root, concurrency, collisions)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory under which each gallery folder is created (default: "downloads")
    #[serde(default = "default_downloads_root")]
    pub downloads_root: PathBuf,

    /// Maximum number of simultaneous in-flight requests (default: 10)
    ///
    /// A value of 0 is treated as 1.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// What to do when the destination file already exists
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            downloads_root: default_downloads_root(),
            max_concurrent_requests: default_max_concurrent_requests(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

impl DownloadConfig {
    /// Effective concurrency limit (never zero)
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 15 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry behavior for transient failures
///
/// Transient failures are timeouts, connection errors and 5xx-class
/// responses. The delay before retry `n` (1-based) is
/// `initial_delay * backoff_multiplier^(n-1)`, capped at `max_delay`, and
/// optionally jittered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 5 seconds)
    #[serde(default = "default_max_delay", with = "millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Image validation thresholds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum accepted width in pixels (default: 1)
    #[serde(default = "default_min_dimension")]
    pub min_width: u32,

    /// Minimum accepted height in pixels (default: 1)
    #[serde(default = "default_min_dimension")]
    pub min_height: u32,

    /// Reject responses whose Content-Type is present and not `image/*` (default: false)
    ///
    /// The decode check still runs on bodies that pass.
    #[serde(default)]
    pub require_image_content_type: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_dimension(),
            min_height: default_min_dimension(),
            require_image_content_type: false,
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Replace the existing file (default)
    #[default]
    Overwrite,
    /// Keep the existing file and append (1), (2), etc. to the new one
    Rename,
    /// Keep the existing file and count it as saved without fetching
    Skip,
}

impl std::fmt::Display for FileCollisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileCollisionAction::Overwrite => "overwrite",
            FileCollisionAction::Rename => "rename",
            FileCollisionAction::Skip => "skip",
        };
        f.write_str(name)
    }
}

/// Main configuration for [`GalleryDownloader`](crate::GalleryDownloader)
///
/// Every field has a default, so `Config::default()` is a complete,
/// working configuration and partial JSON documents deserialize cleanly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination and concurrency settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Image validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Config {
    /// Destination directory for a named gallery folder
    pub fn destination_for(&self, folder_name: &str) -> PathBuf {
        self.download.downloads_root.join(folder_name)
    }
}

fn default_downloads_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_user_agent() -> String {
    format!("gallery-fetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_min_dimension() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Retry delays are sub-second, so they round-trip as milliseconds
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
