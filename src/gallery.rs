//! Gallery URL derivation
//!
//! A gallery index page lives at `.../<segment>/index.html`. The letters of
//! `<segment>` form the gallery identifier, and the images sit next to the
//! index page as `images/<identifier><n>.jpg`, numbered from 1:
//!
//! ```
//! use gallery_fetch::gallery::GallerySpec;
//!
//! let spec = GallerySpec::from_seed("https://example.com/gallery/foo12/index.html", 3).unwrap();
//! assert_eq!(spec.identifier(), "foo");
//! let urls: Vec<_> = spec.candidates().map(|c| c.url).collect();
//! assert_eq!(urls[0], "https://example.com/gallery/foo12/images/foo1.jpg");
//! assert_eq!(urls.len(), 3);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// `<prefix>/<segment>/index.html`, with `<segment>` made of word characters
#[allow(clippy::expect_used)]
static INDEX_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.*/)(?P<segment>\w+)/index\.html$").expect("literal pattern")
});

/// Immutable description of one gallery run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GallerySpec {
    seed_url: String,
    base_url: String,
    identifier: String,
    max_images: u32,
}

/// One hypothesized image URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// 1-based position in the gallery
    pub index: u32,
    /// Image URL derived from the gallery base and index
    pub url: String,
    /// File name the image is saved under
    pub file_name: String,
}

impl GallerySpec {
    /// Derive a gallery from its index-page URL
    ///
    /// Fails with [`Error::MalformedUrl`] if the URL is not an http(s) URL
    /// ending in `/<segment>/index.html` or the segment has no letters, and
    /// with [`Error::Config`] if `max_images` is zero. No network access.
    pub fn from_seed(seed_url: &str, max_images: u32) -> Result<Self> {
        if max_images == 0 {
            return Err(Error::config("max_images", "must be at least 1"));
        }

        let seed_url = seed_url.trim();
        let (base_url, identifier) = parse_seed(seed_url)?;

        Ok(Self {
            seed_url: seed_url.to_string(),
            base_url,
            identifier,
            max_images,
        })
    }

    /// The index-page URL this gallery was derived from
    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    /// Seed URL without `index.html`, query or fragment
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gallery identifier shared by every image name
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Number of candidates generated for this gallery
    pub fn max_images(&self) -> u32 {
        self.max_images
    }

    /// Candidate for `index`, or `None` outside `1..=max_images`
    pub fn candidate(&self, index: u32) -> Option<Candidate> {
        (1..=self.max_images).contains(&index).then(|| Candidate {
            index,
            url: build_candidate_url(&self.base_url, &self.identifier, index),
            file_name: candidate_file_name(&self.identifier, index),
        })
    }

    /// All candidates, in index order
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        (1..=self.max_images).filter_map(|index| self.candidate(index))
    }
}

/// Extract the gallery identifier from an index-page URL
pub fn derive_identifier(seed_url: &str) -> Result<String> {
    parse_seed(seed_url.trim()).map(|(_, identifier)| identifier)
}

/// Image URL for `index` within a gallery
///
/// Pure: the same inputs always give the same URL, and distinct indices give
/// distinct URLs.
pub fn build_candidate_url(base_url: &str, identifier: &str, index: u32) -> String {
    format!(
        "{}/images/{}",
        base_url.trim_end_matches('/'),
        candidate_file_name(identifier, index)
    )
}

/// File name for `index`, matching the remote naming convention
pub fn candidate_file_name(identifier: &str, index: u32) -> String {
    format!("{identifier}{index}.jpg")
}

fn parse_seed(seed_url: &str) -> Result<(String, String)> {
    let url = Url::parse(seed_url)
        .map_err(|e| Error::malformed_url(seed_url, format!("not a valid URL ({e})")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::malformed_url(
            seed_url,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(Error::malformed_url(seed_url, "missing host"));
    }

    let captures = INDEX_PATH.captures(url.path()).ok_or_else(|| {
        Error::malformed_url(seed_url, "expected a path ending in /<gallery>/index.html")
    })?;
    let prefix = &captures["prefix"];
    let segment = &captures["segment"];

    let identifier: String = segment.chars().filter(|c| c.is_alphabetic()).collect();
    if identifier.is_empty() {
        return Err(Error::malformed_url(
            seed_url,
            format!("gallery segment {segment:?} contains no letters"),
        ));
    }

    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.set_path(&format!("{prefix}{segment}"));

    Ok((base.to_string(), identifier))
}
