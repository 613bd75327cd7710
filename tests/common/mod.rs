//! Common test utilities for gallery-fetch E2E tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod mock_gallery;

pub use fixtures::*;
pub use mock_gallery::*;
