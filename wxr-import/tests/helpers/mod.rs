//! Test Helper Utilities
//!
//! Shared utilities for testing wxr-import

#![allow(dead_code, unused_imports)]

pub mod fake_fetcher;
pub mod fixtures;
pub mod log_capture;

// Re-export commonly used items
pub use fake_fetcher::{FakeFetcher, FakeResponse};
pub use fixtures::{
    attachment, author, comment, export, jpeg_bytes, menu_item, page, png_bytes, post, term,
    TestSite, OLD_SITE, UPLOADS_URL,
};
pub use log_capture::{capture_logs, LogCapture};
