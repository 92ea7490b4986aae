//! # WXR Common Library
//!
//! Shared code for the export importer:
//! - Error type shared by the engine and content stores
//! - Configuration loading (TOML file, environment overrides)
//! - Import progress events and diagnostics

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
