#![warn(clippy::all, missing_docs)]

//! Core logic for the gamelog console.
//!
//! This crate hosts the metadata model, configuration handling, the
//! file-backed lookup cache, extraction of records from model output and
//! the text-generation client used by the terminal UI.

pub mod cache;
pub mod config;
pub mod extract;
pub mod lookup;
pub mod models;
pub mod provider;
pub mod report;

pub use cache::{CacheKey, LookupCache};
pub use config::AppConfig;
pub use lookup::{Lookup, MetadataService, Origin};
pub use models::{MetadataRecord, Scalar};
pub use provider::{GeminiClient, ProviderError, TextGenerator};
