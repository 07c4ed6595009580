//! # somnolog-core
//!
//! Core library for somnolog - a sleep log with tag-impact analytics.
//!
//! This library provides:
//! - Domain types for sleep logs and their tags
//! - The analytics engine (tag impacts, rankings, heatmaps, summaries)
//! - A JSON-file log store with import/export
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Storage:** one JSON array on disk, owned by [`LogStore`]
//! - **Snapshot:** the `&[SleepLog]` slice handed to the analytics engine
//! - **Derived:** impacts, rankings and heatmaps, recomputed on every query
//!
//! ## Example
//!
//! ```rust,no_run
//! use somnolog_core::{analytics, Config, LogStore};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the log collection
//! let store = LogStore::open(&config.logs_path()).expect("failed to open logs");
//! let impacts = analytics::impacts_for(store.logs());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use store::{ImportSummary, LogStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod store;
pub mod types;
