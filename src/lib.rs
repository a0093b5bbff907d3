//! scour: a metasearch engine
//!
//! scour fans a query out to a configurable set of upstream search engines,
//! scrapes or decodes whatever each one returns, and merges everything into a
//! single ranked, deduplicated result list.

pub mod config;
pub mod engines;
pub mod network;
pub mod results;
pub mod search;
pub mod stats;
pub mod web;

pub use config::Settings;
pub use engines::Engine;
pub use results::SearchResult;
pub use search::Searcher;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Titles longer than this many characters are cut off with an ellipsis.
pub const MAX_TITLE_LEN: usize = 100;

/// Descriptions longer than this many characters are cut off with an ellipsis.
pub const MAX_DESCRIPTION_LEN: usize = 300;
