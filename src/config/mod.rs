//! Configuration loading for scour
//!
//! The configuration is a single YAML document. Every key has a default so an
//! empty file (or no file at all) yields a working instance.

mod duration;
mod settings;

pub use duration::{parse_duration, ConfDuration};
pub use settings::{EngineSettings, RewriteRuleConfig, Settings, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
