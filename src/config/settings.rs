//! Settings structures for the scour configuration file

use super::ConfDuration;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User agent sent by default; mimics a current Chrome desktop build.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Total amount of time an engine will wait for a full HTTP response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Main settings structure, one per process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Listen address, e.g. `:8080` or `127.0.0.1:8080`.
    pub addr: String,

    /// Canonical public URL of this instance.
    pub base_url: String,

    /// Interval between engine liveness probes.
    pub ping_interval: ConfDuration,

    /// Global HTTP proxy. Empty defers to `HTTP_PROXY`; a literal `-`
    /// suppresses the environment as well.
    pub http_proxy: String,

    /// Optional debug listener address for the profiling endpoint.
    pub pprof: String,

    /// Per-engine configuration, keyed by engine name.
    pub engines: HashMap<String, EngineSettings>,

    /// Engine names to force-disable even if they are in the default set.
    pub disabled: Vec<String>,

    /// URL rewrite rules, applied in order; first match wins.
    pub rewrite: Vec<RewriteRuleConfig>,

    /// Paths to uBlacklist-format rule files.
    pub blacklists: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: ":8080".to_string(),
            base_url: "http://localhost:8080".to_string(),
            ping_interval: ConfDuration(Duration::from_secs(15 * 60)),
            http_proxy: String::new(),
            pprof: String::new(),
            engines: HashMap::new(),
            disabled: Vec::new(),
            rewrite: Vec::new(),
            blacklists: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file and validate them.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rewrite.iter().enumerate() {
            match (&rule.find, &rule.hostname) {
                (Some(_), Some(_)) => {
                    bail!("rewrite rule {i}: both find and hostname defined in rule")
                }
                (None, None) => {
                    bail!("rewrite rule {i}: one of find or hostname must be set")
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve the listen address. A bare `:port` binds on all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        };

        addr.parse()
            .with_context(|| format!("invalid listen address {:?}", self.addr))
    }

    /// Configuration for a single engine; defaults when it has no entry.
    pub fn engine(&self, name: &str) -> EngineSettings {
        let mut cfg = self.engines.get(name).cloned().unwrap_or_default();
        cfg.name = name.to_string();
        if cfg.http_proxy.is_empty() {
            cfg.http_proxy = self.http_proxy.clone();
        }
        cfg
    }

    /// The weight an engine's results are multiplied by at sort time.
    ///
    /// A configured weight of zero counts as 1.0.
    pub fn engine_weight(&self, name: &str) -> f64 {
        match self.engines.get(name) {
            Some(cfg) if cfg.weight != 0.0 => cfg.weight,
            _ => 1.0,
        }
    }
}

/// Configuration for a single engine.
///
/// The zero value is safe to use: every field falls back to a sensible
/// default when left unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Backend to use for this engine. Empty means the engine's name is
    /// also its type, which covers every built-in engine.
    #[serde(rename = "type")]
    pub engine_type: String,

    /// Name of the engine; this is what shows up in a result's sources.
    /// Filled in from the config map key.
    #[serde(skip)]
    pub name: String,

    /// User-Agent header value. Empty uses [`DEFAULT_USER_AGENT`].
    pub user_agent: String,

    /// Request timeout. Zero uses [`DEFAULT_TIMEOUT`].
    pub timeout: ConfDuration,

    /// Score multiplier for results from this engine. Zero counts as 1.0.
    pub weight: f64,

    /// Log extra information when doing HTTP requests.
    pub debug: bool,

    /// Send requests through this HTTP proxy. Empty defers to `HTTP_PROXY`;
    /// `-` suppresses the environment as well.
    pub http_proxy: String,

    /// Enable HTTP/3.
    pub quic: bool,

    /// Enable 0-RTT on HTTP/3 connections. Safe here because every request
    /// scour makes is idempotent.
    pub quic_0rtt: bool,

    /// Engine-specific settings with no dedicated field, e.g. the MediaWiki
    /// `endpoint`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl EngineSettings {
    /// The backend type, falling back to the engine name.
    pub fn driver(&self) -> &str {
        if self.engine_type.is_empty() {
            &self.name
        } else {
            &self.engine_type
        }
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout.get()
        }
    }

    /// Effective user agent.
    pub fn user_agent(&self) -> &str {
        if self.user_agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            &self.user_agent
        }
    }

    /// Look up a string value in the extra settings.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// A single URL rewrite rule as it appears in the config file.
///
/// Exactly one of `find` and `hostname` must be set; [`Settings::validate`]
/// rejects everything else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewriteRuleConfig {
    /// Regular expression matched against the whole link.
    pub find: Option<String>,

    /// Hostname to match exactly.
    pub hostname: Option<String>,

    /// Replacement text. Empty drops the result entirely.
    pub replace: String,
}
