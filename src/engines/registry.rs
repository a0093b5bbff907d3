//! Engine registry
//!
//! Maps engine type names to factories. The built-in registry is assembled
//! once at startup and read-only afterwards; tests build private registries
//! of their own.

use super::{bing, brave, duckduckgo, google, marginalia, mediawiki, wiby, yahoo, yandex};
use super::Engine;
use crate::config::{EngineSettings, Settings};
use anyhow::{bail, Result};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Constructs an engine instance from its configuration.
pub type Factory = fn(&EngineSettings) -> Result<Arc<dyn Engine>>;

struct Entry {
    factory: Factory,
    default: bool,
}

/// Registry of available engine types.
pub struct Registry {
    // Sorted by name so every derived list has a stable order.
    entries: BTreeMap<&'static str, Entry>,
    defaults: OnceCell<Vec<String>>,
    supported: OnceCell<Vec<String>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            defaults: OnceCell::new(),
            supported: OnceCell::new(),
        }
    }

    /// Create a registry with every built-in engine registered.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register("bing", false, bing::factory);
        r.register("brave", true, brave::factory);
        r.register("ddg", true, duckduckgo::factory);
        r.register("google", true, google::factory);
        r.register("marginalia", true, marginalia::factory);
        r.register("mediawiki", false, mediawiki::factory);
        r.register("wiby", true, wiby::factory);
        r.register("yahoo", true, yahoo::factory);
        r.register("yandex", false, yandex::factory);
        r
    }

    /// Register an engine type.
    ///
    /// Panics if the name is already taken; duplicate registrations are a
    /// programming error, not a runtime condition.
    pub fn register(&mut self, name: &'static str, default: bool, factory: Factory) {
        if self.entries.contains_key(name) {
            panic!("engine name {name:?} already taken");
        }
        self.entries.insert(name, Entry { factory, default });
    }

    /// Whether an engine type exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of the engines searched when the user has not picked any.
    pub fn defaults(&self) -> &[String] {
        self.defaults.get_or_init(|| {
            self.entries
                .iter()
                .filter(|(_, e)| e.default)
                .map(|(name, _)| name.to_string())
                .collect()
        })
    }

    /// Names of every registered engine type.
    pub fn supported(&self) -> &[String] {
        self.supported.get_or_init(|| {
            self.entries.keys().map(|name| name.to_string()).collect()
        })
    }

    /// Instantiate an engine from its configuration.
    pub fn create(&self, cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
        if cfg.name.is_empty() && cfg.engine_type.is_empty() {
            bail!("engine config has no name or type");
        }

        let driver = cfg.driver();
        match self.entries.get(driver) {
            Some(entry) => (entry.factory)(cfg),
            None => bail!("engine {driver:?} is not known"),
        }
    }

    /// Compute the set of engines enabled by a configuration: the default
    /// set minus `disabled`, plus every configured engine not in `disabled`.
    /// Order is stable: defaults first, then configured extras by name.
    pub fn enabled_engines(&self, settings: &Settings) -> Vec<String> {
        let mut enabled: Vec<String> = self
            .defaults()
            .iter()
            .filter(|name| !settings.disabled.contains(name))
            .cloned()
            .collect();

        let mut extras: Vec<&String> = settings
            .engines
            .keys()
            .filter(|name| !settings.disabled.contains(name) && !enabled.contains(name))
            .collect();
        extras.sort();
        enabled.extend(extras.into_iter().cloned());

        enabled
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry of built-in engines.
pub fn builtin() -> &'static Registry {
    static BUILTIN: Lazy<Registry> = Lazy::new(Registry::with_builtins);
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_all_engines() {
        let r = builtin();
        for name in [
            "bing",
            "brave",
            "ddg",
            "google",
            "marginalia",
            "mediawiki",
            "wiby",
            "yahoo",
            "yandex",
        ] {
            assert!(r.contains(name), "missing engine {name:?}");
        }
        assert_eq!(r.supported().len(), 9);
    }

    #[test]
    fn defaults_exclude_opt_in_engines() {
        let defaults = builtin().defaults();
        assert!(defaults.iter().any(|n| n == "ddg"));
        assert!(defaults.iter().all(|n| n != "bing"));
        assert!(defaults.iter().all(|n| n != "yandex"));
        assert!(defaults.iter().all(|n| n != "mediawiki"));
    }

    #[test]
    fn memoized_lists_are_identical_across_calls() {
        let r = builtin();
        assert_eq!(r.defaults().as_ptr(), r.defaults().as_ptr());
        assert_eq!(r.supported().as_ptr(), r.supported().as_ptr());
    }

    #[test]
    #[should_panic(expected = "already taken")]
    fn duplicate_registration_panics() {
        let mut r = Registry::with_builtins();
        r.register("wiby", true, wiby::factory);
    }

    #[test]
    fn unknown_engines_fail_to_construct() {
        let mut cfg = EngineSettings::default();
        cfg.name = "closed-beta-engine".to_string();
        assert!(builtin().create(&cfg).is_err());
    }

    #[test]
    fn nameless_configs_fail_to_construct() {
        let cfg = EngineSettings::default();
        assert!(builtin().create(&cfg).is_err());
    }

    #[test]
    fn enabled_engines_honors_disabled_and_extras() {
        let yaml = r#"
engines:
  yandex: {}
  yahoo: { weight: 2.0 }
disabled: [wiby]
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        let enabled = builtin().enabled_engines(&settings);

        assert!(enabled.iter().all(|n| n != "wiby"), "disabled engine kept");
        assert!(enabled.iter().any(|n| n == "yandex"), "extra engine missing");
        // yahoo is a default and configured; it appears exactly once.
        assert_eq!(enabled.iter().filter(|n| *n == "yahoo").count(), 1);
        // Defaults come first.
        let yandex_pos = enabled.iter().position(|n| n == "yandex").unwrap();
        assert_eq!(yandex_pos, enabled.len() - 1);
    }
}
