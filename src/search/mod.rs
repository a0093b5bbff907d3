//! Search orchestration
//!
//! The [`Searcher`] fans a query out to every selected engine at once,
//! waits for all of them, and folds whatever came back into one ranked,
//! deduplicated list.

use crate::config::Settings;
use crate::engines::{Engine, EngineError, Registry};
use crate::results::{truncate, Blacklist, SearchResult, UrlRewriter};
use crate::stats::StatsTable;
use crate::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// A search failure that is not attributable to a single engine.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("empty query")]
    EmptyQuery,

    /// Every selected engine returned an error; the per-engine map says
    /// which error for which engine.
    #[error("no engines performed a query successfully")]
    AllEnginesFailed { errors: HashMap<String, EngineError> },
}

/// The results of a (at least partially) successful search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,

    /// Errors from engines that failed. Partial failure is silent success;
    /// these are available for display but not fatal.
    pub errors: HashMap<String, EngineError>,
}

/// Coordinates searching across the enabled engines.
pub struct Searcher {
    engines: Vec<(String, Arc<dyn Engine>)>,
    settings: Settings,
    rewriter: UrlRewriter,
    blacklist: Blacklist,
    stats: Arc<StatsTable>,
}

/// Handle the `:` operator, which routes a query to specific engines.
///
/// `":ddg hello"` searches only DuckDuckGo for "hello"; a `\:` prefix
/// escapes a literal colon token. Queries without a colon come back
/// untouched.
pub fn process_operators(query: &str) -> (Vec<String>, String) {
    if !query.contains(':') {
        return (Vec::new(), query.to_string());
    }

    let mut requested = Vec::new();
    let mut kept = Vec::new();

    for tok in query.split(' ') {
        if let Some(rest) = tok.strip_prefix("\\:") {
            kept.push(format!(":{rest}"));
        } else if let Some(rest) = tok.strip_prefix(':') {
            requested.push(rest.to_string());
        } else {
            kept.push(tok.to_string());
        }
    }

    let new_query = kept.join(" ").trim().to_string();
    (requested, new_query)
}

impl Searcher {
    /// Construct every enabled engine and compile the link filters.
    pub fn from_settings(settings: &Settings, registry: &Registry) -> Result<Self> {
        let mut engines: Vec<(String, Arc<dyn Engine>)> = Vec::new();
        for name in registry.enabled_engines(settings) {
            let cfg = settings.engine(&name);
            let engine = registry
                .create(&cfg)
                .with_context(|| format!("failed to initialize engine {name:?}"))?;
            info!("initialized engine {name:?}");
            engines.push((name, engine));
        }

        let rewriter = UrlRewriter::compile(&settings.rewrite)?;

        let mut blacklist = Blacklist::new();
        for path in &settings.blacklists {
            let n = blacklist.load_file(path)?;
            info!("loaded {n} blacklist rules from {}", path.display());
        }

        Ok(Self {
            engines,
            settings: settings.clone(),
            rewriter,
            blacklist,
            stats: Arc::new(StatsTable::new()),
        })
    }

    /// Names of the engines this searcher can use, in stable order.
    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The enabled engines themselves, for the pinger.
    pub fn engines(&self) -> Vec<(String, Arc<dyn Engine>)> {
        self.engines.clone()
    }

    pub fn stats(&self) -> Arc<StatsTable> {
        self.stats.clone()
    }

    /// Search all requested engines.
    ///
    /// `requested` is the caller's engine selection (typically from the
    /// settings cookie); the `:` operator in the query overrides it, and an
    /// empty selection means every enabled engine.
    pub async fn search(
        &self,
        raw_query: &str,
        page: u32,
        requested: &[String],
    ) -> Result<SearchOutcome, SearchError> {
        let (mut want, query) = process_operators(raw_query);
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if want.is_empty() {
            want = requested.to_vec();
        }

        let selected: Vec<&(String, Arc<dyn Engine>)> = self
            .engines
            .iter()
            .filter(|(name, _)| want.is_empty() || want.contains(name))
            .collect();

        let tasks = selected.iter().map(|(name, engine)| {
            let query = query.as_str();
            async move {
                let then = Instant::now();
                let res = engine.search(query, page).await;
                self.stats.record_request_time(name, then.elapsed());
                (name.clone(), res)
            }
        });

        let mut results = Vec::new();
        let mut errors = HashMap::new();

        for (name, outcome) in join_all(tasks).await {
            match outcome {
                Ok(res) => {
                    self.stats.add_result_count(&name, res.len() as u64);
                    results.extend(res);
                }
                Err(e) => {
                    warn!("searching {name:?} failed: {e}");
                    self.stats.inc_error_count(&name);
                    errors.insert(name, e);
                }
            }
        }

        if !selected.is_empty() && errors.len() == selected.len() {
            return Err(SearchError::AllEnginesFailed { errors });
        }

        Ok(SearchOutcome {
            results: self.process_results(results),
            errors,
        })
    }

    /// Merge, filter, score and sort the concatenated engine results.
    fn process_results(&self, mut res: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut i = 0;

        while i < res.len() {
            let link = self
                .rewriter
                .rewrite(res[i].link.trim_end_matches('/'));

            // An empty link is either invalid or was explicitly removed by
            // a rewrite rule; either way it goes.
            if link.is_empty() {
                res.swap_remove(i);
                continue;
            }

            if !self.blacklist.is_empty() && self.blacklist.contains(&link) {
                for source in &res[i].sources {
                    self.stats.add_dropped_count(source, 1);
                }
                res.swap_remove(i);
                continue;
            }

            res[i].link = link.clone();

            let Some(&idx) = first_seen.get(&link) else {
                // First occurrence: it stays, with its fields bounded.
                first_seen.insert(link, i);
                res[i].score = 1.0;
                res[i].title = truncate(std::mem::take(&mut res[i].title), MAX_TITLE_LEN);
                res[i].description =
                    truncate(std::mem::take(&mut res[i].description), MAX_DESCRIPTION_LEN);
                i += 1;
                continue;
            };

            // Duplicate: fold it into the first occurrence. Results seen
            // several times sort higher.
            let dup = res.swap_remove(i);
            let first = &mut res[idx];

            for source in dup.sources {
                if !first.sources.contains(&source) {
                    first.sources.push(source);
                }
            }

            if first.title.is_empty() {
                first.title = truncate(dup.title, MAX_TITLE_LEN);
            }
            if first.description.is_empty() {
                first.description = truncate(dup.description, MAX_DESCRIPTION_LEN);
            }

            first.score += 1.0;
        }

        // Descending by weighted score; the sort is stable, so ties keep
        // first-seen order.
        let mut keyed: Vec<(f64, SearchResult)> = res
            .into_iter()
            .map(|r| (self.sorting_score(&r), r))
            .collect();
        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    /// The score a result is sorted by: its duplicate count times the sum
    /// of its source engines' weights.
    fn sorting_score(&self, res: &SearchResult) -> f64 {
        let weight: f64 = res
            .sources
            .iter()
            .map(|name| self.settings.engine_weight(name))
            .sum();
        weight * res.score
    }
}
