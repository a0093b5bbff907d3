//! Per-engine statistics
//!
//! Counters live for the lifetime of the process and feed the stats page.
//! Each counter has its own lock; readers see each counter at its own
//! consistent point in time, with no consistency guaranteed across
//! counters. Writers are rare, readers are the render path.

use crate::engines::Engine;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Counter tables keyed by engine name.
#[derive(Debug, Default)]
pub struct StatsTable {
    latency: RwLock<HashMap<String, Duration>>,
    result_count: RwLock<HashMap<String, u64>>,
    dropped_count: RwLock<HashMap<String, u64>>,
    error_count: RwLock<HashMap<String, u64>>,
    request_total_time: RwLock<HashMap<String, Duration>>,
    request_count: RwLock<HashMap<String, u64>>,
}

/// A point-in-time view of one engine's counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub latency_ms: u64,
    pub results: u64,
    pub dropped: u64,
    pub errors: u64,
    pub avg_request_time_ms: u64,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of the most recent successful ping, if any. A failed ping
    /// records zero.
    pub fn latency(&self, name: &str) -> Option<Duration> {
        self.latency.read().unwrap().get(name).copied()
    }

    pub fn set_latency(&self, name: &str, d: Duration) {
        self.latency.write().unwrap().insert(name.to_string(), d);
    }

    /// Total number of results an engine has returned since startup.
    pub fn result_count(&self, name: &str) -> u64 {
        *self.result_count.read().unwrap().get(name).unwrap_or(&0)
    }

    pub fn add_result_count(&self, name: &str, count: u64) {
        *self
            .result_count
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += count;
    }

    /// Total number of results dropped by the blacklist since startup.
    pub fn dropped_count(&self, name: &str) -> u64 {
        *self.dropped_count.read().unwrap().get(name).unwrap_or(&0)
    }

    pub fn add_dropped_count(&self, name: &str, count: u64) {
        *self
            .dropped_count
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += count;
    }

    /// Total number of errors an engine has returned since startup.
    pub fn error_count(&self, name: &str) -> u64 {
        *self.error_count.read().unwrap().get(name).unwrap_or(&0)
    }

    pub fn inc_error_count(&self, name: &str) {
        *self
            .error_count
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    /// Record the wall time of one search request.
    pub fn record_request_time(&self, name: &str, d: Duration) {
        *self
            .request_total_time
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert(Duration::ZERO) += d;
        *self
            .request_count
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    /// Average time a search request takes for an engine, truncated to
    /// milliseconds.
    pub fn avg_request_time(&self, name: &str) -> Duration {
        let count = *self.request_count.read().unwrap().get(name).unwrap_or(&0);
        if count == 0 {
            return Duration::ZERO;
        }

        let total = self
            .request_total_time
            .read()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(Duration::ZERO);

        truncate_to_millis(total / count as u32)
    }

    /// Collect a snapshot of every counter for the given engines.
    pub fn snapshot(&self, names: &[String]) -> Vec<(String, EngineStats)> {
        names
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    EngineStats {
                        latency_ms: self
                            .latency(name)
                            .unwrap_or(Duration::ZERO)
                            .as_millis() as u64,
                        results: self.result_count(name),
                        dropped: self.dropped_count(name),
                        errors: self.error_count(name),
                        avg_request_time_ms: self.avg_request_time(name).as_millis() as u64,
                    },
                )
            })
            .collect()
    }
}

fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

/// Ping loop: probes every engine once at startup and then every
/// `interval`. Cancelling the token ends the loop; probes already in
/// flight run to completion on their own tasks.
pub async fn pinger(
    engines: Vec<(String, Arc<dyn Engine>)>,
    stats: Arc<StatsTable>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick is immediate; the ping below already covers it.
    ticker.tick().await;

    loop {
        for (name, engine) in &engines {
            let name = name.clone();
            let engine = engine.clone();
            let stats = stats.clone();

            tokio::spawn(async move {
                let then = Instant::now();
                match engine.ping().await {
                    Ok(()) => {
                        let dur = truncate_to_millis(then.elapsed());
                        info!("ping for {name} took {dur:?}");
                        stats.set_latency(&name, dur);
                    }
                    Err(e) => {
                        warn!("pinging {name} failed: {e}");
                        stats.set_latency(&name, Duration::ZERO);
                    }
                }
            });
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::EngineError;
    use crate::results::SearchResult;
    use async_trait::async_trait;

    #[test]
    fn counters_accumulate() {
        let stats = StatsTable::new();

        assert_eq!(stats.result_count("ddg"), 0);
        stats.add_result_count("ddg", 10);
        stats.add_result_count("ddg", 5);
        assert_eq!(stats.result_count("ddg"), 15);

        stats.add_dropped_count("ddg", 2);
        assert_eq!(stats.dropped_count("ddg"), 2);

        stats.inc_error_count("ddg");
        stats.inc_error_count("ddg");
        assert_eq!(stats.error_count("ddg"), 2);

        // Other engines are unaffected.
        assert_eq!(stats.result_count("google"), 0);
    }

    #[test]
    fn average_request_time_truncates_to_millis() {
        let stats = StatsTable::new();
        assert_eq!(stats.avg_request_time("ddg"), Duration::ZERO);

        stats.record_request_time("ddg", Duration::from_micros(1_500_700));
        stats.record_request_time("ddg", Duration::from_micros(2_500_700));
        assert_eq!(stats.avg_request_time("ddg"), Duration::from_millis(2000));
    }

    #[test]
    fn snapshot_covers_all_counters() {
        let stats = StatsTable::new();
        stats.set_latency("wiby", Duration::from_millis(42));
        stats.add_result_count("wiby", 7);

        let snap = stats.snapshot(&["wiby".to_string(), "ddg".to_string()]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].0, "wiby");
        assert_eq!(snap[0].1.latency_ms, 42);
        assert_eq!(snap[0].1.results, 7);
        assert_eq!(snap[1].1.latency_ms, 0);
    }

    struct SlowPing;

    #[async_trait]
    impl Engine for SlowPing {
        async fn search(&self, _: &str, _: u32) -> Result<Vec<SearchResult>, EngineError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), EngineError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        }
    }

    struct FailingPing;

    #[async_trait]
    impl Engine for FailingPing {
        async fn search(&self, _: &str, _: u32) -> Result<Vec<SearchResult>, EngineError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), EngineError> {
            Err(EngineError::Parse("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn pinger_records_latency_and_stops_on_cancel() {
        let stats = Arc::new(StatsTable::new());
        let engines: Vec<(String, Arc<dyn Engine>)> = vec![
            ("ok".to_string(), Arc::new(SlowPing)),
            ("bad".to_string(), Arc::new(FailingPing)),
        ];

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pinger(
            engines,
            stats.clone(),
            Duration::from_secs(3600),
            cancel.clone(),
        ));

        // Wait for the initial probe round to land.
        for _ in 0..100 {
            if stats.latency("ok").is_some() && stats.latency("bad").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(stats.latency("ok").unwrap() >= Duration::from_millis(1));
        assert_eq!(stats.latency("bad").unwrap(), Duration::ZERO);

        cancel.cancel();
        handle.await.unwrap();
    }
}
