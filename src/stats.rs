use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug, Default)]
pub struct StatsCollector {
    resolutions: AtomicU64,
    threats_found: AtomicU64,
    cache_hits: AtomicU64,
    redirect_hops: AtomicU64,
    failed_lookups: AtomicU64,
}

impl StatsCollector {
    /// A `log_interval_secs` of 0 disables the periodic dump task.
    pub fn new(log_interval_secs: u64) -> Arc<Self> {
        let stats = Arc::new(Self::default());

        if log_interval_secs > 0 {
            let stats_clone = stats.clone();
            tokio::spawn(async move {
                let mut interval = time::interval(Duration::from_secs(log_interval_secs));
                // The first tick completes immediately
                interval.tick().await;
                loop {
                    interval.tick().await;
                    stats_clone.dump();
                }
            });
        }

        stats
    }

    pub fn inc_resolutions(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_threats_found(&self) {
        self.threats_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_redirect_hops(&self) {
        self.redirect_hops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_lookups(&self) {
        self.failed_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn threats_found(&self) -> u64 {
        self.threats_found.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn redirect_hops(&self) -> u64 {
        self.redirect_hops.load(Ordering::Relaxed)
    }

    pub fn failed_lookups(&self) -> u64 {
        self.failed_lookups.load(Ordering::Relaxed)
    }

    pub fn dump(&self) {
        info!(
            "URL stats: resolutions={} threats={} cache_hits={} redirect_hops={} failed_lookups={}",
            self.resolutions(),
            self.threats_found(),
            self.cache_hits(),
            self.redirect_hops(),
            self.failed_lookups()
        );
    }
}
