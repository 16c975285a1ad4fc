use crate::cache::UrlCache;
use crate::canon::canonicalize;
use crate::client::{ThreatClient, Verdict};
use crate::expander::RedirectExpander;
use crate::stats::StatsCollector;
use crate::supervisor::ServerSupervisor;
use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

const SCORE_CONCURRENCY: usize = 4;

/// Resolution is a two-phase machine: one initial lookup, then at most one
/// expand-and-retry. A third lookup cannot happen.
enum Phase {
    Initial,
    Expanded,
}

/// Orchestrates canonicalization, threat lookups and redirect expansion.
///
/// Shared by concurrent resolutions: all methods take `&self`, the cache
/// serializes its own state. Dropping the resolver tears down the
/// supervised server process when one is attached.
pub struct UrlThreatResolver {
    client: ThreatClient,
    expander: RedirectExpander,
    cache: Arc<UrlCache>,
    stats: Arc<StatsCollector>,
    expand_urls: bool,
    supervisor: Option<ServerSupervisor>,
}

impl UrlThreatResolver {
    pub fn new(
        client: ThreatClient,
        expander: RedirectExpander,
        cache: Arc<UrlCache>,
        stats: Arc<StatsCollector>,
        expand_urls: bool,
    ) -> Self {
        Self {
            client,
            expander,
            cache,
            stats,
            expand_urls,
            supervisor: None,
        }
    }

    /// Attaches the supervisor so the server process lives exactly as long
    /// as this resolver.
    pub fn with_supervisor(mut self, supervisor: ServerSupervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Returns whether `raw` is known malicious.
    ///
    /// A threat match on the initial lookup is final; no expansion happens.
    /// A clean verdict triggers (when enabled) a single redirect expansion
    /// followed by one more lookup on the terminal URL.
    pub async fn resolve(&self, raw: &str) -> Result<bool> {
        self.stats.inc_resolutions();

        let mut url = canonicalize(raw);
        let mut phase = Phase::Initial;

        loop {
            match self.client.lookup(url.as_str()).await? {
                Verdict::Threat(threat_type) => {
                    info!("Threat match for {}: {}", url, threat_type);
                    self.stats.inc_threats_found();
                    return Ok(true);
                }
                Verdict::NoThreat => {}
            }

            match phase {
                Phase::Initial if self.expand_urls => {
                    url = self.expander.expand(url).await;
                    phase = Phase::Expanded;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Number of URLs in the batch judged malicious. URLs whose resolution
    /// fails are skipped so one bad lookup degrades a single contribution,
    /// not the whole batch.
    pub async fn score<S: AsRef<str>>(&self, urls: &[S]) -> u64 {
        stream::iter(urls)
            .map(|url| async move {
                match self.resolve(url.as_ref()).await {
                    Ok(true) => 1u64,
                    Ok(false) => 0,
                    Err(e) => {
                        warn!("Skipping {}: {}", url.as_ref(), e);
                        self.stats.inc_failed_lookups();
                        0
                    }
                }
            })
            .buffer_unordered(SCORE_CONCURRENCY)
            .fold(0u64, |acc, hit| async move { acc + hit })
            .await
    }

    /// Flushes the cache and stops the supervised server.
    pub async fn shutdown(self) -> Result<()> {
        self.cache.flush()?;
        if let Some(supervisor) = self.supervisor {
            supervisor
                .stop()
                .await
                .context("Failed to stop threat-matching server")?;
        }
        Ok(())
    }
}
