use crate::cache::UrlCache;
use crate::canon::{canonicalize, CanonicalUrl};
use crate::config::ExpansionConfig;
use crate::stats::StatsCollector;
use anyhow::{Context, Result};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Follows redirect chains to their terminal URL, one short-timeout probe
/// per hop with automatic redirect-following disabled.
pub struct RedirectExpander {
    http: Client,
    cache: Arc<UrlCache>,
    stats: Arc<StatsCollector>,
    max_hops: u32,
}

impl RedirectExpander {
    pub fn new(
        config: &ExpansionConfig,
        cache: Arc<UrlCache>,
        stats: Arc<StatsCollector>,
    ) -> Result<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_millis(config.probe_timeout_ms))
            .user_agent("UrlVet/1.0")
            .build()
            .context("Failed to build redirect probe client")?;

        Ok(Self {
            http,
            cache,
            stats,
            max_hops: config.max_hops,
        })
    }

    /// Resolves `url` to its terminal destination.
    ///
    /// URLs already recorded as terminal are returned as-is. A hop that
    /// times out or fails at the transport level is treated as terminal but
    /// left uncached so a later call may retry it. A hop that answers
    /// without redirecting is recorded as terminal. The hop budget bounds
    /// adversarial redirect loops.
    pub async fn expand(&self, url: CanonicalUrl) -> CanonicalUrl {
        let mut current = url;

        for _ in 0..self.max_hops {
            if self.cache.contains(&current) {
                self.stats.inc_cache_hits();
                return current;
            }

            let response = match self.http.get(current.as_str()).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Probe of {} failed ({}); treating as terminal", current, e);
                    return current;
                }
            };

            let status = response.status().as_u16();
            if (200..400).contains(&status) {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                {
                    match resolve_target(&current, location) {
                        Some(next) => {
                            debug!("following {} -> {}", current, next);
                            self.stats.inc_redirect_hops();
                            current = next;
                            continue;
                        }
                        None => {
                            debug!("Unparseable location {:?} at {}", location, current);
                        }
                    }
                }
            }

            self.cache.insert(&current);
            return current;
        }

        warn!("Redirect hop budget exhausted at {}", current);
        current
    }
}

/// Resolves a `Location` header value against the current URL, handling
/// root-relative targets. `None` means the target is unusable and the
/// current URL should be treated as terminal.
fn resolve_target(base: &CanonicalUrl, location: &str) -> Option<CanonicalUrl> {
    let joined = url::Url::parse(base.as_str()).ok()?.join(location).ok()?;
    Some(canonicalize(joined.as_str()))
}
