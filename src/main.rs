use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use url_vet::cache::UrlCache;
use url_vet::client::ThreatClient;
use url_vet::config::Config;
use url_vet::expander::RedirectExpander;
use url_vet::init::setup_logging;
use url_vet::resolver::UrlThreatResolver;
use url_vet::stats::StatsCollector;
use url_vet::supervisor::ServerSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path =
        std::env::var("URL_VET_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting url-vet...");

    if !std::path::Path::new(&config_path).exists() {
        info!("Config file not found, using defaults.");
    }

    // 3. Init Stats
    let stats = StatsCollector::new(if config.stats.enable {
        config.stats.log_interval_secs
    } else {
        0
    });

    // 4. Open URL Cache
    let cache = Arc::new(UrlCache::open(&config.cache));

    // 5. Launch Threat-Matching Server
    let supervisor = ServerSupervisor::start(&config.server).await?;

    // 6. Build Resolver
    let client = ThreatClient::new(
        supervisor.address(),
        Duration::from_millis(config.server.lookup_timeout_ms),
    );
    let expander = RedirectExpander::new(&config.expansion, cache.clone(), stats.clone())?;
    let resolver = UrlThreatResolver::new(
        client,
        expander,
        cache.clone(),
        stats.clone(),
        config.expansion.enable,
    )
    .with_supervisor(supervisor);

    // 7. Spawn Periodic Cache Flush
    if config.cache.flush_interval_secs > 0 {
        let cache_for_flush = cache.clone();
        let flush_interval = Duration::from_secs(config.cache.flush_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = cache_for_flush.flush() {
                    warn!("Periodic cache flush failed: {}", e);
                }
            }
        });
    }

    // 8. Collect URLs (arguments, or stdin when none are given)
    let mut urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                urls.push(line.to_string());
            }
        }
    }

    // 9. Resolve
    let mut malicious = 0u64;
    for url in &urls {
        match resolver.resolve(url).await {
            Ok(true) => {
                malicious += 1;
                println!("MALICIOUS {}", url);
            }
            Ok(false) => println!("ok {}", url),
            Err(e) => warn!("Skipping {}: {}", url, e),
        }
    }

    info!("{}/{} URLs flagged malicious", malicious, urls.len());
    stats.dump();

    // 10. Teardown: flush cache, stop server
    resolver.shutdown().await?;

    Ok(())
}
