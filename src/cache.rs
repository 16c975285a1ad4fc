use crate::canon::CanonicalUrl;
use crate::config::CacheConfig;
use anyhow::{ensure, Context, Result};
use bloomfilter::Bloom;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{info, warn};

const MAGIC: &[u8; 4] = b"UVBF";
const VERSION: u8 = 1;

/// Persistent membership set of URLs already probed and found terminal.
///
/// Backed by a fixed-capacity bloom filter: false positives are bounded by
/// the configured error rate, false negatives cannot happen for inserted
/// keys. Entries are never evicted. Safe for concurrent `contains`/`insert`;
/// an insert racing a lookup costs at most one redundant probe.
pub struct UrlCache {
    path: PathBuf,
    filter: RwLock<Bloom<String>>,
}

impl UrlCache {
    /// Reloads the filter persisted at `config.path` if present, otherwise
    /// builds a fresh one. An unreadable or corrupt file degrades to a
    /// fresh filter rather than an error.
    pub fn open(config: &CacheConfig) -> Self {
        let path = PathBuf::from(&config.path);

        let filter = match fs::read(&path) {
            Ok(bytes) => match decode(&bytes) {
                Ok(filter) => {
                    info!("Loaded URL cache from {}", path.display());
                    filter
                }
                Err(e) => {
                    warn!("Discarding unreadable URL cache {}: {}", path.display(), e);
                    fresh_filter(config)
                }
            },
            Err(_) => {
                info!(
                    "No URL cache at {}; starting fresh (capacity {}, error rate {})",
                    path.display(),
                    config.capacity,
                    config.error_rate
                );
                fresh_filter(config)
            }
        };

        Self {
            path,
            filter: RwLock::new(filter),
        }
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.filter.read().unwrap().check(&url.as_str().to_owned())
    }

    pub fn insert(&self, url: &CanonicalUrl) {
        self.filter.write().unwrap().set(&url.as_str().to_owned());
    }

    /// Writes the filter back to disk. Called at checkpoints (periodic
    /// flush task, shutdown), not per insert.
    pub fn flush(&self) -> Result<()> {
        let bytes = encode(&self.filter.read().unwrap());

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
            }
        }

        fs::write(&self.path, &bytes)
            .with_context(|| format!("Failed to write URL cache {}", self.path.display()))?;
        info!("Flushed URL cache to {}", self.path.display());
        Ok(())
    }
}

fn fresh_filter(config: &CacheConfig) -> Bloom<String> {
    Bloom::new_for_fp_rate(config.capacity, config.error_rate)
}

fn encode(filter: &Bloom<String>) -> Vec<u8> {
    let bitmap = filter.bitmap();
    let mut out = Vec::with_capacity(bitmap.len() + 64);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&filter.number_of_bits().to_le_bytes());
    out.extend_from_slice(&filter.number_of_hash_functions().to_le_bytes());
    for (k0, k1) in filter.sip_keys() {
        out.extend_from_slice(&k0.to_le_bytes());
        out.extend_from_slice(&k1.to_le_bytes());
    }
    out.extend_from_slice(&(bitmap.len() as u64).to_le_bytes());
    out.extend_from_slice(&bitmap);
    out
}

fn decode(bytes: &[u8]) -> Result<Bloom<String>> {
    const HEADER_LEN: usize = 4 + 1 + 8 + 4 + 32 + 8;
    ensure!(bytes.len() >= HEADER_LEN, "cache file truncated");
    ensure!(&bytes[..4] == MAGIC, "cache file has wrong magic");
    ensure!(
        bytes[4] == VERSION,
        "unsupported cache format version {}",
        bytes[4]
    );

    let mut off = 5;
    let bitmap_bits = u64::from_le_bytes(bytes[off..off + 8].try_into()?);
    off += 8;
    let k_num = u32::from_le_bytes(bytes[off..off + 4].try_into()?);
    off += 4;

    let mut sip_keys = [(0u64, 0u64); 2];
    for key in sip_keys.iter_mut() {
        key.0 = u64::from_le_bytes(bytes[off..off + 8].try_into()?);
        off += 8;
        key.1 = u64::from_le_bytes(bytes[off..off + 8].try_into()?);
        off += 8;
    }

    let bitmap_len = u64::from_le_bytes(bytes[off..off + 8].try_into()?) as usize;
    off += 8;
    ensure!(
        bytes.len() == off + bitmap_len,
        "cache bitmap length mismatch"
    );

    Ok(Bloom::from_existing(
        &bytes[off..],
        bitmap_bits,
        k_num,
        sip_keys,
    ))
}
