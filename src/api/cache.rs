use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How long a cached response stays valid.
const CACHE_TTL_SECS: u64 = 30;

/// A single cached HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// Full request URL including sorted query parameters
    key: String,
    /// Unix timestamp of the fetch that produced this entry
    fetched_at: u64,
    /// Raw response body
    body: String,
}

/// Read-through cache for CircleCI API responses.
///
/// Keyed by full request URL (query parameters included, sorted), with a
/// fixed 30 second expiration window. Entries are stored one file per
/// response in platform-specific cache directories:
/// - Linux: `~/.cache/circlog/{key-hash}.json`
/// - macOS: `~/Library/Caches/circlog/{key-hash}.json`
///
/// Entries survive process restarts; expired entries are removed on the
/// next lookup that touches them. Concurrent processes sharing the same
/// cache directory are not coordinated.
pub struct HttpCache {
    cache_dir: PathBuf,
    enabled: bool,
}

impl HttpCache {
    /// Creates a cache rooted at the platform cache directory.
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether caching is enabled; a disabled cache never
    ///   reads or writes
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be determined or
    /// created.
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            debug!("Response cache disabled");
            return Ok(Self::disabled());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| crate::error::CirclogError::Config("No cache directory found".into()))?
            .join("circlog");

        fs::create_dir_all(&cache_dir)?;

        info!("Response cache enabled at: {}", cache_dir.display());

        Ok(Self {
            cache_dir,
            enabled: true,
        })
    }

    /// A cache that never reads or writes.
    pub fn disabled() -> Self {
        Self {
            cache_dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Creates a cache rooted at an explicit directory.
    ///
    /// The directory must already exist. Mainly useful for tests and for
    /// callers that manage their own cache location.
    pub fn at_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            enabled: true,
        }
    }

    /// Attempts to retrieve a cached response body for a request key.
    ///
    /// Returns `None` if caching is disabled, no entry exists, or the
    /// entry is older than the TTL. Expired entries are deleted.
    pub fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(_) => {
                warn!("Dropping unreadable cache entry: {}", path.display());
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if unix_now().saturating_sub(entry.fetched_at) >= CACHE_TTL_SECS {
            debug!("Cache entry expired for {key}");
            let _ = fs::remove_file(&path);
            return None;
        }

        debug!("Cache hit for {key}");
        Some(entry.body)
    }

    /// Stores a response body under a request key.
    ///
    /// A write failure is logged and otherwise ignored; the response has
    /// already been fetched and the cache is an optimization only.
    pub fn put(&self, key: &str, body: &str) {
        if !self.enabled {
            return;
        }

        let entry = CacheEntry {
            key: key.to_string(),
            fetched_at: unix_now(),
            body: body.to_string(),
        };

        let path = self.entry_path(key);
        match serde_json::to_string(&entry) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    warn!("Failed to write cache entry {}: {e}", path.display());
                }
            }
            Err(e) => warn!("Failed to serialize cache entry: {e}"),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{:016x}.json", fnv1a(key)))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// FNV-1a; filenames must be stable across processes, which rules out the
// randomly seeded std hasher.
fn fnv1a(key: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
