//! Response Cache (C6): content-addressed exact-match cache with TTL.
//!
//! Backed by an embedded `sled` database, keyed on the tuple-keyed,
//! TTL-aware shape the gateway requires instead of a raw payload hash.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::CachedEntry;

#[derive(Serialize)]
struct CacheKeyTuple<'a> {
    band: &'a str,
    model: &'a str,
    prompt: &'a str,
    provider: &'a str,
}

/// Builds the exact-match cache key: `exact:` + SHA-256 of the canonical
/// JSON of `{band, model, prompt, provider}` (metadata excluded, keys
/// sorted, no inserted whitespace).
pub fn cache_key(prompt: &str, provider: &str, model: &str, band: &str) -> String {
    let tuple = CacheKeyTuple {
        band,
        model,
        prompt,
        provider,
    };
    // serde_json's map serialization for a struct follows field declaration
    // order; declaring fields alphabetically gives us "sorted keys" for
    // free without hand-rolling a BTreeMap.
    let canonical = serde_json::to_string(&tuple).expect("cache key tuple always serializes");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("exact:{:x}", hasher.finalize())
}

pub struct ResponseCache {
    db: Option<sled::Db>,
    prefix: String,
}

impl ResponseCache {
    /// Opens the cache at `path`, or returns a disabled cache if `path` is
    /// `None` — there is deliberately no in-process fallback so a process
    /// without a shared store never gives a false impression of caching.
    pub fn open(path: Option<&str>, prefix: &str) -> anyhow::Result<ResponseCache> {
        let db = match path {
            Some(p) => Some(sled::open(p)?),
            None => None,
        };
        Ok(ResponseCache {
            db,
            prefix: prefix.to_string(),
        })
    }

    pub fn disabled() -> ResponseCache {
        ResponseCache {
            db: None,
            prefix: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.db.is_some()
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub fn get(&self, key: &str) -> Option<CachedEntry> {
        let db = self.db.as_ref()?;
        let raw = db.get(self.namespaced(key)).ok().flatten()?;
        let entry: CachedEntry = serde_json::from_slice(&raw).ok()?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if now.saturating_sub(entry.cached_at_epoch_secs) > entry.ttl_secs {
            return None;
        }
        Some(entry)
    }

    pub fn set(&self, key: &str, entry: &CachedEntry) -> anyhow::Result<()> {
        let Some(db) = self.db.as_ref() else {
            return Ok(());
        };
        let data = serde_json::to_vec(entry)?;
        db.insert(self.namespaced(key), data)?;
        Ok(())
    }

    /// Readiness probe for `GET /v1/ready`.
    pub fn ping(&self) -> bool {
        match &self.db {
            Some(db) => db.insert("__ping__", &[][..]).is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_excludes_metadata_and_is_stable() {
        let a = cache_key("hello", "openai", "gpt-4o-mini", "low");
        let b = cache_key("hello", "openai", "gpt-4o-mini", "low");
        assert_eq!(a, b);
        assert!(a.starts_with("exact:"));
    }

    #[test]
    fn cache_key_differs_by_band() {
        let low = cache_key("hello", "openai", "gpt-4o-mini", "low");
        let high = cache_key("hello", "openai", "gpt-4o-mini", "high");
        assert_ne!(low, high);
    }

    #[test]
    fn disabled_cache_never_hits() {
        let cache = ResponseCache::disabled();
        assert!(!cache.is_enabled());
        assert!(cache.get("exact:anything").is_none());
    }

    #[test]
    fn round_trips_through_sled() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(Some(dir.path().to_str().unwrap()), "test").unwrap();
        let key = cache_key("hi", "stub", "stub-echo-1", "low");
        let entry = CachedEntry {
            response_json: serde_json::json!({"text": "Hi"}),
            cached_at_epoch_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
            ttl_secs: 60,
        };
        cache.set(&key, &entry).unwrap();
        let fetched = cache.get(&key).expect("cache hit");
        assert_eq!(fetched.response_json, entry.response_json);
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::open(Some(dir.path().to_str().unwrap()), "test").unwrap();
        let key = cache_key("hi", "stub", "stub-echo-1", "low");
        let entry = CachedEntry {
            response_json: serde_json::json!({"text": "Hi"}),
            cached_at_epoch_secs: 0,
            ttl_secs: 1,
        };
        cache.set(&key, &entry).unwrap();
        assert!(cache.get(&key).is_none());
    }
}
