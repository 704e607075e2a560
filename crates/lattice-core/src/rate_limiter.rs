//! Rate Limiter (C7): fixed-window counter per consumer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

struct Bucket {
    window_start: Instant,
    count: i64,
}

/// In-process fixed-window limiter, mutex-protected around read-modify-write
/// like the rest of this codebase's in-process shared maps. A
/// `limit <= 0` disables enforcement entirely.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    limit: i64,
    enabled: bool,
}

pub struct RateLimitOutcome {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new(enabled: bool, limit: i64) -> RateLimiter {
        RateLimiter {
            buckets: Mutex::new(HashMap::new()),
            limit,
            enabled: enabled && limit > 0,
        }
    }

    pub fn check_and_increment(&self, consumer_key: &str) -> RateLimitOutcome {
        if !self.enabled {
            return RateLimitOutcome {
                allowed: true,
                retry_after_secs: 0,
            };
        }

        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let bucket = buckets
            .entry(consumer_key.to_string())
            .or_insert_with(|| Bucket {
                window_start: now,
                count: 0,
            });

        if now.duration_since(bucket.window_start) >= WINDOW {
            bucket.window_start = now;
            bucket.count = 0;
        }

        if bucket.count >= self.limit {
            let elapsed = now.duration_since(bucket.window_start);
            let remaining = WINDOW.saturating_sub(elapsed);
            return RateLimitOutcome {
                allowed: false,
                retry_after_secs: remaining.as_secs().max(1),
            };
        }

        bucket.count += 1;
        RateLimitOutcome {
            allowed: true,
            retry_after_secs: 0,
        }
    }
}
