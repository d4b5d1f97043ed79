use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::clock::{Clock, SystemClock, unix_seconds};

/// Number of minute buckets covered by [`Accumulator::sum`], the current one included.
pub const WINDOW_BUCKETS: i64 = 60;

/// Running totals for one minute, keyed by metric name.
pub type Bucket = HashMap<String, i64>;

/// In-memory per-minute totals keyed by bucket index, then by metric key.
///
/// All reads and writes go through one lock. Nearly every write lands in the
/// current minute, so finer locking would contend on the same bucket anyway.
///
/// Buckets are never removed unless [`Accumulator::evict_expired`] is called;
/// without a sweeper the map grows by one entry per minute that saw a write.
pub struct Accumulator {
    clock: Arc<dyn Clock>,
    minutes: Mutex<HashMap<i64, Bucket>>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Accumulator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            minutes: Mutex::new(HashMap::new()),
        }
    }

    /// Add `delta` to `key` in the current minute and return the minute's new total.
    ///
    /// Totals wrap on overflow.
    pub fn record(&self, key: &str, delta: i64) -> i64 {
        let mut guard = self.lock();
        let bucket = bucket_index(self.clock.now());
        let total = guard
            .entry(bucket)
            .or_default()
            .entry(key.to_string())
            .or_insert(0);
        *total = total.wrapping_add(delta);
        *total
    }

    /// Sum `key` over the trailing [`WINDOW_BUCKETS`] minutes. Unknown keys sum to 0.
    pub fn sum(&self, key: &str) -> i64 {
        let guard = self.lock();
        let now_bucket = bucket_index(self.clock.now());
        (0..WINDOW_BUCKETS)
            .filter_map(|offset| guard.get(&(now_bucket - offset)))
            .filter_map(|bucket| bucket.get(key))
            .fold(0i64, |acc, v| acc.wrapping_add(*v))
    }

    /// Drop buckets that have fallen out of the window. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let mut guard = self.lock();
        let oldest_live = bucket_index(self.clock.now()) - (WINDOW_BUCKETS - 1);
        let before = guard.len();
        guard.retain(|bucket, _| *bucket >= oldest_live);
        before - guard.len()
    }

    /// Number of minute buckets currently held.
    pub fn bucket_count(&self) -> usize {
        self.lock().len()
    }

    // Every critical section is a single map update, so a panicking holder
    // cannot leave a half-applied write behind.
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Bucket>> {
        self.minutes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Minute bucket for an instant: `floor(unix_seconds / 60)`.
pub fn bucket_index(at: SystemTime) -> i64 {
    unix_seconds(at).div_euclid(60)
}
