//! Optional eviction of minute buckets that can no longer contribute to a sum.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pingora::services::background::BackgroundService;

use crate::accumulator::Accumulator;

/// Background service that periodically drops expired buckets.
pub struct ExpirySweeper {
    accumulator: Arc<Accumulator>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(accumulator: Arc<Accumulator>, interval: Duration) -> Self {
        Self {
            accumulator,
            interval,
        }
    }

    /// Run a single eviction pass.
    pub fn sweep(&self) -> usize {
        let removed = self.accumulator.evict_expired();
        if removed > 0 {
            log::debug!(
                "Evicted {} expired buckets, {} remain",
                removed,
                self.accumulator.bucket_count()
            );
        }
        removed
    }
}

#[async_trait]
impl BackgroundService for ExpirySweeper {
    async fn start(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.sweep();
                }
            }
        }
    }
}
