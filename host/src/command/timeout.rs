//! Timeout tracking for pending queries

use super::requester::Requester;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Monitors query timeouts and triggers retries
pub struct TimeoutTracker {
    requester: Arc<Requester>,
    check_interval: Duration,
}

impl TimeoutTracker {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self {
            requester,
            check_interval: Duration::from_millis(250),
        }
    }

    /// Retry or give up every overdue query once
    pub async fn check_once(&self) {
        for request in self.requester.timed_out().await {
            if request.can_retry() {
                info!(
                    "{} (seq={}) timed out, retrying ({}/{})",
                    request.command,
                    request.sequence,
                    request.retries + 1,
                    request.max_retries
                );
            }
            if let Err(e) = self.requester.retry(request.sequence).await {
                warn!("Giving up: {}", e);
            }
        }
    }

    /// Start the timeout monitoring loop
    pub async fn run(&self) {
        let mut ticker = interval(self.check_interval);

        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}
