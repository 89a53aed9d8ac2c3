use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing subscription activity.
#[derive(Default)]
pub struct SubscriptionMetrics {
    attempts: AtomicU64,
    subscribed: AtomicU64,
    failed: AtomicU64,
}

impl SubscriptionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription attempt that MailChimp accepted.
    pub fn record_success(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.subscribed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscription attempt that was folded into a soft failure.
    pub fn record_failure(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            subscribed: self.subscribed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of subscription counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Subscription attempts handled since startup.
    pub attempts: u64,
    /// Attempts MailChimp accepted.
    pub subscribed: u64,
    /// Attempts folded into a soft failure.
    pub failed: u64,
}
