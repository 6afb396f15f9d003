//! Expiry clock — remaining time as a pure function of absolute timestamps.
//!
//! Remaining time is always recomputed from `expires_at` and `now`, never
//! decremented in memory, so clock drift, sleep/resume, or a slow tick can
//! never desynchronize the displayed countdown from the authoritative
//! deadline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

/// Default presentation-urgency threshold.
pub const EXPIRING_SOON: Duration = Duration::from_secs(12 * 3600);

/// Remaining time until a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    /// Whole milliseconds remaining; zero once the deadline has passed.
    pub ms: i64,
    /// Whole hours remaining.
    pub hours: i64,
    /// Minutes remaining within the current hour (0–59).
    pub minutes: i64,
    /// The deadline has passed.
    pub expired: bool,
    /// Below the urgency threshold. Affects presentation only, never the
    /// legality of actions.
    pub expiring_soon: bool,
}

impl TimeRemaining {
    /// Compute remaining time with the default urgency threshold.
    pub fn until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::until_with_threshold(expires_at, now, EXPIRING_SOON)
    }

    /// Compute remaining time against an explicit urgency threshold.
    pub fn until_with_threshold(
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
        expiring_soon: Duration,
    ) -> Self {
        let raw_ms = expires_at.signed_duration_since(now).num_milliseconds();
        let expired = raw_ms <= 0;
        let ms = raw_ms.max(0);
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        Self {
            ms,
            hours,
            minutes,
            expired,
            expiring_soon: !expired && ms < expiring_soon.as_millis() as i64,
        }
    }
}

/// Periodic recomputation of [`TimeRemaining`] for one booking request.
///
/// Publishes over a watch channel at a fixed resolution and stops itself
/// once the deadline passes. The owning session aborts the task on terminal
/// transitions; dropping the ticker aborts it too, so a torn-down view can
/// never leak periodic work.
#[derive(Debug)]
pub struct ExpiryTicker {
    handle: JoinHandle<()>,
    rx: watch::Receiver<TimeRemaining>,
}

impl ExpiryTicker {
    /// Spawn the ticker for a request deadline.
    pub fn spawn(
        request_id: Uuid,
        expires_at: DateTime<Utc>,
        tick_interval: Duration,
        expiring_soon: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(TimeRemaining::until_with_threshold(
            expires_at,
            Utc::now(),
            expiring_soon,
        ));

        let handle = tokio::spawn(async move {
            loop {
                let remaining =
                    TimeRemaining::until_with_threshold(expires_at, Utc::now(), expiring_soon);
                let expired = remaining.expired;
                if tx.send(remaining).is_err() {
                    // No receivers left; the consuming view is gone.
                    break;
                }
                if expired {
                    debug!(%request_id, "Expiry ticker reached zero, stopping");
                    break;
                }
                tokio::time::sleep(tick_interval).await;
            }
        });

        Self { handle, rx }
    }

    /// Latest published remaining time.
    pub fn remaining(&self) -> TimeRemaining {
        *self.rx.borrow()
    }

    /// Subscribe to countdown updates.
    pub fn subscribe(&self) -> watch::Receiver<TimeRemaining> {
        self.rx.clone()
    }

    /// Countdown updates as a stream (for SSE/WS style consumers).
    pub fn stream(&self) -> WatchStream<TimeRemaining> {
        WatchStream::new(self.rx.clone())
    }

    /// Stop the ticker. Idempotent.
    pub fn stop(&self) {
        if !self.handle.is_finished() {
            self.handle.abort();
        }
    }
}

impl Drop for ExpiryTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
