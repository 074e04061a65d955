use crate::domain::ports::Clock;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Wall-clock time backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct VirtualTime {
    now: DateTime<Utc>,
    elapsed: Duration,
}

/// Simulated time: every sleep returns at once and moves `now` forward.
///
/// Runs of the payment protocol against this clock are deterministic and take
/// no real time.
#[derive(Debug)]
pub struct VirtualClock {
    time: Mutex<VirtualTime>,
}

impl VirtualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(VirtualTime {
                now,
                elapsed: Duration::ZERO,
            }),
        }
    }

    /// Total time slept on this clock.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VirtualTime> {
        self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[async_trait]
impl Clock for VirtualClock {
    async fn sleep(&self, duration: Duration) {
        {
            let mut time = self.lock();
            // Saturates at the end of representable time instead of overflowing.
            let now = TimeDelta::from_std(duration)
                .ok()
                .and_then(|delta| time.now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            time.now = now;
            time.elapsed = time.elapsed.saturating_add(duration);
        }
        tokio::task::yield_now().await;
    }

    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }
}
