// Control plane: admission control for ledger node calls
//
// Bounds the number of in-flight backend round trips and the rate at which
// new ones start, using a 1s sliding window.
//
// Numan Thabit 2025 Nov

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

const DEFAULT_RATE_PER_SEC: u32 = 200;

#[derive(Clone)]
pub struct AdmissionControl {
    max_inflight: Arc<Semaphore>,
    // allow up to rate_per_sec starts within a 1s sliding window
    inner: Arc<Mutex<RateLimiter>>,
}

struct RateLimiter {
    rate_per_sec: u32,
    timestamps: VecDeque<Instant>,
    window: Duration,
}

impl RateLimiter {
    /// Record a start if the window has room.
    fn try_admit(&mut self, now: Instant) -> bool {
        while let Some(front) = self.timestamps.front() {
            if now.duration_since(*front) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        if (self.timestamps.len() as u32) < self.rate_per_sec {
            self.timestamps.push_back(now);
            true
        } else {
            false
        }
    }
}

impl AdmissionControl {
    pub fn new(max_inflight: usize, rate_per_sec: Option<u32>) -> Self {
        let rate_per_sec = rate_per_sec.unwrap_or(DEFAULT_RATE_PER_SEC).max(1);
        let rl = RateLimiter {
            rate_per_sec,
            timestamps: VecDeque::with_capacity(rate_per_sec as usize),
            window: Duration::from_secs(1),
        };
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            inner: Arc::new(Mutex::new(rl)),
        }
    }

    /// Acquire an admission permit respecting max inflight and rate limit.
    pub async fn acquire(&self) -> AdmissionPermit {
        let mut throttled = false;
        loop {
            if self.inner.lock().await.try_admit(Instant::now()) {
                break;
            }
            if !throttled {
                debug!("ledger call rate limited");
                throttled = true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let permit = self
            .max_inflight
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore not closed");
        AdmissionPermit { _permit: permit }
    }

    pub fn available(&self) -> usize {
        self.max_inflight.available_permits()
    }
}

pub struct AdmissionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
