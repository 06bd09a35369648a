//! Sliding-window rate limiter for the upstream provider.
//!
//! Admission timestamps are kept in a queue. A call is admitted once fewer
//! than `max_calls` timestamps fall inside the last 60 seconds.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Minute-windowed admission gate.
///
/// The queue lock is held for the whole of [`acquire`](Self::acquire),
/// including the wait, so callers are admitted strictly in arrival order.
pub struct MinuteRateLimiter {
    max_calls: usize,
    admitted: Mutex<VecDeque<Instant>>,
}

impl MinuteRateLimiter {
    /// Create a limiter admitting at most `max_calls` per minute (at least one).
    pub fn new(max_calls: u32) -> Self {
        let max_calls = max_calls.max(1) as usize;
        Self {
            max_calls,
            admitted: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Wait until a call may be made, then record it.
    pub async fn acquire(&self) {
        let mut admitted = self.admitted.lock().await;
        loop {
            let now = Instant::now();
            while let Some(front) = admitted.front() {
                if now.duration_since(*front) >= WINDOW {
                    admitted.pop_front();
                } else {
                    break;
                }
            }

            if admitted.len() < self.max_calls {
                break;
            }

            // Full window: the oldest entry decides when a slot opens.
            let Some(oldest) = admitted.front().copied() else {
                break;
            };
            let wake_at = oldest + WINDOW;
            debug!(
                "Rate limiter: window full ({} calls), waiting {:?}",
                admitted.len(),
                wake_at.saturating_duration_since(now)
            );
            tokio::time::sleep_until(wake_at).await;
        }
        admitted.push_back(Instant::now());
    }

    /// Number of calls admitted within the current window.
    pub async fn in_window(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        admitted
            .iter()
            .filter(|at| now.duration_since(**at) < WINDOW)
            .count()
    }
}
