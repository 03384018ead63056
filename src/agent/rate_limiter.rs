//! Per-task call-rate limiter
//!
//! Sliding window over the instants of issued calls. One limiter belongs to
//! one task execution and is dropped with it.

use crate::error::AnalysisError;
use crate::Result;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    issued: VecDeque<Instant>,
    held_until: Option<Instant>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        let max_calls = max_calls.max(1) as usize;
        Self {
            max_calls,
            window,
            issued: VecDeque::with_capacity(max_calls),
            held_until: None,
        }
    }

    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, RATE_WINDOW)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Earliest instant at which another call may be issued
    fn next_slot(&mut self, now: Instant) -> Option<Instant> {
        while let Some(&oldest) = self.issued.front() {
            if oldest + self.window <= now {
                self.issued.pop_front();
            } else {
                break;
            }
        }

        let window_slot = if self.issued.len() >= self.max_calls {
            self.issued.front().map(|&oldest| oldest + self.window)
        } else {
            None
        };

        let held = self.held_until.filter(|&until| until > now);

        match (window_slot, held) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (slot, None) => slot,
            (None, hold) => hold,
        }
    }

    /// Block the limiter until `until`, e.g. after a provider 429
    pub fn hold_until(&mut self, until: Instant) {
        self.held_until = Some(match self.held_until {
            Some(current) => current.max(until),
            None => until,
        });
    }

    /// Wait for a free slot and claim it. Returns how long it waited.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Result<Duration> {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            let now = Instant::now();
            match self.next_slot(now) {
                None => {
                    self.issued.push_back(now);
                    return Ok(now - started);
                }
                Some(slot) => {
                    debug!(
                        wait_ms = (slot - now).as_millis() as u64,
                        "Waiting for rate-limit slot"
                    );
                    tokio::select! {
                        _ = sleep_until(slot) => {}
                        _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_within_cap_do_not_wait() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(3);

        for _ in 0..3 {
            assert_eq!(limiter.acquire(&cancel).await.unwrap(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_the_window_to_roll() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(1);
        let start = Instant::now();

        limiter.acquire(&cancel).await.unwrap();
        let waited = limiter.acquire(&cancel).await.unwrap();

        assert_eq!(waited, RATE_WINDOW);
        assert!(Instant::now() - start >= RATE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_cap_in_any_window() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(2);
        let mut issued = Vec::new();

        for _ in 0..7 {
            limiter.acquire(&cancel).await.unwrap();
            issued.push(Instant::now());
            tokio::time::advance(Duration::from_secs(7)).await;
        }

        for pair in issued.windows(3) {
            assert!(pair[2] - pair[0] >= RATE_WINDOW);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_delays_next_call() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(10);
        let start = Instant::now();

        limiter.hold_until(start + Duration::from_secs(15));
        let waited = limiter.acquire(&cancel).await.unwrap();

        assert_eq!(waited, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(1);
        limiter.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_cap_is_treated_as_one() {
        let cancel = CancellationToken::new();
        let mut limiter = RateLimiter::per_minute(0);
        assert_eq!(limiter.acquire(&cancel).await.unwrap(), Duration::ZERO);
        assert_eq!(limiter.acquire(&cancel).await.unwrap(), RATE_WINDOW);
    }
}
