//! Fixed-window request rate limiter.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

/// Admits at most `budget` requests per `window`.
///
/// This is a fixed window, not a token bucket: a caller admitted at the end of
/// one window and another at the start of the next may together see up to
/// twice the budget in a short span.
#[derive(Debug)]
pub struct RateLimiter {
    budget: u32,
    window: Duration,
    state: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(budget: u32, window: Duration) -> Self {
        RateLimiter {
            budget: budget.max(1),
            window,
            state: Mutex::new(RateWindow {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a request may be issued.
    ///
    /// The window lock is held across the wait, so callers queue in FIFO order
    /// and no budget slot is handed out twice.
    pub async fn admit(&self) {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count < self.budget {
            state.count += 1;
            return;
        }

        let wait = self
            .window
            .saturating_sub(now.duration_since(state.window_start));
        tracing::debug!(
            wait_ms = wait.as_millis() as u64,
            budget = self.budget,
            "rate budget exhausted, waiting for next window"
        );
        tokio::time::sleep(wait).await;

        state.window_start = Instant::now();
        state.count = 1;
    }
}
