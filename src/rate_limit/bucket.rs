// Process-wide token buckets, one per platform.
//
// Ad platforms rate-limit by developer app, not by end tenant, so the bucket
// for a platform is shared across every tenant's calls to it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::domain::Platform;
use crate::errors::{AppError, Result};

/// Floor for the wait between acquire attempts
const MIN_WAIT: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_per_second: f64) -> Self {
        Self {
            capacity,
            // Buckets start full so a fresh process can burst
            tokens: capacity,
            refill_per_second,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available
    fn try_take(&mut self, now: Instant) -> std::result::Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_second))
        }
    }
}

/// Token-bucket rate limiter shared by all outbound adapter calls.
///
/// `acquire` waits up to the configured timeout for a token; callers that
/// cannot get one in time fail with `RateLimitExceeded` rather than queue
/// without bound.
pub struct RateLimiter {
    buckets: HashMap<Platform, Mutex<TokenBucket>>,
    acquire_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let buckets = Platform::ALL
            .into_iter()
            .map(|p| {
                (
                    p,
                    Mutex::new(TokenBucket::new(config.capacity, config.refill_per_second)),
                )
            })
            .collect();
        Self {
            buckets,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
        }
    }

    /// Block (bounded) until a token for the platform is available
    pub async fn acquire(&self, platform: Platform) -> Result<()> {
        let deadline = Instant::now() + self.acquire_timeout;
        loop {
            let wait = {
                let bucket = self
                    .buckets
                    .get(&platform)
                    .ok_or_else(|| AppError::Internal(format!("no bucket for {}", platform)))?;
                let mut bucket = bucket.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                match bucket.try_take(Instant::now()) {
                    Ok(()) => return Ok(()),
                    Err(wait) => wait,
                }
            };

            let now = Instant::now();
            if now + wait > deadline {
                tracing::warn!(platform = %platform, "Rate limit acquire timed out");
                return Err(AppError::RateLimitExceeded(platform.to_string()));
            }
            tokio::time::sleep(wait.max(MIN_WAIT)).await;
        }
    }
}
