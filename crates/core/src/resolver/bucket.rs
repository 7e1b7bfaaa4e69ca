//! Token bucket rate limiter for the classification oracle.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Tokens are tracked in thousandths to keep refill arithmetic integral.
const MILLI: u64 = 1000;

#[derive(Debug)]
struct BucketState {
    milli_tokens: u64,
    last_refill: Instant,
}

/// A token bucket with explicit, instance-owned state.
///
/// Holds up to `burst` tokens and refills at `per_minute` tokens per
/// minute. Each call takes one token or fails without waiting.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u64,
    per_minute: u64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket.
    #[must_use]
    pub fn new(burst: u32, per_minute: u32) -> Self {
        Self::starting_at(burst, per_minute, Instant::now())
    }

    /// Creates a full bucket whose refill clock starts at `now`.
    #[must_use]
    pub fn starting_at(burst: u32, per_minute: u32, now: Instant) -> Self {
        let capacity = u64::from(burst) * MILLI;
        Self {
            capacity,
            per_minute: u64::from(per_minute),
            state: Mutex::new(BucketState {
                milli_tokens: capacity,
                last_refill: now,
            }),
        }
    }

    /// Takes a token if one is available now.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Takes a token if one is available at `now`.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed_ms = u64::try_from(now.saturating_duration_since(state.last_refill).as_millis())
            .unwrap_or(u64::MAX);
        // per_minute tokens per 60_000 ms, in thousandths: per_minute * elapsed_ms / 60.
        let refill = self.per_minute.saturating_mul(elapsed_ms) / 60;
        if refill > 0 {
            state.milli_tokens = state.milli_tokens.saturating_add(refill).min(self.capacity);
            state.last_refill = now;
        }

        if state.milli_tokens >= MILLI {
            state.milli_tokens -= MILLI;
            true
        } else {
            false
        }
    }
}
