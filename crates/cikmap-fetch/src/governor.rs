//! Rate Governor
//!
//! Token-bucket admission gate shared by every outbound request. Tokens
//! refill continuously at `rate` per second up to `burst`.
//!
//! `acquire` reserves permits under the lock, even into a negative balance,
//! and then sleeps outside the lock until the reservation matures. Callers
//! are served in reservation order and nobody waits longer than the
//! outstanding deficit divided by `rate`.
//!
//! With the default burst of one token, any one-second window contains at
//! most `rate + 1` grants.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors raised while building a governor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernorError {
    /// Rate must be finite and positive
    #[error("Invalid rate: {0} (must be finite and > 0)")]
    InvalidRate(f64),

    /// Burst must be at least one and no larger than the rate
    #[error("Invalid burst: {0} (must be between 1 and the rate)")]
    InvalidBurst(f64),
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    granted: u64,
}

/// Thread-safe token-bucket rate limiter
#[derive(Debug)]
pub struct RateGovernor {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateGovernor {
    /// Create a governor admitting `rate` requests per second
    ///
    /// # Examples
    ///
    /// ```
    /// use cikmap_fetch::RateGovernor;
    ///
    /// let governor = RateGovernor::new(10.0).unwrap();
    /// assert_eq!(governor.rate(), 10.0);
    /// assert!(RateGovernor::new(0.0).is_err());
    /// ```
    pub fn new(rate: f64) -> Result<Self, GovernorError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(GovernorError::InvalidRate(rate));
        }
        let burst = 1.0;
        Ok(Self {
            rate,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
                granted: 0,
            }),
        })
    }

    /// Raise the bucket capacity (never above the rate)
    pub fn with_burst(self, burst: f64) -> Result<Self, GovernorError> {
        if !burst.is_finite() || burst < 1.0 || burst > self.rate.max(1.0) {
            return Err(GovernorError::InvalidBurst(burst));
        }
        let bucket = Bucket {
            tokens: burst,
            last_refill: Instant::now(),
            granted: 0,
        };
        Ok(Self {
            rate: self.rate,
            burst,
            bucket: Mutex::new(bucket),
        })
    }

    /// Permits per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Bucket capacity
    pub fn burst(&self) -> f64 {
        self.burst
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;
        bucket
    }

    /// Reserve `n` permits and return how long the caller must wait
    fn reserve(&self, n: u32) -> Duration {
        let mut bucket = self.lock();
        bucket.tokens -= f64::from(n);
        bucket.granted += u64::from(n);
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.rate)
        }
    }

    /// Wait until `n` permits are available, then take them
    pub async fn acquire(&self, n: u32) {
        let wait = self.reserve(n);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Take `n` permits only if they are available right now
    pub fn try_acquire(&self, n: u32) -> bool {
        let mut bucket = self.lock();
        if bucket.tokens >= f64::from(n) {
            bucket.tokens -= f64::from(n);
            bucket.granted += u64::from(n);
            true
        } else {
            false
        }
    }

    /// Current balance (negative while reservations are outstanding)
    pub fn available(&self) -> f64 {
        self.lock().tokens
    }

    /// Permits handed out since creation
    pub fn total_granted(&self) -> u64 {
        self.lock().granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_invalid_rates_rejected() {
        assert_eq!(
            RateGovernor::new(0.0).unwrap_err(),
            GovernorError::InvalidRate(0.0)
        );
        assert!(RateGovernor::new(-2.0).is_err());
        assert!(RateGovernor::new(f64::NAN).is_err());
        assert!(RateGovernor::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_burst_bounds() {
        assert!(RateGovernor::new(5.0).unwrap().with_burst(5.0).is_ok());
        assert!(RateGovernor::new(5.0).unwrap().with_burst(6.0).is_err());
        assert!(RateGovernor::new(5.0).unwrap().with_burst(0.5).is_err());
        assert!(RateGovernor::new(0.5).unwrap().with_burst(1.0).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let governor = RateGovernor::new(10.0).unwrap();
        let start = Instant::now();
        governor.acquire(1).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(governor.total_granted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_acquires_are_spaced() {
        let governor = RateGovernor::new(10.0).unwrap();
        let start = Instant::now();
        for _ in 0..11 {
            governor.acquire(1).await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(990), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(1100), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_and_refill() {
        let governor = RateGovernor::new(2.0).unwrap();
        assert!(governor.try_acquire(1));
        assert!(!governor.try_acquire(1));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!((governor.available() - 1.0).abs() < 1e-9);
        assert!(governor.try_acquire(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_burst() {
        let governor = RateGovernor::new(4.0).unwrap().with_burst(3.0).unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(governor.available(), 3.0);
        assert!(governor.try_acquire(3));
        assert!(!governor.try_acquire(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_never_exceeds_rate_plus_one() {
        let rate = 5.0;
        let governor = Arc::new(RateGovernor::new(rate).unwrap());
        let grants = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..40 {
            let governor = Arc::clone(&governor);
            let grants = Arc::clone(&grants);
            handles.push(tokio::spawn(async move {
                governor.acquire(1).await;
                grants.lock().unwrap().push(start.elapsed());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut grants = grants.lock().unwrap().clone();
        grants.sort();
        assert_eq!(grants.len(), 40);
        for (i, t) in grants.iter().enumerate() {
            let in_window = grants[i..]
                .iter()
                .take_while(|u| **u <= *t + Duration::from_secs(1))
                .count();
            assert!(in_window <= rate as usize + 1, "window at {:?}: {}", t, in_window);
        }
        // 40 grants at 5/s need just under 8 seconds
        assert!(*grants.last().unwrap() >= Duration::from_millis(7_790));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_bounded_by_deficit() {
        let governor = RateGovernor::new(4.0).unwrap();
        governor.acquire(1).await;
        let start = Instant::now();
        governor.acquire(2).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(499));
        assert!(elapsed <= Duration::from_millis(510));
    }
}
