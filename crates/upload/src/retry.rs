//! Exponential backoff for retried remote calls.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// Retry budget and backoff shape shared by every per-part step.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per step, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
    /// Spread delays by ±25%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempt budget, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_for(attempt, 0)
    }

    /// Like [`delay_for_attempt`](Self::delay_for_attempt), with `salt`
    /// (the part number) spreading the jitter of parts that fail together.
    pub fn delay_for(&self, attempt: u32, salt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        // A NaN product yields the cap; negative ones clamp to zero.
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        if !self.jitter {
            return self.to_duration(capped);
        }
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let offset = jitter_fraction(nanos, salt) * 2.0 - 1.0; // [-1.0, 1.0]
        self.to_duration((capped + capped * 0.25 * offset).max(0.0))
    }

    fn to_duration(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }

    /// Sleeps before the next attempt, returning early on cancellation.
    pub(crate) async fn backoff(
        &self,
        attempt: u32,
        salt: u32,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(self.delay_for(attempt, salt)) => Ok(()),
        }
    }
}

/// Maps a clock sample and a salt onto `[0.0, 1.0]`.
///
/// Multiplying by an odd constant is a bijection on `u32`, so equal
/// clock samples with different salts land far apart.
fn jitter_fraction(nanos: u32, salt: u32) -> f64 {
    let mixed = nanos.wrapping_add(salt).wrapping_mul(0x9E37_79B9);
    f64::from(mixed) / f64::from(u32::MAX)
}
