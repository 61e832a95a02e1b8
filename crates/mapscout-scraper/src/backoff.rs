//! Delay policy for the Query Scraper.
//!
//! | Situation | Delay before the next fetch |
//! |-----------|-----------------------------|
//! | page extracted | uniform in `[delay_min, delay_max]` |
//! | n-th consecutive failure | `delay_max + retry_base × 2^(n-1)` (± 25 % on the exponential part) |
//! | n-th consecutive block | `blocked_base × 2^(n-1)` ± 25 % |
//!
//! Every delay is capped at [`MAX_DELAY_MS`].

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Upper bound for any single sleep.
pub const MAX_DELAY_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub retry_base_ms: u64,
    pub blocked_base_ms: u64,
}

impl BackoffPolicy {
    /// A policy that never sleeps.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            delay_min_ms: 0,
            delay_max_ms: 0,
            retry_base_ms: 0,
            blocked_base_ms: 0,
        }
    }

    /// Pause between two successfully extracted pages.
    #[must_use]
    pub fn page_delay(&self) -> Duration {
        let (lo, hi) = if self.delay_min_ms <= self.delay_max_ms {
            (self.delay_min_ms, self.delay_max_ms)
        } else {
            (self.delay_max_ms, self.delay_min_ms)
        };
        let ms = if lo == hi {
            lo
        } else {
            rand::rng().random_range(lo..=hi)
        };
        Duration::from_millis(ms.min(MAX_DELAY_MS))
    }

    /// Backoff after the `consecutive`-th failed attempt in a row (1-based).
    /// Never shorter than the longest page delay.
    #[must_use]
    pub fn failure_delay(&self, consecutive: u32) -> Duration {
        let growth = jitter(exponential(self.retry_base_ms, consecutive));
        Duration::from_millis(self.delay_max_ms.saturating_add(growth).min(MAX_DELAY_MS))
    }

    /// Backoff after the `consecutive`-th blocked attempt in a row (1-based).
    #[must_use]
    pub fn blocked_delay(&self, consecutive: u32) -> Duration {
        let ms = jitter(exponential(self.blocked_base_ms, consecutive));
        Duration::from_millis(ms.min(MAX_DELAY_MS))
    }
}

fn exponential(base_ms: u64, consecutive: u32) -> u64 {
    let shift = consecutive.saturating_sub(1).min(20);
    base_ms.saturating_mul(1u64 << shift).min(MAX_DELAY_MS)
}

/// Scales `ms` by a random factor in `[0.75, 1.25)`.
fn jitter(ms: u64) -> u64 {
    if ms == 0 {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let scaled = (ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    scaled
}

/// Sleeps for `delay` unless `cancel` fires first. Returns `false` when the
/// sleep was cut short.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
