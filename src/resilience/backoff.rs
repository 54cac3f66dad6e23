//! Exponential backoff.

/// Upper bound for a single computed delay (15 minutes).
pub const MAX_BACKOFF_MS: u64 = 15 * 60 * 1000;

/// Delay before the retry that follows `attempts` earlier retries.
///
/// `base_delay_ms * 2^attempts`, saturating and capped at [`MAX_BACKOFF_MS`].
pub fn backoff_delay_ms(attempts: u32, base_delay_ms: u64) -> u64 {
    let exponential = 2u64.saturating_pow(attempts);
    base_delay_ms.saturating_mul(exponential).min(MAX_BACKOFF_MS)
}
