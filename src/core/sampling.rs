//! Deterministic rate sampling for high-volume log statements
//!
//! Callers tag a class of statements with a sampling key and a rate `n`.
//! For each key a rolling counter advances on every call and only the call
//! that brings the counter back to zero is emitted, so with `n = 3` the
//! third, sixth, ninth... calls pass and the rest are suppressed.
//!
//! # Example
//!
//! ```
//! use vlog::RateSampler;
//!
//! let sampler = RateSampler::new();
//! sampler.set_rate("cache-miss", 3);
//!
//! let emitted: Vec<bool> = (0..6).map(|_| sampler.should_log("cache-miss")).collect();
//! assert_eq!(emitted, [false, false, true, false, false, true]);
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for sampling observability
///
/// Tracks how many sampled calls were emitted vs suppressed.
///
/// # Example
///
/// ```
/// use vlog::SamplerMetrics;
///
/// let metrics = SamplerMetrics::new();
/// assert_eq!(metrics.sampled_count(), 0);
/// assert_eq!(metrics.suppressed_count(), 0);
/// ```
#[derive(Debug)]
pub struct SamplerMetrics {
    /// Number of calls that passed sampling
    sampled_count: AtomicU64,

    /// Number of calls suppressed by sampling
    suppressed_count: AtomicU64,
}

impl SamplerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            suppressed_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed_count.load(Ordering::Relaxed)
    }

    /// Get the total number of sampling decisions taken
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.sampled_count() + self.suppressed_count()
    }

    #[inline]
    fn record(&self, emitted: bool) {
        if emitted {
            self.sampled_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.suppressed_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fraction of decisions that were emitted
    ///
    /// Returns 1.0 if no decisions have been taken yet.
    pub fn effective_sample_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            1.0
        } else {
            self.sampled_count() as f64 / total as f64
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.sampled_count.store(0, Ordering::Relaxed);
        self.suppressed_count.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct SamplerState {
    rates: HashMap<String, u64>,
    counters: HashMap<String, u64>,
}

/// Keyed modulo sampler shared by every logger of a pipeline
#[derive(Debug, Default)]
pub struct RateSampler {
    state: Mutex<SamplerState>,
    metrics: SamplerMetrics,
}

impl RateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rate` for `key`, clamped to at least 1, and restart its window.
    pub fn set_rate(&self, key: &str, rate: i64) {
        let rate = clamp_rate(rate);
        let mut state = self.state.lock();
        state.rates.insert(key.to_string(), rate);
        state.counters.remove(key);
    }

    /// Like [`set_rate`](Self::set_rate) but leaves the window untouched
    /// when `key` is already registered with the same rate.
    ///
    /// Returns `true` if the rate was (re)registered.
    pub fn ensure_rate(&self, key: &str, rate: i64) -> bool {
        let rate = clamp_rate(rate);
        let mut state = self.state.lock();
        if state.rates.get(key) == Some(&rate) {
            return false;
        }
        state.rates.insert(key.to_string(), rate);
        state.counters.remove(key);
        true
    }

    /// Registered rate for `key`
    pub fn rate(&self, key: &str) -> Option<u64> {
        self.state.lock().rates.get(key).copied()
    }

    /// Advance the window for `key` and report whether this call is emitted.
    ///
    /// Keys without a registered rate, or with a rate of 1, always pass.
    pub fn should_log(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let rate = match state.rates.get(key) {
            Some(&rate) if rate > 1 => rate,
            _ => return true,
        };

        let counter = state.counters.entry(key.to_string()).or_insert(0);
        *counter = (*counter + 1) % rate;
        let emitted = *counter == 0;
        drop(state);

        self.metrics.record(emitted);
        emitted
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }
}

fn clamp_rate(rate: i64) -> u64 {
    u64::try_from(rate.max(1)).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(sampler: &RateSampler, key: &str, calls: usize) -> Vec<bool> {
        (0..calls).map(|_| sampler.should_log(key)).collect()
    }

    #[test]
    fn test_unregistered_key_always_logs() {
        let sampler = RateSampler::new();
        assert!(pattern(&sampler, "unknown", 5).into_iter().all(|b| b));
        assert_eq!(sampler.metrics().total_count(), 0);
    }

    #[test]
    fn test_rate_three_emits_last_of_window() {
        let sampler = RateSampler::new();
        sampler.set_rate("k", 3);
        assert_eq!(
            pattern(&sampler, "k", 9),
            [false, false, true, false, false, true, false, false, true]
        );
        assert_eq!(sampler.metrics().sampled_count(), 3);
        assert_eq!(sampler.metrics().suppressed_count(), 6);
    }

    #[test]
    fn test_rate_clamped_to_one() {
        let sampler = RateSampler::new();
        sampler.set_rate("zero", 0);
        sampler.set_rate("negative", -5);
        assert_eq!(sampler.rate("zero"), Some(1));
        assert_eq!(sampler.rate("negative"), Some(1));
        assert!(pattern(&sampler, "zero", 4).into_iter().all(|b| b));
    }

    #[test]
    fn test_set_rate_resets_window() {
        let sampler = RateSampler::new();
        sampler.set_rate("k", 3);
        assert_eq!(pattern(&sampler, "k", 2), [false, false]);

        // Without the reset the next call would be emitted.
        sampler.set_rate("k", 3);
        assert_eq!(pattern(&sampler, "k", 3), [false, false, true]);

        sampler.set_rate("k", 2);
        assert_eq!(pattern(&sampler, "k", 2), [false, true]);
    }

    #[test]
    fn test_ensure_rate_keeps_window_for_same_rate() {
        let sampler = RateSampler::new();
        assert!(sampler.ensure_rate("k", 3));
        assert!(!sampler.should_log("k"));
        assert!(!sampler.ensure_rate("k", 3));
        assert!(!sampler.should_log("k"));
        assert!(!sampler.ensure_rate("k", 3));
        assert!(sampler.should_log("k"));

        // a different rate restarts immediately
        assert!(!sampler.should_log("k"));
        assert!(sampler.ensure_rate("k", 4));
        assert_eq!(pattern(&sampler, "k", 4), [false, false, false, true]);
    }

    #[test]
    fn test_keys_are_independent() {
        let sampler = RateSampler::new();
        sampler.set_rate("a", 2);
        sampler.set_rate("b", 3);
        assert!(!sampler.should_log("a"));
        assert!(!sampler.should_log("b"));
        assert!(sampler.should_log("a"));
        assert!(!sampler.should_log("b"));
        assert!(sampler.should_log("b"));
    }

    #[test]
    fn test_effective_sample_rate() {
        let sampler = RateSampler::new();
        assert_eq!(sampler.metrics().effective_sample_rate(), 1.0);
        sampler.set_rate("k", 4);
        pattern(&sampler, "k", 8);
        assert!((sampler.metrics().effective_sample_rate() - 0.25).abs() < f64::EPSILON);
        sampler.metrics().reset();
        assert_eq!(sampler.metrics().total_count(), 0);
    }
}
