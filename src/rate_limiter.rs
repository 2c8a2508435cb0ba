use crate::constants::{RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_MS};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquire {
    /// Whether a new request may be dispatched now
    pub allowed: bool,
    /// Whole seconds until the oldest recent request leaves the window (0 when allowed)
    pub retry_after_seconds: u64,
    /// History pruned to the requests still inside the window
    pub recent: Vec<i64>,
}

/// Decide whether a request at `now` (ms since epoch) fits in the window.
///
/// `history` must be in chronological order. The returned `recent` never
/// includes `now`; callers append it themselves once the request is actually
/// dispatched.
pub fn try_acquire(now: i64, history: &[i64]) -> Acquire {
    try_acquire_with(now, history, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_MS)
}

pub fn try_acquire_with(now: i64, history: &[i64], max_requests: usize, window_ms: i64) -> Acquire {
    let recent: Vec<i64> = history
        .iter()
        .copied()
        .filter(|t| now - t < window_ms)
        .collect();

    if recent.len() >= max_requests {
        // A zero limit with nothing recent never opens, there is nothing to wait for
        let retry_after_seconds = recent.first().map_or(0, |&oldest| {
            let remaining_ms = (window_ms - (now - oldest)).max(0) as u64;
            remaining_ms.div_ceil(1000)
        });
        Acquire {
            allowed: false,
            retry_after_seconds,
            recent,
        }
    } else {
        Acquire {
            allowed: true,
            retry_after_seconds: 0,
            recent,
        }
    }
}

/// Session-owned request history.
///
/// Wraps the timestamp list so the owner can check and record without
/// handling the pruning itself.
#[derive(Debug, Clone, Default)]
pub struct RateWindow {
    timestamps: Vec<i64>,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the window at `now`, pruning expired entries as a side effect.
    pub fn check(&mut self, now: i64) -> Acquire {
        let acquire = try_acquire(now, &self.timestamps);
        self.timestamps = acquire.recent.clone();
        acquire
    }

    /// Record a dispatched request.
    pub fn record(&mut self, now: i64) {
        self.timestamps.push(now);
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_is_allowed() {
        let result = try_acquire(0, &[]);
        assert!(result.allowed);
        assert_eq!(result.retry_after_seconds, 0);
        assert!(result.recent.is_empty());
    }

    #[test]
    fn test_full_window_is_denied() {
        let history = [0, 1000, 2000, 3000, 4000];
        let result = try_acquire(5000, &history);
        assert!(!result.allowed);
        // ceil((360000 - (5000 - 0)) / 1000)
        assert_eq!(result.retry_after_seconds, 355);
        assert_eq!(result.recent, history.to_vec());
    }

    #[test]
    fn test_four_requests_still_allowed() {
        let result = try_acquire(5000, &[0, 1000, 2000, 3000]);
        assert!(result.allowed);
        assert_eq!(result.retry_after_seconds, 0);
        assert_eq!(result.recent.len(), 4);
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        // 0 is exactly one window old and drops out (strict comparison)
        let history = [0, 1000, 2000, 3000, 4000];
        let result = try_acquire(RATE_LIMIT_WINDOW_MS, &history);
        assert!(result.allowed);
        assert_eq!(result.recent, vec![1000, 2000, 3000, 4000]);
    }

    #[test]
    fn test_one_ms_before_expiry_rounds_up() {
        let history = [0, 1000, 2000, 3000, 4000];
        let result = try_acquire(RATE_LIMIT_WINDOW_MS - 1, &history);
        assert!(!result.allowed);
        assert_eq!(result.retry_after_seconds, 1);
    }

    #[test]
    fn test_repeated_checks_are_idempotent() {
        let history = [10_000, 20_000, 30_000, 40_000, 50_000];
        let first = try_acquire(60_000, &history);
        let second = try_acquire(60_000, &first.recent);
        assert_eq!(first, second);
    }

    #[test]
    fn test_retry_after_decreases_with_time() {
        let history = [0, 1000, 2000, 3000, 4000];
        let at_t = try_acquire(5000, &history);
        let at_later = try_acquire(15_000, &history);
        assert!(!at_later.allowed);
        assert_eq!(at_t.retry_after_seconds - at_later.retry_after_seconds, 10);
    }

    #[test]
    fn test_denies_iff_window_is_full() {
        let now = 400_000;
        for count in 0..8usize {
            let history: Vec<i64> = (0..count as i64).map(|i| now - 1000 * (i + 1)).rev().collect();
            let result = try_acquire(now, &history);
            assert_eq!(result.allowed, count < RATE_LIMIT_MAX_REQUESTS, "count = {}", count);
        }
    }

    #[test]
    fn test_custom_limit() {
        let result = try_acquire_with(2500, &[0, 2000], 2, 3000);
        assert!(!result.allowed);
        assert_eq!(result.retry_after_seconds, 1);
    }

    #[test]
    fn test_zero_limit_denies_without_panicking() {
        let result = try_acquire_with(0, &[], 0, 1000);
        assert!(!result.allowed);
        assert_eq!(result.retry_after_seconds, 0);

        let result = try_acquire_with(500, &[0], 0, 1000);
        assert!(!result.allowed);
        assert_eq!(result.retry_after_seconds, 1);
    }

    #[test]
    fn test_rate_window_records_only_when_told() {
        let mut window = RateWindow::new();
        for i in 0..5 {
            assert!(window.check(i * 1000).allowed);
            window.record(i * 1000);
        }
        let denied = window.check(5000);
        assert!(!denied.allowed);
        assert_eq!(window.timestamps().len(), 5);

        // Denied checks do not record anything
        window.check(5001);
        assert_eq!(window.timestamps().len(), 5);
    }
}
