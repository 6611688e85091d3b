/// Source of "now" for expiry checks and expiry computation.
pub trait Clock: Send + Sync {
    /// Epoch milliseconds.
    fn now_millis(&self) -> i64;
}

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// `now_millis + hours`, or `None` when that does not fit in epoch millis.
pub fn hours_after(now_millis: i64, hours: i64) -> Option<i64> {
    hours
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|ttl| now_millis.checked_add(ttl))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use test_clock::TestClock;
