use std::time::Duration;

use chrono::{DateTime, Utc};

/// The backoff schedule used to compute `next_attempt_at` for a retried
/// delivery. Expressed as a table rather than a formula: attempt 1 waits
/// `intervals[0]`, attempt 2 waits `intervals[1]`, and so on; once
/// `attempt_number` exceeds the table's length the last entry repeats.
///
/// An exponential formula was considered (and is what the prior
/// implementation this service replaces used) but was dropped: a fixed
/// table is trivially configurable and auditable without touching code.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    intervals: Vec<Duration>,
}

impl RetrySchedule {
    pub fn new(seconds: &[u64]) -> Self {
        assert!(!seconds.is_empty(), "retry schedule must not be empty");
        Self {
            intervals: seconds.iter().map(|s| Duration::from_secs(*s)).collect(),
        }
    }

    /// Delay to apply before the attempt numbered `attempt_number` (1-based:
    /// `attempt_number == 1` is the delay before the *second* delivery try).
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        let idx = (attempt_number.max(1) - 1) as usize;
        self.intervals[idx.min(self.intervals.len() - 1)]
    }

    pub fn next_attempt_at(&self, attempt_number: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::from_std(self.delay_for(attempt_number))
            .unwrap_or_else(|_| chrono::Duration::seconds(900))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_table_in_order() {
        let schedule = RetrySchedule::new(&[10, 30, 60, 300, 900]);
        assert_eq!(schedule.delay_for(1), Duration::from_secs(10));
        assert_eq!(schedule.delay_for(2), Duration::from_secs(30));
        assert_eq!(schedule.delay_for(5), Duration::from_secs(900));
    }

    #[test]
    fn repeats_the_last_entry_past_the_table() {
        let schedule = RetrySchedule::new(&[10, 30, 60, 300, 900]);
        assert_eq!(schedule.delay_for(6), Duration::from_secs(900));
        assert_eq!(schedule.delay_for(100), Duration::from_secs(900));
    }

    #[test]
    fn is_not_exponential() {
        let schedule = RetrySchedule::new(&[10, 30, 60, 300, 900]);
        // 2^(n-1) would give 1, 2, 4, 8, 16: this table must not match that shape.
        for n in 1..=5u32 {
            assert_ne!(schedule.delay_for(n), Duration::from_secs(2u64.pow(n - 1)));
        }
    }
}
