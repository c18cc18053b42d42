use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::warn;

use crate::store::{KeyValueStore, StoreResult};

pub const QUOTA_KEY: &str = "aichat_messages";
pub const LOW_QUOTA_THRESHOLD: u32 = 5;

/// Source of "today" and "now"; swapped out in tests.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
    fn now_millis(&self) -> i64;
}

/// Local calendar day, falling back to UTC when the offset is unknown.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .date()
    }

    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: time::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    fn current(&self) -> OffsetDateTime {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn today(&self) -> Date {
        self.current().date()
    }

    fn now_millis(&self) -> i64 {
        (self.current().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Persisted per-day send counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    pub count: u32,
    pub date: String,
}

impl DailyQuota {
    fn fresh(today: Date) -> Self {
        Self {
            count: 0,
            date: today.to_string(),
        }
    }
}

/// Reads and bumps the [`DailyQuota`] record in a [`KeyValueStore`].
///
/// The check and the increment are separate store round-trips; two writers on the same
/// store (two windows) can lose an update.
pub struct QuotaTracker {
    store: Arc<dyn KeyValueStore>,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Today's record. A record from another day, or one that cannot be parsed, counts as zero.
    pub fn today(&self, today: Date) -> StoreResult<DailyQuota> {
        let Some(raw) = self.store.get(QUOTA_KEY)? else {
            return Ok(DailyQuota::fresh(today));
        };
        match serde_json::from_str::<DailyQuota>(&raw) {
            Ok(record) if record.date == today.to_string() => Ok(record),
            Ok(_) => Ok(DailyQuota::fresh(today)),
            Err(err) => {
                warn!("discarding unreadable quota record: {err}");
                Ok(DailyQuota::fresh(today))
            }
        }
    }

    pub fn remaining(&self, today: Date) -> StoreResult<u32> {
        Ok(self.limit.saturating_sub(self.today(today)?.count))
    }

    pub fn can_send(&self, today: Date) -> StoreResult<bool> {
        Ok(self.today(today)?.count < self.limit)
    }

    pub fn increment(&self, today: Date) -> StoreResult<DailyQuota> {
        let mut record = self.today(today)?;
        record.count += 1;
        // Serializing a two-field struct cannot fail.
        let encoded = serde_json::to_string(&record).unwrap_or_default();
        self.store.set(QUOTA_KEY, &encoded)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use time::macros::date;

    fn tracker(limit: u32) -> (QuotaTracker, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        (QuotaTracker::new(Arc::clone(&store), limit), store)
    }

    #[test]
    fn counts_down_and_blocks_at_limit() {
        let (quota, _store) = tracker(3);
        let day = date!(2026 - 10 - 18);

        for n in 1..=3 {
            assert!(quota.can_send(day).unwrap());
            assert_eq!(quota.increment(day).unwrap().count, n);
            assert_eq!(quota.remaining(day).unwrap(), 3 - n);
        }
        assert!(!quota.can_send(day).unwrap());
        assert_eq!(quota.remaining(day).unwrap(), 0);
    }

    #[test]
    fn resets_on_a_new_day() {
        let (quota, store) = tracker(50);
        store
            .set(QUOTA_KEY, r#"{"count":50,"date":"2026-10-17"}"#)
            .unwrap();

        let today = date!(2026 - 10 - 18);
        assert_eq!(quota.remaining(today).unwrap(), 50);
        assert_eq!(quota.increment(today).unwrap().count, 1);
        assert_eq!(
            store.get(QUOTA_KEY).unwrap().as_deref(),
            Some(r#"{"count":1,"date":"2026-10-18"}"#)
        );
    }

    #[test]
    fn garbage_record_counts_as_zero() {
        let (quota, store) = tracker(50);
        store.set(QUOTA_KEY, "not json").unwrap();
        assert_eq!(quota.remaining(date!(2026 - 10 - 18)).unwrap(), 50);
    }

    #[test]
    fn system_clock_reads_the_current_day() {
        let clock = SystemClock;
        let before = OffsetDateTime::now_utc();
        let millis = clock.now_millis();
        let today = clock.today();
        let after = OffsetDateTime::now_utc();

        assert!(millis >= (before.unix_timestamp_nanos() / 1_000_000) as i64);
        assert!(millis <= (after.unix_timestamp_nanos() / 1_000_000) as i64);
        // Local date is within a day of the UTC date for any offset.
        assert!(today >= before.date().previous_day().unwrap());
        assert!(today <= after.date().next_day().unwrap());
    }

    #[test]
    fn manual_clock_rolls_over_midnight() {
        let clock = ManualClock::new(time::macros::datetime!(2026-10-18 23:59 UTC));
        assert_eq!(clock.today(), date!(2026 - 10 - 18));
        clock.advance(time::Duration::minutes(2));
        assert_eq!(clock.today(), date!(2026 - 10 - 19));
    }
}
