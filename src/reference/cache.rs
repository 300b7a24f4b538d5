use chrono::{DateTime, Duration, Utc};

/// Last known offset between network time and the device clock.
///
/// Owned by the reference-time service and invalidated explicitly.
#[derive(Debug, Clone)]
pub struct OffsetCache {
    offset_ms: Option<i64>,
    synced_at: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl OffsetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            offset_ms: None,
            synced_at: None,
            ttl,
        }
    }

    /// Cached offset if it was stored less than `ttl` before `now`. A sync
    /// time in the future (device clock stepped back) counts as stale.
    pub fn get(&self, now: DateTime<Utc>) -> Option<i64> {
        let (offset, synced_at) = (self.offset_ms?, self.synced_at?);
        let age = now - synced_at;
        if age >= Duration::zero() && age < self.ttl {
            Some(offset)
        } else {
            None
        }
    }

    pub fn store(&mut self, offset_ms: i64, now: DateTime<Utc>) {
        self.offset_ms = Some(offset_ms);
        self.synced_at = Some(now);
    }

    pub fn invalidate(&mut self) {
        self.offset_ms = None;
        self.synced_at = None;
    }
}
