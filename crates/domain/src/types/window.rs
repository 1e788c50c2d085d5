//! Synchronization windows and the policy deciding which intervals belong to
//! one.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{EventSyncError, Result};
use crate::impl_domain_status_conversions;

/// Which activities and events a window selects.
///
/// All variants treat the window as half-open `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowBoundaryPolicy {
    /// The interval overlaps the window.
    #[default]
    Intersects,
    /// The interval starts inside the window; matches the legacy query.
    StartsWithin,
    /// The interval lies entirely inside the window.
    ContainedWithin,
}

impl_domain_status_conversions!(WindowBoundaryPolicy {
    Intersects => "intersects",
    StartsWithin => "starts_within",
    ContainedWithin => "contained_within",
});

impl WindowBoundaryPolicy {
    /// Whether the interval `[start, end]` is selected by `[window_start,
    /// window_end)`.
    pub fn admits<T: PartialOrd>(&self, start: &T, end: &T, window_start: &T, window_end: &T) -> bool {
        match self {
            Self::Intersects => {
                let instant = start == end;
                start < window_end && (end > window_start || (instant && start >= window_start))
            }
            Self::StartsWithin => start >= window_start && start < window_end,
            Self::ContainedWithin => start >= window_start && end <= window_end,
        }
    }
}

/// Calendar-date window of a synchronization request. Both dates are
/// inclusive; the window covers `start 00:00` up to the midnight after `end`
/// in the calendar's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl SyncWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(EventSyncError::InvalidInput(format!(
                "window end {end} precedes window start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    /// Half-open bounds in local wall-clock time.
    pub fn local_bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self.end.and_time(NaiveTime::MIN) + Duration::days(1);
        (start, end)
    }

    /// Half-open bounds as instants, interpreting the dates in `zone`.
    pub fn utc_bounds(&self, zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = self.local_bounds();
        (local_to_utc(start, zone), local_to_utc(end, zone))
    }
}

/// Resolve a wall-clock time in `zone` to an instant.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant. Times
/// inside a gap (clocks going forward) are moved past the gap.
pub fn local_to_utc(local: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            match zone.from_local_datetime(&shifted) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&local),
            }
        }
    }
}
