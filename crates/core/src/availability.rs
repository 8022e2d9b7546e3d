//! Appointment slot generation.
//!
//! [`generate_slots`] walks a time cursor across the booking horizon and
//! emits every candidate window that fits the org's [`SlotStrategy`] and
//! misses every [`BusyInterval`]. The function is pure: callers fetch busy
//! time (calendar, active holds, live appointments) and pass the clock in,
//! so the same inputs always produce the same ordered slot sequence.

use chrono::{Datelike, Duration, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Default booking horizon, in days.
pub const DEFAULT_DAYS_AHEAD: i64 = 14;

/// Daily window during which slots may be offered, in whole hours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Per-org slot generation configuration, stored in the org's config JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotStrategy {
    pub duration_minutes: i64,
    pub lead_time_hours: i64,
    pub buffer_minutes: i64,
    pub max_per_day: usize,
    pub working_hours: WorkingHours,
    /// Days on which no slots are offered. Defaults to Saturday/Sunday.
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<Weekday>,
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

impl Default for SlotStrategy {
    fn default() -> Self {
        Self {
            duration_minutes: 120,
            lead_time_hours: 48,
            buffer_minutes: 30,
            max_per_day: 3,
            working_hours: WorkingHours {
                start_hour: 8,
                end_hour: 17,
            },
            weekend_days: default_weekend_days(),
        }
    }
}

/// A candidate appointment window. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// A time range that is already occupied: calendar busy time, an active
/// hold, or a non-cancelled appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl BusyInterval {
    /// Half-open interval overlap: `[start, end)` vs `[self.start, self.end)`.
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        start < self.end && end > self.start
    }
}

/// Generate the ordered sequence of open slots for the next `days_ahead` days.
///
/// The cursor starts at `now + lead_time_hours` snapped to the working-hour
/// grid and advances by `duration + buffer` per candidate. Weekend days are
/// skipped entirely, candidates that would run past closing move the cursor
/// to the next day's opening hour, and acceptance per day is capped at
/// `max_per_day` (the cursor keeps walking, so later days are unaffected).
pub fn generate_slots(
    strategy: &SlotStrategy,
    busy: &[BusyInterval],
    now: Timestamp,
    days_ahead: i64,
) -> Vec<Slot> {
    let earliest_start = now + Duration::hours(strategy.lead_time_hours);
    let horizon = now + Duration::days(days_ahead);
    let duration = Duration::minutes(strategy.duration_minutes);
    let step = Duration::minutes(strategy.duration_minutes + strategy.buffer_minutes);

    // A non-positive step cannot advance the cursor.
    if strategy.duration_minutes <= 0 || step <= Duration::zero() {
        return Vec::new();
    }

    // Snap to the top of the hour. This can move the cursor before
    // `earliest_start`; the lead-time check below skips those candidates.
    let mut cursor = at_hour(earliest_start, earliest_start.hour());
    if cursor.hour() < strategy.working_hours.start_hour {
        cursor = at_hour(cursor, strategy.working_hours.start_hour);
    }

    let mut slots = Vec::new();
    let mut day = cursor.date_naive();
    let mut accepted_today = 0usize;

    while cursor < horizon {
        if cursor.date_naive() != day {
            day = cursor.date_naive();
            accepted_today = 0;
        }

        if strategy.weekend_days.contains(&cursor.weekday()) {
            cursor = next_day_start(cursor, strategy.working_hours.start_hour);
            continue;
        }

        if cursor.hour() < strategy.working_hours.start_hour {
            cursor = at_hour(cursor, strategy.working_hours.start_hour);
            continue;
        }

        let end = cursor + duration;

        // The slot must finish inside working hours; no truncation.
        if runs_past_closing(cursor, end, strategy.working_hours.end_hour) {
            cursor = next_day_start(cursor, strategy.working_hours.start_hour);
            continue;
        }

        if cursor >= earliest_start
            && accepted_today < strategy.max_per_day
            && !busy.iter().any(|b| b.overlaps(cursor, end))
        {
            slots.push(Slot { start: cursor, end });
            accepted_today += 1;
        }

        cursor += step;
    }

    slots
}

/// The same calendar day as `t`, at `hour:00:00` UTC.
fn at_hour(t: Timestamp, hour: u32) -> Timestamp {
    t.date_naive()
        .and_hms_opt(hour.min(23), 0, 0)
        .expect("hour is clamped to 0-23")
        .and_utc()
}

/// Opening time of the calendar day after `t`.
fn next_day_start(t: Timestamp, start_hour: u32) -> Timestamp {
    at_hour(t + Duration::days(1), start_hour)
}

/// True when a candidate ending at `end` would pass `end_hour` on the day
/// it starts. An end at exactly `end_hour:00` is allowed.
fn runs_past_closing(start: Timestamp, end: Timestamp, end_hour: u32) -> bool {
    if end.date_naive() != start.date_naive() {
        return true;
    }
    end.hour() > end_hour || (end.hour() == end_hour && (end.minute() > 0 || end.second() > 0))
}
