//! Slot and interval arithmetic
//!
//! The overlap predicate here is the same test the booking repository runs in
//! SQL; availability is advisory (the calendar asks it), the repository's
//! transactional scan is the authority.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Half-open interval intersection: [s1, e1) and [s2, e2) overlap iff
/// `s1 < e2 && s2 < e1`. Intervals that only touch at a boundary do not.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Working-day window for a calendar date
pub fn day_window(date: NaiveDate, start_hour: u32, end_hour: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .from_utc_datetime(&date.and_hms_opt(start_hour, 0, 0).expect("valid hour"));
    let end = Utc.from_utc_datetime(&date.and_hms_opt(end_hour, 0, 0).expect("valid hour"));
    (start, end)
}

/// Compute free slot starts on a grid.
///
/// The grid runs from `window.0` in steps of `interval_minutes`; a slot is
/// free when an appointment of `duration_minutes` starting there fits inside
/// the window and intersects none of `busy`.
pub fn free_slots(
    window: (DateTime<Utc>, DateTime<Utc>),
    interval_minutes: u32,
    duration_minutes: u32,
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<DateTime<Utc>> {
    let (day_start, day_end) = window;
    let step = Duration::minutes(interval_minutes as i64);
    let duration = Duration::minutes(duration_minutes as i64);

    let mut slots = Vec::new();
    let mut slot_start = day_start;
    while slot_start + duration <= day_end {
        let slot_end = slot_start + duration;
        let taken = busy.iter().any(|&(s, e)| overlaps(slot_start, slot_end, s, e));
        if !taken {
            slots.push(slot_start);
        }
        slot_start += step;
    }
    slots
}
