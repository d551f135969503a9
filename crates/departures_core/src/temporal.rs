use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use gtfs_departures_model::{GtfsParseError, TimeOfDay};

/// Ceiling on how many extra days a post-midnight time-of-day may roll
/// over. Hours of 144 and above all collapse into the +6 band; anything
/// that still exceeds the clock after collapsing is rejected.
pub const MAX_OVERFLOW_DAYS: u32 = 6;

/// The candidate service day relative to the query day.
///
/// A departure stored as `25:00:00` belongs to the previous day's service
/// pattern but lands on today's clock, so resolution always considers
/// yesterday, today and tomorrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayOffset {
    Yesterday,
    Today,
    Tomorrow,
}

impl DayOffset {
    pub const ALL: [DayOffset; 3] = [DayOffset::Yesterday, DayOffset::Today, DayOffset::Tomorrow];

    pub fn signed_days(self) -> i64 {
        match self {
            DayOffset::Yesterday => -1,
            DayOffset::Today => 0,
            DayOffset::Tomorrow => 1,
        }
    }
}

/// Maps the query day's weekday onto the weekly flag that applies to the
/// shifted service day: Yesterday reads one flag back (query Monday reads
/// the Sunday flag), Tomorrow one flag forward.
pub fn service_weekday(offset: DayOffset, weekday: Weekday) -> Weekday {
    match offset {
        DayOffset::Yesterday => weekday.pred(),
        DayOffset::Today => weekday,
        DayOffset::Tomorrow => weekday.succ(),
    }
}

/// Resolves a GTFS time-of-day against a base date into a calendar
/// datetime. Hours are bucketed into 24-hour bands, each band pushing the
/// date one day further: `25:00:00` on 2025-01-21 with a zero offset is
/// 2025-01-22T01:00:00.
pub fn resolve_departure_time(
    base_date: NaiveDate,
    day_offset: i64,
    time: &TimeOfDay,
) -> Result<NaiveDateTime, GtfsParseError> {
    let overflow_days = (time.hours / 24).min(MAX_OVERFLOW_DAYS);
    let hours = time.hours - overflow_days * 24;
    let clock = NaiveTime::from_hms_opt(hours, time.minutes, time.seconds)
        .ok_or_else(|| GtfsParseError::InvalidTimeValue(time.to_string()))?;
    let date = base_date + Duration::days(day_offset + overflow_days as i64);
    Ok(date.and_time(clock))
}
