use std::fmt;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum GtfsParseError {
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    #[error("invalid date value: {0}")]
    InvalidDateValue(String),
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("invalid time value: {0}")]
    InvalidTimeValue(String),
}

/// A GTFS time of day. Hours are unbounded above 23: a trip that leaves
/// after midnight relative to its service day is written as `25:10:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeOfDay {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeOfDay {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn parse(value: &str) -> Result<Self, GtfsParseError> {
        let trimmed = value.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() != 3 {
            return Err(GtfsParseError::InvalidTimeFormat(value.to_string()));
        }

        let hours: u32 = parts[0]
            .parse()
            .map_err(|_| GtfsParseError::InvalidTimeFormat(value.to_string()))?;
        let minutes: u32 = parts[1]
            .parse()
            .map_err(|_| GtfsParseError::InvalidTimeFormat(value.to_string()))?;
        let seconds: u32 = parts[2]
            .parse()
            .map_err(|_| GtfsParseError::InvalidTimeFormat(value.to_string()))?;

        if minutes > 59 || seconds > 59 {
            return Err(GtfsParseError::InvalidTimeValue(value.to_string()));
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.total_seconds().cmp(&other.total_seconds())
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimeOfDayVisitor;

        impl<'de> Visitor<'de> for TimeOfDayVisitor {
            type Value = TimeOfDay;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a GTFS time in HH:MM:SS format")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TimeOfDay, E> {
                TimeOfDay::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimeOfDayVisitor)
    }
}

/// Parses a GTFS service date in `YYYYMMDD` form.
pub fn parse_service_date(value: &str) -> Result<NaiveDate, GtfsParseError> {
    let trimmed = value.trim();
    if trimmed.len() != 8 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(GtfsParseError::InvalidDateFormat(value.to_string()));
    }

    let year: i32 = trimmed[0..4]
        .parse()
        .map_err(|_| GtfsParseError::InvalidDateFormat(value.to_string()))?;
    let month: u32 = trimmed[4..6]
        .parse()
        .map_err(|_| GtfsParseError::InvalidDateFormat(value.to_string()))?;
    let day: u32 = trimmed[6..8]
        .parse()
        .map_err(|_| GtfsParseError::InvalidDateFormat(value.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| GtfsParseError::InvalidDateValue(value.to_string()))
}

pub fn format_service_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum LocationType {
    #[default]
    #[serde(rename = "0")]
    StopOrPlatform,
    #[serde(rename = "1")]
    Station,
    #[serde(rename = "2")]
    EntranceOrExit,
    #[serde(rename = "3")]
    GenericNode,
    #[serde(rename = "4")]
    BoardingArea,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum WheelchairBoarding {
    #[default]
    #[serde(rename = "0")]
    NoInfo,
    #[serde(rename = "1")]
    Some,
    #[serde(rename = "2")]
    NotPossible,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum ExceptionType {
    #[serde(rename = "1")]
    Added,
    #[serde(rename = "2")]
    Removed,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum PickupType {
    #[default]
    #[serde(rename = "0")]
    Regular,
    #[serde(rename = "1")]
    NoPickup,
    #[serde(rename = "2")]
    MustPhone,
    #[serde(rename = "3")]
    MustCoordinateWithDriver,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Agency {
    pub agency_id: Option<String>,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: Option<String>,
    pub agency_phone: Option<String>,
    pub agency_fare_url: Option<String>,
    pub agency_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Stop {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: Option<String>,
    pub stop_desc: Option<String>,
    pub stop_lon: f64,
    pub stop_lat: f64,
    pub zone_id: Option<String>,
    pub stop_url: Option<String>,
    pub location_type: LocationType,
    pub parent_station: Option<String>,
    pub stop_timezone: Option<String>,
    pub wheelchair_boarding: WheelchairBoarding,
    pub level_id: Option<String>,
    pub platform_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CalendarDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

/// A denormalized stop-time x trip x route x calendar row, one per
/// trip/stop pairing. Rows with pickup disabled never reach the engine;
/// the storage contract excludes them at the source.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Departure {
    pub departure_time: TimeOfDay,
    pub stop_id: String,
    pub trip_id: String,
    pub service_id: String,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
    pub agency_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub pickup_type: PickupType,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Departure {
    /// The weekly calendar flag for the given weekday.
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// The shape of query a `Service` was produced by, which controls how a
/// front end formats the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Stop,
    Trip,
}

/// A resolved upcoming service. Built fresh per query and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub agency_id: Option<String>,
    pub agency_name: String,
    pub departure_at: DateTime<Utc>,
    pub departure_time: TimeOfDay,
    pub destination_name: String,
    pub route_name: String,
    pub stop_id: String,
    pub stop_name: String,
    pub trip_id: String,
    pub kind: ServiceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_within_service_day() {
        let time = TimeOfDay::parse("08:05:30").unwrap();
        assert_eq!(time, TimeOfDay::new(8, 5, 30));
    }

    #[test]
    fn parses_time_past_midnight() {
        let time = TimeOfDay::parse("25:10:00").unwrap();
        assert_eq!(time.hours, 25);
        assert_eq!(time.to_string(), "25:10:00");
    }

    #[test]
    fn parses_single_digit_hours() {
        let time = TimeOfDay::parse("7:00:00").unwrap();
        assert_eq!(time, TimeOfDay::new(7, 0, 0));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            TimeOfDay::parse("10:30"),
            Err(GtfsParseError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            TimeOfDay::parse("10:30:00:00"),
            Err(GtfsParseError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_segments() {
        assert!(matches!(
            TimeOfDay::parse("ten:30:00"),
            Err(GtfsParseError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            TimeOfDay::parse("-1:30:00"),
            Err(GtfsParseError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_minutes_and_seconds() {
        assert!(matches!(
            TimeOfDay::parse("10:61:00"),
            Err(GtfsParseError::InvalidTimeValue(_))
        ));
        assert!(matches!(
            TimeOfDay::parse("10:00:99"),
            Err(GtfsParseError::InvalidTimeValue(_))
        ));
    }

    #[test]
    fn orders_by_total_seconds() {
        let early = TimeOfDay::new(9, 59, 59);
        let late = TimeOfDay::new(25, 0, 0);
        assert!(early < late);
        assert_eq!(late.total_seconds(), 90_000);
    }

    #[test]
    fn parses_service_date() {
        let date = parse_service_date("20250121").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap());
        assert_eq!(format_service_date(date), "20250121");
    }

    #[test]
    fn rejects_malformed_service_date() {
        assert!(matches!(
            parse_service_date("2025-01-21"),
            Err(GtfsParseError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            parse_service_date("20251301"),
            Err(GtfsParseError::InvalidDateValue(_))
        ));
    }

    #[test]
    fn weekday_flags_resolve_by_name() {
        let departure = Departure {
            tuesday: true,
            ..Default::default()
        };
        assert!(departure.runs_on(Weekday::Tue));
        assert!(!departure.runs_on(Weekday::Mon));
    }
}
