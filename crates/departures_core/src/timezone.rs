use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use gtfs_departures_model::{Agency, Departure, Stop};

/// Applied when neither the stop nor any agency carries a usable zone.
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::Etc::UTC;

/// Picks the IANA zone that applies to a departure.
///
/// Precedence, first usable zone wins: the timezone of the departure's
/// stop (stop-level overrides exist for feeds spanning a zone boundary),
/// the timezone of the departure's agency, the timezone of the first
/// agency in the feed, then [`FALLBACK_TIMEZONE`]. A non-empty value that
/// is not a known zone id falls through to the next step.
pub fn resolve_timezone(agencies: &[Agency], stops: &[Stop], departure: &Departure) -> Tz {
    let stop_zone = stops
        .iter()
        .find(|stop| stop.stop_id == departure.stop_id)
        .and_then(|stop| stop.stop_timezone.as_deref());

    let agency_zone = match departure.agency_id.as_deref() {
        Some(id) => agencies
            .iter()
            .find(|agency| agency.agency_id.as_deref() == Some(id))
            .map(|agency| agency.agency_timezone.as_str()),
        // A feed may carry exactly one agency with no id.
        None => agencies.first().map(|agency| agency.agency_timezone.as_str()),
    };

    let first_agency_zone = agencies.first().map(|agency| agency.agency_timezone.as_str());

    parse_zone(stop_zone)
        .or_else(|| parse_zone(agency_zone))
        .or_else(|| parse_zone(first_agency_zone))
        .unwrap_or(FALLBACK_TIMEZONE)
}

/// Maps a naive local datetime into the zone, taking the earliest instant
/// when a DST fall-back makes the local time ambiguous. Returns `None` for
/// local times that do not exist (spring-forward gap).
pub fn localize(zone: Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&local).earliest()
}

fn parse_zone(value: Option<&str>) -> Option<Tz> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
