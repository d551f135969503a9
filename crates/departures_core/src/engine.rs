use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;

use gtfs_departures_model::{Departure, ExceptionType, Service, ServiceKind, Stop};

use crate::geo::haversine_km;
use crate::preload::PreloadedStorage;
use crate::storage::{
    ComparisonMode, GtfsStorage, StopAttribute, StorageProperties, StorageResult,
};
use crate::temporal::{resolve_departure_time, service_weekday, DayOffset};
use crate::timezone::{localize, resolve_timezone};

/// Resolves ranked, deduplicated, timezone-correct lists of upcoming
/// services from a preloaded storage handle.
///
/// The engine is stateless per query; one engine may serve concurrent
/// callers against the same snapshot.
pub struct DepartureEngine<S> {
    storage: PreloadedStorage<S>,
}

impl<S: GtfsStorage> DepartureEngine<S> {
    /// Preloads the reference tables from `storage` and wraps the result.
    pub async fn load(storage: S, properties: &StorageProperties) -> StorageResult<Self> {
        let storage = PreloadedStorage::load(storage, properties).await?;
        Ok(Self::new(storage))
    }

    pub fn new(storage: PreloadedStorage<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &PreloadedStorage<S> {
        &self.storage
    }

    /// Upcoming services departing from a stop around `target`, within
    /// `target ± tolerance`, at most `max_results` entries.
    pub async fn services_by_stop(
        &self,
        stop_id: &str,
        target: DateTime<Utc>,
        comparison: ComparisonMode,
        tolerance: Duration,
        max_results: usize,
    ) -> StorageResult<Vec<Service>> {
        let departures = self.storage.departures_for_stop(stop_id, comparison).await?;
        self.resolve(departures, target, tolerance, max_results, ServiceKind::Stop)
            .await
    }

    /// Upcoming stop calls of a trip around `target`.
    pub async fn services_by_trip(
        &self,
        trip_id: &str,
        target: DateTime<Utc>,
        comparison: ComparisonMode,
        tolerance: Duration,
        max_results: usize,
    ) -> StorageResult<Vec<Service>> {
        let departures = self.storage.departures_for_trip(trip_id, comparison).await?;
        self.resolve(departures, target, tolerance, max_results, ServiceKind::Trip)
            .await
    }

    /// Upcoming services across every child stop of a parent station.
    pub async fn services_by_parent_station(
        &self,
        parent_id: &str,
        target: DateTime<Utc>,
        comparison: ComparisonMode,
        tolerance: Duration,
        max_results: usize,
    ) -> StorageResult<Vec<Service>> {
        let children = self
            .storage
            .stops_by(StopAttribute::ParentStation, parent_id, comparison)
            .await?;

        let mut departures = Vec::new();
        for child in &children {
            departures.extend(
                self.storage
                    .departures_for_stop(&child.stop_id, ComparisonMode::Exact)
                    .await?,
            );
        }

        self.resolve(departures, target, tolerance, max_results, ServiceKind::Stop)
            .await
    }

    /// Preloaded stops within `radius_km` of a coordinate, nearest first.
    pub fn stops_near(&self, lon: f64, lat: f64, radius_km: f64) -> Vec<Stop> {
        let mut found: Vec<(f64, Stop)> = self
            .storage
            .preloaded_stops()
            .iter()
            .map(|stop| {
                (
                    haversine_km(lon, lat, stop.stop_lon, stop.stop_lat),
                    stop.clone(),
                )
            })
            .filter(|(distance, _)| *distance <= radius_km)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, stop)| stop).collect()
    }

    /// Runs the three calendar-day passes over the fetched rows, applies
    /// the eligibility filter, and shapes survivors into `Service`s.
    ///
    /// The departure query carries no day predicate, so one fetch feeds
    /// all three passes. A row whose time-of-day exceeds 24h belongs to
    /// the previous day's pattern but lands on today's clock, which is
    /// why yesterday and tomorrow are always scanned too.
    async fn resolve(
        &self,
        departures: Vec<Departure>,
        target: DateTime<Utc>,
        tolerance: Duration,
        max_results: usize,
        kind: ServiceKind,
    ) -> StorageResult<Vec<Service>> {
        let agencies = self.storage.preloaded_agencies();
        let stops = self.storage.preloaded_stops();
        let calendar_dates = self.storage.preloaded_calendar_dates();

        let earliest = target - tolerance;
        let latest = target + tolerance;

        let mut seen: HashSet<(String, DateTime<Utc>)> = HashSet::new();
        let mut services = Vec::new();

        for departure in &departures {
            let zone = resolve_timezone(agencies, stops, departure);
            let local_target = target.with_timezone(&zone);

            for offset in DayOffset::ALL {
                let service_day =
                    local_target.date_naive() + Duration::days(offset.signed_days());

                let exception = calendar_dates
                    .iter()
                    .find(|row| {
                        row.service_id == departure.service_id && row.date == service_day
                    })
                    .map(|row| row.exception_type);

                let eligible = match exception {
                    Some(ExceptionType::Removed) => false,
                    // An added exception can schedule service outside the
                    // nominal validity window, so it skips the range check.
                    Some(ExceptionType::Added) => true,
                    _ => {
                        departure.runs_on(service_weekday(offset, local_target.weekday()))
                            && departure.start_date <= service_day
                            && service_day <= departure.end_date
                    }
                };
                if !eligible {
                    continue;
                }

                let local = resolve_departure_time(
                    local_target.date_naive(),
                    offset.signed_days(),
                    &departure.departure_time,
                )?;
                let Some(resolved) = localize(zone, local) else {
                    continue;
                };
                let instant = resolved.with_timezone(&Utc);

                if instant < earliest || instant > latest {
                    continue;
                }
                if !seen.insert((departure.trip_id.clone(), instant)) {
                    continue;
                }

                services.push(self.build_service(departure, instant, kind).await?);
            }
        }

        services.sort_by_key(|service| service.departure_at);
        services.truncate(max_results);

        debug!(
            candidates = departures.len(),
            results = services.len(),
            "resolved services"
        );
        Ok(services)
    }

    async fn build_service(
        &self,
        departure: &Departure,
        instant: DateTime<Utc>,
        kind: ServiceKind,
    ) -> StorageResult<Service> {
        let agencies = self.storage.preloaded_agencies();
        let stops = self.storage.preloaded_stops();

        let agency = match departure.agency_id.as_deref() {
            Some(id) => agencies
                .iter()
                .find(|agency| agency.agency_id.as_deref() == Some(id)),
            None => agencies.first(),
        };
        let agency_name = first_non_empty("", [agency.map(|a| a.agency_name.as_str())]);

        let stop_name = first_non_empty(
            &departure.stop_id,
            [stops
                .iter()
                .find(|stop| stop.stop_id == departure.stop_id)
                .and_then(|stop| stop.stop_name.as_deref())],
        );

        let mut destination_name = first_non_empty("", [departure.trip_headsign.as_deref()]);
        if destination_name.is_empty() {
            destination_name = self.terminal_stop_name(&departure.trip_id).await?;
        }

        let route_name = first_non_empty(
            "",
            [
                departure.route_long_name.as_deref(),
                departure.route_short_name.as_deref(),
            ],
        );

        Ok(Service {
            agency_id: departure.agency_id.clone(),
            agency_name,
            departure_at: instant,
            departure_time: departure.departure_time,
            destination_name,
            route_name,
            stop_id: departure.stop_id.clone(),
            stop_name,
            trip_id: departure.trip_id.clone(),
            kind,
        })
    }

    /// Name of the last stop a trip calls at, used when the trip carries
    /// no headsign.
    async fn terminal_stop_name(&self, trip_id: &str) -> StorageResult<String> {
        let calls = self
            .storage
            .departures_for_trip(trip_id, ComparisonMode::Exact)
            .await?;
        let Some(terminal) = calls.last() else {
            return Ok(String::new());
        };
        Ok(first_non_empty(
            "",
            [self
                .storage
                .preloaded_stops()
                .iter()
                .find(|stop| stop.stop_id == terminal.stop_id)
                .and_then(|stop| stop.stop_name.as_deref())],
        ))
    }
}

/// Returns the first candidate that is present and non-empty after
/// trimming, else the default. Display fields routinely have several
/// sources of decreasing preference.
pub fn first_non_empty<'a, I>(default: &str, candidates: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for candidate in candidates.into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    default.to_string()
}
