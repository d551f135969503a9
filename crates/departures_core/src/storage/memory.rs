use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use gtfs_departures_model::{
    Agency, CalendarDate, Departure, LocationType, PickupType, Stop, WheelchairBoarding,
};

use super::{AgencyAttribute, ComparisonMode, GtfsStorage, StopAttribute, StorageResult};

#[derive(Debug, Default)]
struct Tables {
    agencies: Vec<Agency>,
    calendar_dates: Vec<CalendarDate>,
    stops: Vec<Stop>,
    departures: Vec<Departure>,
}

/// In-memory reference backend.
///
/// Serves as the executable definition of the contract semantics
/// (ordering, pickup exclusion, comparison-mode matching) and as the
/// backend for the test suite. Tables sit behind a shared lock so a test
/// can mutate them after a preload snapshot has been taken.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_agencies(&self, agencies: Vec<Agency>) {
        self.write().agencies = agencies;
    }

    pub fn set_calendar_dates(&self, calendar_dates: Vec<CalendarDate>) {
        self.write().calendar_dates = calendar_dates;
    }

    pub fn set_stops(&self, stops: Vec<Stop>) {
        self.write().stops = stops;
    }

    pub fn set_departures(&self, departures: Vec<Departure>) {
        self.write().departures = departures;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("storage tables lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("storage tables lock poisoned")
    }

    fn filtered_departures<F>(&self, id_matches: F) -> Vec<Departure>
    where
        F: Fn(&Departure) -> bool,
    {
        let mut rows: Vec<Departure> = self
            .read()
            .departures
            .iter()
            .filter(|row| row.pickup_type != PickupType::NoPickup)
            .filter(|row| id_matches(row))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.departure_time);
        rows
    }
}

fn agency_field(agency: &Agency, attribute: AgencyAttribute) -> Option<&str> {
    match attribute {
        AgencyAttribute::Id => agency.agency_id.as_deref(),
        AgencyAttribute::Name => Some(&agency.agency_name),
        AgencyAttribute::Url => Some(&agency.agency_url),
        AgencyAttribute::Timezone => Some(&agency.agency_timezone),
        AgencyAttribute::LanguageCode => agency.agency_lang.as_deref(),
        AgencyAttribute::Phone => agency.agency_phone.as_deref(),
        AgencyAttribute::FareUrl => agency.agency_fare_url.as_deref(),
        AgencyAttribute::Email => agency.agency_email.as_deref(),
    }
}

fn stop_field(stop: &Stop, attribute: StopAttribute) -> Option<&str> {
    match attribute {
        StopAttribute::Id => Some(&stop.stop_id),
        StopAttribute::Code => stop.stop_code.as_deref(),
        StopAttribute::Name => stop.stop_name.as_deref(),
        StopAttribute::Description => stop.stop_desc.as_deref(),
        StopAttribute::Url => stop.stop_url.as_deref(),
        StopAttribute::Timezone => stop.stop_timezone.as_deref(),
        StopAttribute::Zone => stop.zone_id.as_deref(),
        StopAttribute::LevelId => stop.level_id.as_deref(),
        StopAttribute::PlatformCode => stop.platform_code.as_deref(),
        StopAttribute::ParentStation => stop.parent_station.as_deref(),
    }
}

const AGENCY_ATTRIBUTES: [AgencyAttribute; 8] = [
    AgencyAttribute::Id,
    AgencyAttribute::Name,
    AgencyAttribute::Url,
    AgencyAttribute::Timezone,
    AgencyAttribute::LanguageCode,
    AgencyAttribute::Phone,
    AgencyAttribute::FareUrl,
    AgencyAttribute::Email,
];

const STOP_ATTRIBUTES: [StopAttribute; 10] = [
    StopAttribute::Id,
    StopAttribute::Code,
    StopAttribute::Name,
    StopAttribute::Description,
    StopAttribute::Url,
    StopAttribute::Timezone,
    StopAttribute::Zone,
    StopAttribute::LevelId,
    StopAttribute::PlatformCode,
    StopAttribute::ParentStation,
];

#[async_trait]
impl GtfsStorage for MemoryStorage {
    async fn agencies(&self) -> StorageResult<Vec<Agency>> {
        Ok(self.read().agencies.clone())
    }

    async fn calendar_dates(&self) -> StorageResult<Vec<CalendarDate>> {
        Ok(self.read().calendar_dates.clone())
    }

    async fn stops(&self) -> StorageResult<Vec<Stop>> {
        Ok(self.read().stops.clone())
    }

    async fn agencies_by(
        &self,
        attribute: AgencyAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>> {
        Ok(self
            .read()
            .agencies
            .iter()
            .filter(|agency| {
                agency_field(agency, attribute)
                    .is_some_and(|field| comparison.matches(field, value))
            })
            .cloned()
            .collect())
    }

    async fn agencies_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>> {
        Ok(self
            .read()
            .agencies
            .iter()
            .filter(|agency| {
                AGENCY_ATTRIBUTES.iter().any(|attribute| {
                    agency_field(agency, *attribute)
                        .is_some_and(|field| comparison.matches(field, value))
                })
            })
            .cloned()
            .collect())
    }

    async fn stops_by(
        &self,
        attribute: StopAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>> {
        Ok(self
            .read()
            .stops
            .iter()
            .filter(|stop| {
                stop_field(stop, attribute).is_some_and(|field| comparison.matches(field, value))
            })
            .cloned()
            .collect())
    }

    async fn stops_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>> {
        Ok(self
            .read()
            .stops
            .iter()
            .filter(|stop| {
                STOP_ATTRIBUTES.iter().any(|attribute| {
                    stop_field(stop, *attribute)
                        .is_some_and(|field| comparison.matches(field, value))
                })
            })
            .cloned()
            .collect())
    }

    async fn stops_by_location_type(
        &self,
        location_type: LocationType,
    ) -> StorageResult<Vec<Stop>> {
        Ok(self
            .read()
            .stops
            .iter()
            .filter(|stop| stop.location_type == location_type)
            .cloned()
            .collect())
    }

    async fn stops_by_wheelchair_boarding(
        &self,
        wheelchair_boarding: WheelchairBoarding,
    ) -> StorageResult<Vec<Stop>> {
        Ok(self
            .read()
            .stops
            .iter()
            .filter(|stop| stop.wheelchair_boarding == wheelchair_boarding)
            .cloned()
            .collect())
    }

    async fn stops_in_area(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> StorageResult<Vec<Stop>> {
        Ok(self
            .read()
            .stops
            .iter()
            .filter(|stop| {
                stop.stop_lon >= min_lon
                    && stop.stop_lon <= max_lon
                    && stop.stop_lat >= min_lat
                    && stop.stop_lat <= max_lat
            })
            .cloned()
            .collect())
    }

    async fn departures_for_stop(
        &self,
        stop_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>> {
        Ok(self.filtered_departures(|row| comparison.matches(&row.stop_id, stop_id)))
    }

    async fn departures_for_trip(
        &self,
        trip_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>> {
        Ok(self.filtered_departures(|row| comparison.matches(&row.trip_id, trip_id)))
    }
}
