use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use gtfs_departures_model::{
    Agency, CalendarDate, Departure, LocationType, Stop, WheelchairBoarding,
};

use crate::storage::{
    AgencyAttribute, ComparisonMode, GtfsStorage, StopAttribute, StorageProperties, StorageResult,
};

/// Wraps a backend and serves the small reference tables (agencies,
/// calendar dates, stops) from a one-shot snapshot taken at load time.
///
/// Predicate and departure reads stay on the backend, where they can use
/// its own filtering and indexing. The snapshot has no refresh mechanism;
/// a new handle means a new snapshot.
pub struct PreloadedStorage<S> {
    inner: S,
    agencies: Vec<Agency>,
    calendar_dates: Vec<CalendarDate>,
    stops: Vec<Stop>,
}

impl<S: GtfsStorage> PreloadedStorage<S> {
    /// Performs the three bulk reads, concurrently when the backend
    /// declares its preload reads safe to run in parallel. Any failure
    /// aborts the whole load; a partially populated handle is never
    /// returned.
    pub async fn load(inner: S, properties: &StorageProperties) -> StorageResult<Self> {
        let started = Instant::now();
        let (agencies, calendar_dates, stops) = if properties.supports_parallel_preload {
            tokio::try_join!(inner.agencies(), inner.calendar_dates(), inner.stops())?
        } else {
            let agencies = inner.agencies().await?;
            let calendar_dates = inner.calendar_dates().await?;
            let stops = inner.stops().await?;
            (agencies, calendar_dates, stops)
        };

        info!(
            agencies = agencies.len(),
            calendar_dates = calendar_dates.len(),
            stops = stops.len(),
            parallel = properties.supports_parallel_preload,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "preloaded reference tables"
        );

        Ok(Self {
            inner,
            agencies,
            calendar_dates,
            stops,
        })
    }

    pub fn preloaded_agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn preloaded_calendar_dates(&self) -> &[CalendarDate] {
        &self.calendar_dates
    }

    pub fn preloaded_stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: GtfsStorage> GtfsStorage for PreloadedStorage<S> {
    async fn agencies(&self) -> StorageResult<Vec<Agency>> {
        Ok(self.agencies.clone())
    }

    async fn calendar_dates(&self) -> StorageResult<Vec<CalendarDate>> {
        Ok(self.calendar_dates.clone())
    }

    async fn stops(&self) -> StorageResult<Vec<Stop>> {
        Ok(self.stops.clone())
    }

    async fn agencies_by(
        &self,
        attribute: AgencyAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>> {
        self.inner.agencies_by(attribute, value, comparison).await
    }

    async fn agencies_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>> {
        self.inner.agencies_by_query(value, comparison).await
    }

    async fn stops_by(
        &self,
        attribute: StopAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>> {
        self.inner.stops_by(attribute, value, comparison).await
    }

    async fn stops_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>> {
        self.inner.stops_by_query(value, comparison).await
    }

    async fn stops_by_location_type(
        &self,
        location_type: LocationType,
    ) -> StorageResult<Vec<Stop>> {
        self.inner.stops_by_location_type(location_type).await
    }

    async fn stops_by_wheelchair_boarding(
        &self,
        wheelchair_boarding: WheelchairBoarding,
    ) -> StorageResult<Vec<Stop>> {
        self.inner
            .stops_by_wheelchair_boarding(wheelchair_boarding)
            .await
    }

    async fn stops_in_area(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> StorageResult<Vec<Stop>> {
        self.inner
            .stops_in_area(min_lon, min_lat, max_lon, max_lat)
            .await
    }

    async fn departures_for_stop(
        &self,
        stop_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>> {
        self.inner.departures_for_stop(stop_id, comparison).await
    }

    async fn departures_for_trip(
        &self,
        trip_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>> {
        self.inner.departures_for_trip(trip_id, comparison).await
    }
}
