//! The capability set every GTFS backend must implement.
//!
//! Concrete adapters (flat-file archive readers, database clients) live
//! outside this crate; they compile the enums below into their own query
//! plans. [`MemoryStorage`] is the reference implementation used by the
//! test suite.

use std::str::FromStr;

use async_trait::async_trait;

use gtfs_departures_model::{
    Agency, CalendarDate, Departure, LocationType, Stop, WheelchairBoarding,
};

use crate::error::DeparturesError;

mod memory;

pub use memory::MemoryStorage;

pub type StorageResult<T> = Result<T, DeparturesError>;

/// How a text predicate matches a column, always case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonMode {
    Exact,
    Starts,
    Ends,
    #[default]
    Partial,
}

impl ComparisonMode {
    /// The canonical matching semantics. SQL backends must produce the
    /// same answers from their `WHERE` clauses.
    pub fn matches(self, candidate: &str, needle: &str) -> bool {
        let candidate = candidate.to_lowercase();
        let needle = needle.to_lowercase();
        match self {
            ComparisonMode::Exact => candidate == needle,
            ComparisonMode::Starts => candidate.starts_with(&needle),
            ComparisonMode::Ends => candidate.ends_with(&needle),
            ComparisonMode::Partial => candidate.contains(&needle),
        }
    }
}

impl FromStr for ComparisonMode {
    type Err = DeparturesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ComparisonMode::Exact),
            "starts" => Ok(ComparisonMode::Starts),
            "ends" => Ok(ComparisonMode::Ends),
            "partial" => Ok(ComparisonMode::Partial),
            _ => Err(DeparturesError::UnknownComparisonMode(value.to_string())),
        }
    }
}

/// Queryable textual columns of an agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgencyAttribute {
    Id,
    Name,
    Url,
    Timezone,
    LanguageCode,
    Phone,
    FareUrl,
    Email,
}

/// Queryable textual columns of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopAttribute {
    Id,
    Code,
    Name,
    Description,
    Url,
    Timezone,
    Zone,
    LevelId,
    PlatformCode,
    ParentStation,
}

/// Static capability descriptor supplied alongside a backend instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageProperties {
    /// Whether the three preload reads may run concurrently. Single-handle
    /// embedded backends are not safe for concurrent use of one handle.
    pub supports_parallel_preload: bool,
}

/// The reads a backend must expose. Absence of data is never an error:
/// every query returns an empty ordered sequence when nothing matches.
#[async_trait]
pub trait GtfsStorage: Send + Sync {
    async fn agencies(&self) -> StorageResult<Vec<Agency>>;

    async fn calendar_dates(&self) -> StorageResult<Vec<CalendarDate>>;

    async fn stops(&self) -> StorageResult<Vec<Stop>>;

    async fn agencies_by(
        &self,
        attribute: AgencyAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>>;

    /// Free-text search across all textual agency columns.
    async fn agencies_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Agency>>;

    async fn stops_by(
        &self,
        attribute: StopAttribute,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>>;

    /// Free-text search across all textual stop columns.
    async fn stops_by_query(
        &self,
        value: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Stop>>;

    async fn stops_by_location_type(
        &self,
        location_type: LocationType,
    ) -> StorageResult<Vec<Stop>>;

    async fn stops_by_wheelchair_boarding(
        &self,
        wheelchair_boarding: WheelchairBoarding,
    ) -> StorageResult<Vec<Stop>>;

    /// Stops inside a bounding box, corners inclusive.
    async fn stops_in_area(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> StorageResult<Vec<Stop>>;

    /// Departure rows for a stop id, ordered ascending by time-of-day,
    /// with pickup-disabled rows excluded.
    async fn departures_for_stop(
        &self,
        stop_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>>;

    /// Departure rows for a trip id, same ordering and exclusions.
    async fn departures_for_trip(
        &self,
        trip_id: &str,
        comparison: ComparisonMode,
    ) -> StorageResult<Vec<Departure>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_case_insensitively() {
        assert!(ComparisonMode::Exact.matches("16TH", "16th"));
        assert!(!ComparisonMode::Exact.matches("16TH ST", "16th"));
    }

    #[test]
    fn starts_and_ends_match_affixes() {
        assert!(ComparisonMode::Starts.matches("Market Street", "market"));
        assert!(!ComparisonMode::Starts.matches("Market Street", "street"));
        assert!(ComparisonMode::Ends.matches("Market Street", "STREET"));
        assert!(!ComparisonMode::Ends.matches("Market Street", "market"));
    }

    #[test]
    fn partial_matches_substrings() {
        assert!(ComparisonMode::Partial.matches("Embarcadero Station", "cader"));
        assert!(!ComparisonMode::Partial.matches("Embarcadero Station", "castro"));
    }

    #[test]
    fn default_mode_is_partial() {
        assert_eq!(ComparisonMode::default(), ComparisonMode::Partial);
    }

    #[test]
    fn parses_mode_names_case_insensitively() {
        assert_eq!(
            "Exact".parse::<ComparisonMode>().unwrap(),
            ComparisonMode::Exact
        );
        assert_eq!(
            "STARTS".parse::<ComparisonMode>().unwrap(),
            ComparisonMode::Starts
        );
        assert_eq!(
            "ends".parse::<ComparisonMode>().unwrap(),
            ComparisonMode::Ends
        );
        assert_eq!(
            "partial".parse::<ComparisonMode>().unwrap(),
            ComparisonMode::Partial
        );
    }

    #[test]
    fn rejects_unknown_mode_names() {
        let err = "fuzzy".parse::<ComparisonMode>().unwrap_err();
        assert!(matches!(err, DeparturesError::UnknownComparisonMode(_)));
    }
}
