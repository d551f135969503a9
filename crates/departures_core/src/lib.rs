//! Departure and service resolution for GTFS datasets.
//!
//! The core pieces are the [`GtfsStorage`] contract every backend must
//! satisfy, the [`PreloadedStorage`] wrapper that serves small reference
//! tables from memory, and the [`DepartureEngine`] that turns raw schedule
//! rows into a ranked, timezone-correct list of upcoming services.

mod error;
pub mod engine;
pub mod geo;
pub mod preload;
pub mod storage;
pub mod temporal;
pub mod timezone;

pub use engine::DepartureEngine;
pub use error::DeparturesError;
pub use preload::PreloadedStorage;
pub use storage::{
    AgencyAttribute, ComparisonMode, GtfsStorage, MemoryStorage, StopAttribute, StorageProperties,
    StorageResult,
};
pub use temporal::DayOffset;

pub use gtfs_departures_model as model;
