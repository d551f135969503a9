use gtfs_departures_model::GtfsParseError;

#[derive(Debug, thiserror::Error)]
pub enum DeparturesError {
    /// An I/O or query failure in the backend, propagated unmodified.
    #[error("storage backend error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("unknown comparison mode: {0}")]
    UnknownComparisonMode(String),

    #[error(transparent)]
    Parse(#[from] GtfsParseError),
}

impl DeparturesError {
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::Storage(err.into())
    }
}
