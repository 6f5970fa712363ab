use thiserror::Error;

use crate::types::Region;

/// Failures of the extraction and persistence pipelines.
#[derive(Debug, Error)]
pub enum PanchangaError {
    #[error("unexpected field count in {region} block: expected {expected}, found {actual}")]
    UnexpectedFieldCount {
        region: Region,
        expected: usize,
        actual: usize,
    },
    #[error("region '{region}' ({}) not found on page", .region.selector().unwrap_or("no selector"))]
    RegionMissing { region: Region },
    #[error("page shows {shown} instead of the requested day {requested}")]
    DateMismatch { requested: String, shown: String },
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("persistence failure after {committed_batches} committed batch(es): {source}")]
    Persistence {
        committed_batches: usize,
        #[source]
        source: anyhow::Error,
    },
}
