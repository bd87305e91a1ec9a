//! Datacube error types.

use std::path::PathBuf;

/// Errors that can occur while locating or querying datacube components.
#[derive(Debug, thiserror::Error)]
pub enum CubeError {
    /// `DuckDB` operation failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// None of the candidate data roots exists.
    #[error("data dir not present at any of {candidates:?}")]
    DataRootNotFound {
        /// Candidate roots that were checked, in order.
        candidates: Vec<PathBuf>,
    },

    /// The data root holds neither a datacube asset nor consolidated data.
    #[error("cannot determine datacube dir under {root}: found {entries:?}")]
    DatacubeNotFound {
        root: PathBuf,
        /// Entry names found in the data root.
        entries: Vec<String>,
    },

    /// The requested component has no parquet file.
    #[error("component '{component}' not found at {path}")]
    ComponentNotFound { component: String, path: PathBuf },

    /// A sample of `requested` rows cannot be drawn from `available` rows.
    #[error("cannot sample {requested} rows: {available} available after filtering")]
    SampleTooLarge { requested: usize, available: usize },

    /// I/O error while inspecting the data root.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Recursive directory walk failed.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),
}
