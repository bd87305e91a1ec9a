//! Cross-cutting error types for the capsule.
//!
//! Domain-specific errors (`ParamsError`, `CubeError`) live in their own
//! crates. `capsule-cli` converges everything into `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem operation on a results directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS random source could not produce a placeholder file name.
    #[error("failed to generate random file name: {0}")]
    Random(String),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
