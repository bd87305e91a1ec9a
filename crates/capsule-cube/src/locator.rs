//! Data root and datacube directory discovery.
//!
//! Lookups are cached on the locator instance, so each one touches the
//! filesystem at most once per locator. Tests inject their own candidate
//! roots instead of relying on process-wide state.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ignore::WalkBuilder;

use crate::CubeError;

/// Prefix of attached datacube asset directories.
const DATACUBE_PREFIX: &str = "dynamicrouting_datacube";

/// Entry names indicating the data root itself holds datacube content.
const DATACUBE_MARKERS: &[&str] = &["session_table", "nwb", "consolidated"];

#[derive(Debug)]
pub struct DatacubeLocator {
    candidates: Vec<PathBuf>,
    data_root: OnceLock<PathBuf>,
    datacube_dir: OnceLock<PathBuf>,
    nwb_paths: OnceLock<Vec<PathBuf>>,
}

impl DatacubeLocator {
    /// Locator checking `candidates` in order for the data root.
    #[must_use]
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            data_root: OnceLock::new(),
            datacube_dir: OnceLock::new(),
            nwb_paths: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate root that exists.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::DataRootNotFound`] if no candidate exists.
    pub fn data_root(&self) -> Result<&Path, CubeError> {
        cached(&self.data_root, || {
            let root = self
                .candidates
                .iter()
                .find(|p| p.exists())
                .cloned()
                .ok_or_else(|| CubeError::DataRootNotFound {
                    candidates: self.candidates.clone(),
                })?;
            tracing::debug!(data_root = %root.display(), "using data root");
            Ok(root)
        })
        .map(PathBuf::as_path)
    }

    /// Directory holding the datacube.
    ///
    /// When several datacube assets are attached, the one sorting last by
    /// name (the latest) is used. Without any asset directory, the data root
    /// itself is used if it visibly contains datacube content.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::DatacubeNotFound`] if neither applies, or an
    /// error from [`DatacubeLocator::data_root`].
    pub fn datacube_dir(&self) -> Result<&Path, CubeError> {
        cached(&self.datacube_dir, || {
            let root = self.data_root()?;
            let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
                .map_err(|source| CubeError::Io {
                    path: root.to_path_buf(),
                    source,
                })?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .collect();
            entries.sort();
            entries.reverse();

            let path = if let Some(asset) = entries
                .iter()
                .find(|p| p.is_dir() && file_name(p).starts_with(DATACUBE_PREFIX))
            {
                asset.clone()
            } else if entries.iter().any(|p| {
                let name = file_name(p);
                DATACUBE_MARKERS.iter().any(|marker| name.contains(marker))
            }) {
                root.to_path_buf()
            } else {
                return Err(CubeError::DatacubeNotFound {
                    root: root.to_path_buf(),
                    entries: entries.iter().map(|p| file_name(p).into_owned()).collect(),
                });
            };

            tracing::debug!(datacube_dir = %path.display(), "using files in datacube dir");
            Ok(path)
        })
        .map(PathBuf::as_path)
    }

    /// Parquet file of a consolidated component (e.g. `units`).
    ///
    /// # Errors
    ///
    /// See [`DatacubeLocator::datacube_dir`].
    pub fn component_path(&self, component: &str) -> Result<PathBuf, CubeError> {
        Ok(self
            .datacube_dir()?
            .join("consolidated")
            .join(format!("{component}.parquet")))
    }

    /// All `*.nwb` entries anywhere under the data root, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::Walk`] if the directory walk fails, or an error
    /// from [`DatacubeLocator::data_root`].
    pub fn nwb_paths(&self) -> Result<&[PathBuf], CubeError> {
        cached(&self.nwb_paths, || {
            let root = self.data_root()?;
            let mut paths = Vec::new();
            for entry in WalkBuilder::new(root).standard_filters(false).build() {
                let entry = entry?;
                if entry.path().extension().is_some_and(|ext| ext == "nwb") {
                    paths.push(entry.into_path());
                }
            }
            paths.sort();
            Ok(paths)
        })
        .map(Vec::as_slice)
    }
}

fn cached<T>(
    cell: &OnceLock<T>,
    init: impl FnOnce() -> Result<T, CubeError>,
) -> Result<&T, CubeError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
}
