//! Results directory layout and bootstrap.

use std::path::{Path, PathBuf};

use crate::{CoreError, RunEnvironment};

/// Default results root inside a capsule container.
pub const DEFAULT_RESULTS_DIR: &str = "/results";

/// Paths of everything the capsule writes, relative to one results root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    root: PathBuf,
}

impl Default for ResultsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_DIR)
    }
}

impl ResultsLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Output artifact path for a session.
    ///
    /// Format: `<root>/outputs/<session_id>[_<job_prefix>].<ext>`
    #[must_use]
    pub fn artifact_path(&self, session_id: &str, env: &RunEnvironment, ext: &str) -> PathBuf {
        let suffix = env
            .job_prefix()
            .map(|prefix| format!("_{prefix}"))
            .unwrap_or_default();
        self.outputs_dir().join(format!("{session_id}{suffix}.{ext}"))
    }

    /// Per-instance log file for pipeline runs.
    ///
    /// The timestamp keeps file names unique when logs from all pipeline
    /// instances are collected into one directory. Returns `None` outside
    /// pipeline mode.
    #[must_use]
    pub fn log_file_path(&self, env: &RunEnvironment, unix_secs: i64) -> Option<PathBuf> {
        env.batch_job_id()
            .map(|job_id| self.logs_dir().join(format!("{job_id}_{unix_secs}.log")))
    }
}

/// Make sure each directory exists and is non-empty.
///
/// Pipelines can crash when an expected results folder is missing or empty,
/// so in pipeline mode an empty directory gets a uniquely named placeholder
/// file. Outside pipeline mode this is a no-op. Calling it repeatedly never
/// adds a second placeholder.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if a directory cannot be created or listed, or a
/// placeholder cannot be written.
pub fn ensure_nonempty_results_dirs<I, P>(dirs: I, env: &RunEnvironment) -> Result<(), CoreError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    if !env.is_pipeline() {
        return Ok(());
    }

    for dir in dirs {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;

        let mut entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
        if entries.next().is_some() {
            continue;
        }

        let path = dir.join(random_hex_name()?);
        tracing::info!(
            path = %path.display(),
            "creating placeholder so results folder is not empty"
        );
        std::fs::File::create(&path).map_err(|e| CoreError::io(&path, e))?;
    }

    Ok(())
}

fn random_hex_name() -> Result<String, CoreError> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| CoreError::Random(e.to_string()))?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
