//! Detection of the execution context the capsule runs in.
//!
//! A capsule runs either standalone (locally or as an interactive capsule) or
//! as one step of an automated pipeline. Pipeline mode is signalled by the
//! batch scheduler exporting a job identifier.

/// Environment variable holding the batch job id in pipeline runs.
pub const BATCH_JOB_ID_VAR: &str = "AWS_BATCH_JOB_ID";

/// Environment variable holding the computation id of the hosting capsule.
pub const COMPUTATION_ID_VAR: &str = "CO_COMPUTATION_ID";

/// Snapshot of the job identifiers visible to this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEnvironment {
    batch_job_id: Option<String>,
    computation_id: Option<String>,
}

impl RunEnvironment {
    /// Read identifiers from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            batch_job_id: non_empty_var(BATCH_JOB_ID_VAR),
            computation_id: non_empty_var(COMPUTATION_ID_VAR),
        }
    }

    /// A standalone run: no job identifiers at all.
    #[must_use]
    pub const fn standalone() -> Self {
        Self {
            batch_job_id: None,
            computation_id: None,
        }
    }

    /// A pipeline run with the given batch job id.
    #[must_use]
    pub fn pipeline(batch_job_id: impl Into<String>) -> Self {
        Self {
            batch_job_id: Some(batch_job_id.into()).filter(|id| !id.is_empty()),
            computation_id: None,
        }
    }

    #[must_use]
    pub fn with_computation_id(mut self, computation_id: impl Into<String>) -> Self {
        self.computation_id = Some(computation_id.into()).filter(|id| !id.is_empty());
        self
    }

    /// Whether the capsule is running as a pipeline step.
    #[must_use]
    pub const fn is_pipeline(&self) -> bool {
        self.batch_job_id.is_some()
    }

    #[must_use]
    pub fn batch_job_id(&self) -> Option<&str> {
        self.batch_job_id.as_deref()
    }

    #[must_use]
    pub fn computation_id(&self) -> Option<&str> {
        self.computation_id.as_deref()
    }

    /// Short job prefix: the batch job id up to its first `-`.
    ///
    /// Used to namespace output files and log lines so that parallel pipeline
    /// instances never collide.
    #[must_use]
    pub fn job_prefix(&self) -> Option<&str> {
        self.batch_job_id
            .as_deref()
            .and_then(|id| id.split('-').next())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_is_not_pipeline() {
        let env = RunEnvironment::standalone();
        assert!(!env.is_pipeline());
        assert_eq!(env.job_prefix(), None);
    }

    #[test]
    fn job_prefix_stops_at_first_dash() {
        let env = RunEnvironment::pipeline("8f1c2d3e-aaaa-bbbb-cccc-0123456789ab");
        assert!(env.is_pipeline());
        assert_eq!(env.job_prefix(), Some("8f1c2d3e"));
    }

    #[test]
    fn job_prefix_without_dash_is_whole_id() {
        let env = RunEnvironment::pipeline("job42");
        assert_eq!(env.job_prefix(), Some("job42"));
    }

    #[test]
    fn empty_job_id_means_standalone() {
        let env = RunEnvironment::pipeline("");
        assert!(!env.is_pipeline());
    }

    #[test]
    fn computation_id_does_not_imply_pipeline() {
        let env = RunEnvironment::standalone().with_computation_id("c0ffee");
        assert_eq!(env.computation_id(), Some("c0ffee"));
        assert!(!env.is_pipeline());
    }
}
