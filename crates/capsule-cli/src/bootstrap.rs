use anyhow::Context;
use capsule_config::{CapsuleParameters, CapsuleSettings, ParameterResolver};
use capsule_core::{ResultsLayout, RunEnvironment, ensure_nonempty_results_dirs};

pub fn load_settings() -> anyhow::Result<CapsuleSettings> {
    CapsuleSettings::load_with_dotenv().context("failed to load capsule settings")
}

/// Resolve run parameters from the parameters file and the process command
/// line. Explicit overrides are only used programmatically.
pub fn resolve_parameters(settings: &CapsuleSettings) -> anyhow::Result<CapsuleParameters> {
    Ok(ParameterResolver::from_settings(settings).resolve()?)
}

/// Results-directory bootstrap. Never fails the run: problems are logged.
pub fn finish_results(layout: &ResultsLayout, env: &RunEnvironment) {
    let dirs = [layout.root().to_path_buf(), layout.outputs_dir()];
    if let Err(error) = ensure_nonempty_results_dirs(&dirs, env) {
        tracing::warn!(%error, "failed to ensure results directories are non-empty");
    }
}
