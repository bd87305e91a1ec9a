use std::path::{Path, PathBuf};

use anyhow::Context;
use capsule_config::CapsuleParameters;
use capsule_core::{ResultsLayout, RunEnvironment};
use capsule_cube::Datacube;

use crate::chart::{BarChart, Encoding};

/// Upper bound on sampled units in test mode.
pub const TEST_MODE_MAX_UNITS: usize = 5;

/// Files written by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutputs {
    pub chart: PathBuf,
    pub params: PathBuf,
    pub n_units: usize,
}

/// Sample units of one session/area, plot their activity drift, and save the
/// chart together with the run parameters.
///
/// In test mode at most [`TEST_MODE_MAX_UNITS`] units are sampled, and
/// fewer when the filter leaves fewer rows.
pub fn process(
    params: &CapsuleParameters,
    cube: &Datacube,
    layout: &ResultsLayout,
    env: &RunEnvironment,
) -> anyhow::Result<ProcessOutputs> {
    tracing::info!(?params, "Processing");

    let query = cube
        .component("units")?
        .filter_eq("session_id", params.session_id())
        .filter_eq("structure", params.area());

    let n_units = if params.test() {
        let available = query.count()?;
        let n = params.n_units().min(TEST_MODE_MAX_UNITS).min(available);
        tracing::info!(n_units = n, available, "test mode: reduced sample");
        n
    } else {
        params.n_units()
    };

    let frame = query
        .sample(n_units)
        .sort_by("activity_drift")
        .select(["location", "activity_drift"])
        .collect()?;

    let chart = BarChart {
        title: format!("{} {}", params.session_id(), params.area()),
        x: Encoding::parse("location:N")?,
        y: Encoding::parse("activity_drift:Q")?,
        color: Some(Encoding::parse("activity_drift:Q")?),
    };

    let chart_path = layout.artifact_path(params.session_id(), env, "html");
    tracing::info!("Writing results to {}", chart_path.display());
    write_file(&chart_path, &chart.to_html(&frame)?)?;

    let params_path = layout.artifact_path(params.session_id(), env, "json");
    let params_json = serde_json::to_string_pretty(&capsule_config::resolver::to_json(params)?)?;
    write_file(&params_path, &params_json)?;

    Ok(ProcessOutputs {
        chart: chart_path,
        params: params_path,
        n_units: frame.len(),
    })
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
