use std::time::Instant;

use capsule_config::ParamsError;
use capsule_core::{ResultsLayout, RunEnvironment};
use capsule_cube::{Datacube, DatacubeLocator};

mod bootstrap;
mod chart;
mod logging;
mod process;

fn main() {
    if let Err(error) = run() {
        if let Some(ParamsError::CliParse(parse_error)) = error.downcast_ref::<ParamsError>() {
            // clap writes help/version to stdout and usage errors to stderr
            let _ = parse_error.print();
        } else {
            eprintln!("run-capsule error: {error:#}");
        }
        std::process::exit(exit_code(&error));
    }
}

/// Process exit status for a failed run: 0 for `--help`/`--version`, 2 for
/// command-line usage errors, 1 for everything else.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ParamsError>() {
        Some(ParamsError::CliParse(parse_error)) => parse_error.exit_code(),
        _ => 1,
    }
}

fn run() -> anyhow::Result<()> {
    let started = Instant::now();

    let settings = bootstrap::load_settings()?;
    let env = RunEnvironment::from_env();
    let layout = ResultsLayout::new(&settings.results_dir);
    let log = logging::init(&env, &layout, settings.log_file.as_deref())?;
    if let Some(path) = log.file() {
        tracing::debug!(path = %path.display(), "logging to file");
    }

    let params = bootstrap::resolve_parameters(&settings)?;
    log.set_level(params.logging_level())?;

    let cube = Datacube::open(DatacubeLocator::new(settings.data_roots.clone()))?;
    let outputs = process::process(&params, &cube, &layout, &env)?;
    tracing::debug!(?outputs, "process finished");

    bootstrap::finish_results(&layout, &env);
    tracing::info!("Time elapsed: {:.2} s", started.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use capsule_config::{ParameterSource, ValidationError};
    use capsule_cube::CubeError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::help(&["--help"], 0)]
    #[case::version(&["--version"], 0)]
    #[case::unknown_flag(&["--sesion_id", "S1"], 2)]
    #[case::bad_value(&["--n_units", "many"], 2)]
    #[case::missing_value(&["--area"], 2)]
    fn command_line_exit_codes(#[case] args: &[&str], #[case] expected: i32) {
        let argv = std::iter::once("run-capsule").chain(args.iter().copied());
        let error = ParameterSource::command_line(argv).unwrap_err();

        assert_eq!(exit_code(&anyhow::Error::from(error)), expected);
    }

    #[rstest]
    #[case::missing_field(anyhow::Error::from(ParamsError::Validation(
        ValidationError::Missing { field: "session_id".into() }
    )))]
    #[case::sample_too_large(anyhow::Error::from(CubeError::SampleTooLarge {
        requested: 50,
        available: 3,
    }))]
    #[case::plain(anyhow::anyhow!("failed to write chart"))]
    fn other_failures_exit_one(#[case] error: anyhow::Error) {
        assert_eq!(exit_code(&error), 1);
    }

    #[test]
    fn parse_errors_keep_their_code_under_context() {
        let error = ParameterSource::command_line(["run-capsule", "--bogus"]).unwrap_err();
        let error = Err::<(), _>(error)
            .context("failed to resolve parameters")
            .unwrap_err();

        assert_eq!(exit_code(&error), 2);
    }
}
