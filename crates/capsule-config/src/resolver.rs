//! Per-field source-priority resolution.
//!
//! Sources are consulted in a fixed order, highest priority first:
//! 1. Explicit overrides passed at construction
//! 2. The JSON parameters file (`*_input_parameters*.json` under the
//!    parameters directory), if one exists
//! 3. Command-line flags
//!
//! The choice is made independently for every field: overriding
//! `session_id` explicitly still lets `area` come from the JSON file and
//! `n_units` from the command line. Fields no source defines fall back to
//! schema defaults, or fail validation when they are required.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use figment::Figment;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::settings::{DEFAULT_PARAMETERS_DIR, DEFAULT_PARAMETERS_PATTERN};
use crate::sources::{ParameterSource, find_parameters_file};
use crate::{CapsuleParameters, CapsuleSettings, ParamsError, ValidationError};

/// Resolve parameters from an ordered source list (highest priority first).
///
/// Pure with respect to its input: the same sources always give the same
/// result.
///
/// # Errors
///
/// Returns [`ParamsError::Validation`] if a required field is defined by no
/// source or a value does not fit its field's type or constraints.
pub fn resolve(sources: &[ParameterSource]) -> Result<CapsuleParameters, ParamsError> {
    figment_for(sources)
        .extract::<CapsuleParameters>()
        .map_err(|error| ParamsError::Validation(ValidationError::from(error)))
}

/// Build the figment chain for `sources`.
///
/// `join` keeps values already present, so folding in priority order makes
/// the first source that defines a field win for that field.
#[must_use]
pub fn figment_for(sources: &[ParameterSource]) -> Figment {
    sources
        .iter()
        .cloned()
        .fold(Figment::new(), |figment, source| figment.join(source))
}

/// Builder assembling the standard source list.
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    overrides: Option<ParameterSource>,
    parameters_dir: PathBuf,
    parameters_pattern: String,
    args: Option<Vec<OsString>>,
}

impl Default for ParameterResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterResolver {
    /// Resolver using the default parameters location and the process
    /// command line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            overrides: None,
            parameters_dir: PathBuf::from(DEFAULT_PARAMETERS_DIR),
            parameters_pattern: String::from(DEFAULT_PARAMETERS_PATTERN),
            args: None,
        }
    }

    /// Resolver locating the parameters file through runtime settings.
    #[must_use]
    pub fn from_settings(settings: &CapsuleSettings) -> Self {
        Self::new()
            .with_parameters_dir(&settings.parameters_dir)
            .with_parameters_pattern(&settings.parameters_pattern)
    }

    /// Set explicit overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::InvalidOverrides`] if `overrides` does not
    /// serialize to a mapping.
    pub fn with_overrides<T: Serialize + ?Sized>(
        mut self,
        overrides: &T,
    ) -> Result<Self, ParamsError> {
        self.overrides = Some(ParameterSource::explicit(overrides)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_parameters_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.parameters_dir = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn with_parameters_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.parameters_pattern = pattern.into();
        self
    }

    /// Use `args` (program name first) instead of the process command line.
    #[must_use]
    pub fn with_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// The ordered source list this resolver consults.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::CliParse`] for malformed command-line input and
    /// [`ParamsError::ConfigFile`] / [`ParamsError::InvalidPattern`] for an
    /// unusable parameters file.
    pub fn sources(&self) -> Result<Vec<ParameterSource>, ParamsError> {
        let mut sources = Vec::with_capacity(3);

        sources.push(
            self.overrides
                .clone()
                .unwrap_or_else(|| ParameterSource::Explicit(serde_json::Map::new())),
        );

        if let Some(path) = find_parameters_file(&self.parameters_dir, &self.parameters_pattern)? {
            sources.push(ParameterSource::json_file(path)?);
        }

        let command_line = match &self.args {
            Some(args) => ParameterSource::command_line(args.iter().cloned())?,
            None => ParameterSource::command_line(std::env::args_os())?,
        };
        sources.push(command_line);

        Ok(sources)
    }

    /// Resolve parameters from all configured sources.
    ///
    /// # Errors
    ///
    /// See [`ParameterResolver::sources`] and [`resolve`].
    pub fn resolve(&self) -> Result<CapsuleParameters, ParamsError> {
        let sources = self.sources()?;
        for field in crate::parameters::FIELD_NAMES {
            let origin = sources
                .iter()
                .find(|source| source.defines(field))
                .map_or_else(|| String::from("default"), ParameterSource::name);
            tracing::debug!(field, origin = %origin, "resolved parameter source");
        }
        resolve(&sources)
    }
}

/// Serialize `params` back to a JSON value (e.g. to save next to outputs).
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if serialization fails.
pub fn to_json(params: &CapsuleParameters) -> Result<JsonValue, serde_json::Error> {
    serde_json::to_value(params)
}
