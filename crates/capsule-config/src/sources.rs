//! Parameter sources.
//!
//! Each source is a figment [`Provider`] yielding a flat dictionary keyed by
//! parameter field name. A source only contains the fields it actually
//! defines: absent CLI flags and JSON `null`s contribute nothing, so a lower
//! priority source can still fill them in.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::builder::BoolishValueParser;
use figment::providers::Serialized;
use figment::value::{Dict, Map};
use figment::{Metadata, Profile, Provider};
use globset::Glob;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::ParamsError;

/// Command-line surface: one optional flag per parameter field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser, Serialize)]
#[command(
    name = "run-capsule",
    version,
    about = "Plot sampled unit activity drift for one session and brain area"
)]
pub struct CliParameters {
    /// Session to process
    #[arg(long = "session_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Brain area (structure) to filter units by
    #[arg(long = "area")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    /// Number of units to sample
    #[arg(long = "n_units")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_units: Option<usize>,

    /// Level name (DEBUG, INFO, ...) or numeric severity
    #[arg(long = "logging_level")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging_level: Option<String>,

    /// Run in fast test mode (`--test` alone means true)
    #[arg(
        long = "test",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
}

/// One place parameter values can come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSource {
    /// Values passed programmatically at construction time.
    Explicit(JsonMap<String, JsonValue>),

    /// Top-level keys of a JSON parameters file.
    JsonFile {
        path: PathBuf,
        values: JsonMap<String, JsonValue>,
    },

    /// Parsed command-line flags.
    CommandLine(CliParameters),
}

impl ParameterSource {
    /// Explicit overrides from any value serializing to a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::InvalidOverrides`] if `overrides` does not
    /// serialize to a JSON object.
    pub fn explicit<T: Serialize + ?Sized>(overrides: &T) -> Result<Self, ParamsError> {
        match serde_json::to_value(overrides) {
            Ok(JsonValue::Object(map)) => Ok(Self::Explicit(defined(map))),
            Ok(JsonValue::Null) => Ok(Self::Explicit(JsonMap::new())),
            Ok(other) => Err(ParamsError::InvalidOverrides(format!(
                "got {}",
                json_kind(&other)
            ))),
            Err(error) => Err(ParamsError::InvalidOverrides(error.to_string())),
        }
    }

    /// Read a JSON parameters file.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::ConfigFile`] if the file cannot be read, is not
    /// valid JSON, or its top level is not an object.
    pub fn json_file(path: impl Into<PathBuf>) -> Result<Self, ParamsError> {
        let path = path.into();
        let config_error = |reason: String| ParamsError::ConfigFile {
            path: path.clone(),
            reason,
        };

        let text = std::fs::read_to_string(&path).map_err(|e| config_error(e.to_string()))?;
        let value: JsonValue =
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        let JsonValue::Object(values) = value else {
            return Err(config_error(format!(
                "expected a JSON object at the top level, got {}",
                json_kind(&value)
            )));
        };

        Ok(Self::JsonFile {
            values: defined(values),
            path,
        })
    }

    /// Parse command-line arguments (including the program name).
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::CliParse`] for unknown flags, missing flag
    /// values, values of the wrong type, and `--help`/`--version` requests.
    pub fn command_line<I, T>(args: I) -> Result<Self, ParamsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::CommandLine(CliParameters::try_parse_from(args)?))
    }

    /// Human-readable source name used in error messages.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Explicit(_) => String::from("explicit overrides"),
            Self::JsonFile { path, .. } => format!("JSON file {}", path.display()),
            Self::CommandLine(_) => String::from("command line"),
        }
    }

    /// Whether this source defines a value for `field`.
    #[must_use]
    pub fn defines(&self, field: &str) -> bool {
        match self {
            Self::Explicit(values) | Self::JsonFile { values, .. } => values.contains_key(field),
            Self::CommandLine(cli) => match field {
                "session_id" => cli.session_id.is_some(),
                "area" => cli.area.is_some(),
                "n_units" => cli.n_units.is_some(),
                "logging_level" => cli.logging_level.is_some(),
                "test" => cli.test.is_some(),
                _ => false,
            },
        }
    }
}

impl Provider for ParameterSource {
    fn metadata(&self) -> Metadata {
        Metadata::named(self.name())
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        match self {
            Self::Explicit(values) | Self::JsonFile { values, .. } => {
                Serialized::defaults(coerced(values)).data()
            }
            Self::CommandLine(cli) => Serialized::defaults(cli).data(),
        }
    }
}

/// Locate the parameters file: the first entry of `dir` (sorted by file
/// name) whose name matches `pattern`.
///
/// A missing directory or no match yields `Ok(None)`; the file source is
/// then simply empty.
///
/// # Errors
///
/// Returns [`ParamsError::InvalidPattern`] if `pattern` is not a valid glob.
pub fn find_parameters_file(dir: &Path, pattern: &str) -> Result<Option<PathBuf>, ParamsError> {
    let matcher = Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| ParamsError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "parameters directory not readable; no file source");
        return Ok(None);
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().is_some_and(|name| matcher.is_match(name)))
        .collect();
    matches.sort();

    let mut matches = matches.into_iter();
    let chosen = matches.next();
    let ignored: Vec<String> = matches.map(|p| p.display().to_string()).collect();
    if let Some(path) = &chosen {
        if ignored.is_empty() {
            tracing::debug!(path = %path.display(), "using parameters file");
        } else {
            tracing::warn!(
                path = %path.display(),
                ignored = ?ignored,
                "multiple parameters files matched; using the first"
            );
        }
    }

    Ok(chosen)
}

/// Drop `null`s: they do not count as a defined value.
fn defined(values: JsonMap<String, JsonValue>) -> JsonMap<String, JsonValue> {
    values.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

/// Lax conversion of `n_units` and `test` to their declared types.
///
/// Values that do not convert are passed through unchanged and fail
/// extraction with the field named. Strings are never produced from numbers.
fn coerced(values: &JsonMap<String, JsonValue>) -> JsonMap<String, JsonValue> {
    values
        .iter()
        .map(|(key, value)| {
            let converted = match key.as_str() {
                "n_units" => coerce_count(value),
                "test" => coerce_flag(value),
                _ => None,
            };
            (key.clone(), converted.unwrap_or_else(|| value.clone()))
        })
        .collect()
}

/// `"50"` and `50.0` to `50`. Negative values stay negative so the
/// unsigned field rejects them.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn coerce_count(value: &JsonValue) -> Option<JsonValue> {
    match value {
        JsonValue::String(text) => text.trim().parse::<i64>().ok().map(JsonValue::from),
        JsonValue::Number(number) if number.is_f64() => {
            let float = number.as_f64()?;
            let integral = float.is_finite()
                && float.fract() == 0.0
                && float.abs() < 9_007_199_254_740_992.0;
            integral.then(|| JsonValue::from(float as i64))
        }
        _ => None,
    }
}

fn coerce_flag(value: &JsonValue) -> Option<JsonValue> {
    let flag = match value {
        JsonValue::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => true,
            "false" | "f" | "no" | "n" | "off" | "0" => false,
            _ => return None,
        },
        JsonValue::Number(number) => match number.as_u64() {
            Some(1) => true,
            Some(0) => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(JsonValue::Bool(flag))
}

const fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn clap_command_is_valid() {
        CliParameters::command().debug_assert();
    }

    #[test]
    fn flags_use_field_names() {
        let cli = CliParameters::try_parse_from([
            "run-capsule",
            "--session_id",
            "S2",
            "--area",
            "VISp",
            "--n_units",
            "5",
            "--logging_level",
            "DEBUG",
        ])
        .expect("cli should parse");

        assert_eq!(cli.session_id.as_deref(), Some("S2"));
        assert_eq!(cli.area.as_deref(), Some("VISp"));
        assert_eq!(cli.n_units, Some(5));
        assert_eq!(cli.logging_level.as_deref(), Some("DEBUG"));
        assert_eq!(cli.test, None);
    }

    #[test]
    fn bare_test_flag_means_true() {
        let cli = CliParameters::try_parse_from(["run-capsule", "--test"]).unwrap();
        assert_eq!(cli.test, Some(true));

        let cli = CliParameters::try_parse_from(["run-capsule", "--test", "false"]).unwrap();
        assert_eq!(cli.test, Some(false));

        let cli =
            CliParameters::try_parse_from(["run-capsule", "--test", "--n_units", "3"]).unwrap();
        assert_eq!(cli.test, Some(true));
        assert_eq!(cli.n_units, Some(3));
    }

    #[test]
    fn test_flag_accepts_yes_no_and_digits() {
        let cli = CliParameters::try_parse_from(["run-capsule", "--test", "yes"]).unwrap();
        assert_eq!(cli.test, Some(true));

        let cli = CliParameters::try_parse_from(["run-capsule", "--test", "0"]).unwrap();
        assert_eq!(cli.test, Some(false));

        assert!(CliParameters::try_parse_from(["run-capsule", "--test", "maybe"]).is_err());
    }

    #[test]
    fn coercion_leaves_other_fields_alone() {
        let values = json!({"session_id": "0001", "area": "MOp", "n_units": "12", "test": "no"});
        let JsonValue::Object(values) = values else {
            unreachable!()
        };

        assert_eq!(
            JsonValue::Object(coerced(&values)),
            json!({"session_id": "0001", "area": "MOp", "n_units": 12, "test": false})
        );
    }

    #[test]
    fn uncoercible_values_pass_through() {
        assert_eq!(coerce_count(&json!("fifty")), None);
        assert_eq!(coerce_count(&json!(2.5)), None);
        assert_eq!(coerce_count(&json!("-3")), Some(json!(-3)));
        assert_eq!(coerce_flag(&json!(2)), None);
        assert_eq!(coerce_flag(&json!("maybe")), None);
    }

    #[test]
    fn wrong_type_is_cli_parse_error() {
        let result = ParameterSource::command_line(["run-capsule", "--n_units", "many"]);
        assert!(matches!(result, Err(ParamsError::CliParse(_))));
    }

    #[test]
    fn unknown_flag_is_cli_parse_error() {
        let result = ParameterSource::command_line(["run-capsule", "--sesion_id", "S1"]);
        assert!(matches!(result, Err(ParamsError::CliParse(_))));
    }

    #[test]
    fn help_is_informational() {
        let error = ParameterSource::command_line(["run-capsule", "--help"]).unwrap_err();
        assert!(error.is_informational());

        let error = ParameterSource::command_line(["run-capsule", "--bogus"]).unwrap_err();
        assert!(!error.is_informational());
    }

    #[test]
    fn absent_flags_are_not_serialized() {
        let cli = CliParameters {
            area: Some("MOp".into()),
            ..CliParameters::default()
        };
        assert_eq!(serde_json::to_value(&cli).unwrap(), json!({"area": "MOp"}));
    }

    #[test]
    fn explicit_drops_nulls() {
        let source = ParameterSource::explicit(&json!({"session_id": "S1", "area": null}))
            .expect("object overrides");
        assert!(source.defines("session_id"));
        assert!(!source.defines("area"));
    }

    #[test]
    fn explicit_rejects_non_objects() {
        let result = ParameterSource::explicit(&json!(["S1"]));
        assert!(matches!(result, Err(ParamsError::InvalidOverrides(_))));
    }

    #[test]
    fn json_file_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x_input_parameters.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result = ParameterSource::json_file(&path);
        assert!(matches!(result, Err(ParamsError::ConfigFile { .. })));
    }

    #[test]
    fn json_file_rejects_malformed_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x_input_parameters.json");
        std::fs::write(&path, "{\"session_id\": ").unwrap();

        let result = ParameterSource::json_file(&path);
        assert!(matches!(result, Err(ParamsError::ConfigFile { .. })));
    }

    #[test]
    fn find_returns_none_for_missing_dir() {
        let temp = TempDir::new().unwrap();
        let found = find_parameters_file(&temp.path().join("absent"), "*_input_parameters*.json")
            .expect("missing dir is not an error");
        assert!(found.is_none());
    }

    #[test]
    fn find_ignores_non_matching_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("parameters.json"), "{}").unwrap();
        std::fs::write(temp.path().join("run_input_parameters.txt"), "{}").unwrap();

        let found = find_parameters_file(temp.path(), "*_input_parameters*.json").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn find_picks_first_sorted_match() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b_input_parameters.json"), "{}").unwrap();
        std::fs::write(temp.path().join("a_input_parameters_v2.json"), "{}").unwrap();

        let found = find_parameters_file(temp.path(), "*_input_parameters*.json").unwrap();
        assert_eq!(
            found,
            Some(temp.path().join("a_input_parameters_v2.json"))
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let temp = TempDir::new().unwrap();
        let result = find_parameters_file(temp.path(), "[unclosed");
        assert!(matches!(result, Err(ParamsError::InvalidPattern { .. })));
    }
}
