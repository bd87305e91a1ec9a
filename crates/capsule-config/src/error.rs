//! Parameter resolution error types.

use std::path::PathBuf;

use figment::error::Kind;
use thiserror::Error;

/// Errors raised while constructing [`crate::CapsuleParameters`].
///
/// Every variant is fatal for the run: nothing is retried and no value is
/// substituted beyond the schema defaults.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// Merged values do not form a valid parameter set.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Command-line arguments could not be parsed against the schema.
    #[error("Command-line parse error: {0}")]
    CliParse(#[from] clap::Error),

    /// The matched parameters file exists but is unusable.
    #[error("Invalid parameters file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    /// The parameters file glob pattern does not compile.
    #[error("Invalid parameters file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Explicit overrides did not serialize to a key/value mapping.
    #[error("Explicit overrides must be a mapping of field names to values: {0}")]
    InvalidOverrides(String),
}

impl ParamsError {
    /// Whether this error is a `--help`/`--version` request rather than a failure.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::CliParse(error) if !error.use_stderr())
    }
}

/// Schema violations detected after all sources were merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field received no value from any source.
    #[error("Validation error: required field '{field}' was not provided by any source")]
    Missing { field: String },

    /// A field's resolved value has the wrong type or violates a constraint.
    #[error(
        "Validation error: invalid value for '{field}'{}: {reason}",
        origin_suffix(.origin.as_deref())
    )]
    Invalid {
        field: String,
        reason: String,
        /// Name of the source that supplied the rejected value, when known.
        origin: Option<String>,
    },
}

impl ValidationError {
    /// The schema field the error refers to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => field,
        }
    }
}

fn origin_suffix(origin: Option<&str>) -> String {
    origin.map(|name| format!(" (from {name})")).unwrap_or_default()
}

impl From<figment::Error> for ValidationError {
    fn from(error: figment::Error) -> Self {
        let mut path = error.path.clone();
        match &error.kind {
            Kind::MissingField(field) => {
                path.push(field.to_string());
                Self::Missing {
                    field: path.join("."),
                }
            }
            kind => Self::Invalid {
                field: path.join("."),
                reason: kind.to_string(),
                origin: error.metadata.as_ref().map(|md| md.name.to_string()),
            },
        }
    }
}
