//! The run parameter model.

use serde::{Deserialize, Serialize};

use crate::resolver::ParameterResolver;
use crate::{LoggingLevel, ParamsError};

/// Field names in declaration order.
pub const FIELD_NAMES: &[&str] = &["session_id", "area", "n_units", "logging_level", "test"];

/// Fully resolved parameters for one capsule run.
///
/// Built exactly once per process by the resolver and never mutated
/// afterwards: fields are private and only readable through accessors.
/// Unknown keys in any source are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleParameters {
    /// Session whose data slice is processed.
    session_id: String,

    /// Brain area (structure) to filter units by.
    area: String,

    /// Number of units to sample after filtering.
    ///
    /// Must not exceed the rows available after filtering; that is checked
    /// when the data is queried, not here.
    n_units: usize,

    #[serde(default)]
    logging_level: LoggingLevel,

    /// Fast, reduced run used to smoke-test the capsule.
    #[serde(default)]
    test: bool,
}

impl CapsuleParameters {
    /// Resolve parameters with `overrides` taking precedence over every
    /// other source.
    ///
    /// `overrides` must serialize to a mapping keyed by field name (e.g. a
    /// `serde_json::json!({...})` object). Remaining fields come from the
    /// parameters JSON file in the default location, then from the process
    /// command line.
    ///
    /// # Errors
    ///
    /// See [`ParamsError`].
    pub fn construct<T: Serialize>(overrides: &T) -> Result<Self, ParamsError> {
        ParameterResolver::new().with_overrides(overrides)?.resolve()
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    #[must_use]
    pub const fn n_units(&self) -> usize {
        self.n_units
    }

    #[must_use]
    pub const fn logging_level(&self) -> &LoggingLevel {
        &self.logging_level
    }

    #[must_use]
    pub const fn test(&self) -> bool {
        self.test
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_apply_to_optional_fields() {
        let params: CapsuleParameters = serde_json::from_value(json!({
            "session_id": "S1",
            "area": "MOp",
            "n_units": 3,
        }))
        .expect("deserialize");

        assert_eq!(params.logging_level(), &LoggingLevel::default());
        assert!(!params.test());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let params: CapsuleParameters = serde_json::from_value(json!({
            "session_id": "S1",
            "area": "MOp",
            "n_units": 3,
            "model_name": "full_model",
        }))
        .expect("extra keys should be ignored");

        assert_eq!(params.session_id(), "S1");
    }

    #[test]
    fn serialized_keys_match_field_names() {
        let params: CapsuleParameters = serde_json::from_value(json!({
            "session_id": "S1",
            "area": "MOp",
            "n_units": 3,
        }))
        .unwrap();

        let value = serde_json::to_value(&params).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected = FIELD_NAMES.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }
}
