//! # capsule-config
//!
//! Run parameters for the session units capsule and the layered resolution
//! that produces them.
//!
//! Parameter sources (per field, first source defining it wins):
//! 1. Explicit overrides given to [`CapsuleParameters::construct`]
//! 2. The `*_input_parameters*.json` file in the parameters directory
//! 3. Command-line flags (`--session_id`, `--area`, `--n_units`,
//!    `--logging_level`, `--test`)
//!
//! Anything still unset takes its schema default, or fails with a
//! [`ValidationError`] when the field is required.
//!
//! # Usage
//!
//! ```no_run
//! use capsule_config::CapsuleParameters;
//! use serde_json::json;
//!
//! // Pin the session, take everything else from JSON/CLI:
//! let params = CapsuleParameters::construct(&json!({"session_id": "620263_2022-07-26"}))
//!     .expect("parameters");
//! println!("sampling {} units from {}", params.n_units(), params.area());
//! ```

mod error;
mod level;
mod parameters;
pub mod resolver;
mod settings;
pub mod sources;

pub use error::{ParamsError, ValidationError};
pub use level::LoggingLevel;
pub use parameters::{CapsuleParameters, FIELD_NAMES};
pub use resolver::{ParameterResolver, resolve};
pub use settings::{
    CapsuleSettings, DEFAULT_PARAMETERS_DIR, DEFAULT_PARAMETERS_PATTERN, SettingsError,
};
pub use sources::{CliParameters, ParameterSource, find_parameters_file};
