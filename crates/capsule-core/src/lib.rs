//! # capsule-core
//!
//! Foundational pieces shared by every capsule crate:
//! - Run environment detection (standalone vs. pipeline mode, job identifiers)
//! - The results directory layout and its bootstrap
//! - Cross-cutting error types

pub mod environment;
pub mod errors;
pub mod results;

pub use environment::RunEnvironment;
pub use errors::CoreError;
pub use results::{ResultsLayout, ensure_nonempty_results_dirs};
