//! Logging level parameter.
//!
//! Accepts either a level name (`"INFO"`, `"warning"`, ...) or a numeric
//! severity on the conventional 0-50 scale. Names are stored upper-cased and
//! numeric text (`"10"`, as the command line supplies it) is stored as a
//! number, so a saved level always serializes as a name string or an integer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Names accepted for the logging level, matched case-insensitively.
const LEVEL_NAMES: &[&str] = &[
    "CRITICAL", "FATAL", "ERROR", "WARNING", "WARN", "INFO", "DEBUG", "NOTSET", "TRACE",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLevel", into = "RawLevel")]
pub enum LoggingLevel {
    /// Upper-cased level name.
    Name(String),
    /// Numeric severity (`>= 0`).
    Number(i64),
}

impl Default for LoggingLevel {
    fn default() -> Self {
        Self::Name(String::from("INFO"))
    }
}

impl LoggingLevel {
    /// The `tracing` filter equivalent to this level.
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Self::Name(name) => match name.as_str() {
                "CRITICAL" | "FATAL" | "ERROR" => LevelFilter::ERROR,
                "WARNING" | "WARN" => LevelFilter::WARN,
                "INFO" => LevelFilter::INFO,
                "DEBUG" => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            },
            Self::Number(n) => match *n {
                40.. => LevelFilter::ERROR,
                30..=39 => LevelFilter::WARN,
                20..=29 => LevelFilter::INFO,
                10..=19 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            },
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::try_from(n);
        }

        let upper = trimmed.to_ascii_uppercase();
        if LEVEL_NAMES.contains(&upper.as_str()) {
            Ok(Self::Name(upper))
        } else {
            Err(format!(
                "unknown logging level '{trimmed}' (expected one of {} or an integer >= 0)",
                LEVEL_NAMES.join(", ")
            ))
        }
    }
}

impl TryFrom<i64> for LoggingLevel {
    type Error = String;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        if n < 0 {
            Err(format!("logging level must be >= 0, got {n}"))
        } else {
            Ok(Self::Number(n))
        }
    }
}

/// Wire form: whatever the source supplied.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Number(i64),
    Name(String),
}

impl TryFrom<RawLevel> for LoggingLevel {
    type Error = String;

    fn try_from(raw: RawLevel) -> Result<Self, Self::Error> {
        match raw {
            RawLevel::Number(n) => Self::try_from(n),
            RawLevel::Name(name) => name.parse(),
        }
    }
}

impl From<LoggingLevel> for RawLevel {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Name(name) => Self::Name(name),
            LoggingLevel::Number(n) => Self::Number(n),
        }
    }
}
