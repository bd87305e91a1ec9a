//! Logging setup for local, capsule and pipeline runs.
//!
//! - Events at INFO and above go to stdout, which the capsule host captures.
//! - In pipeline mode every instance also writes its own log file under
//!   `<results>/logs/<job_id>_<unix_secs>.log`, so logs from parallel
//!   instances can be collected and read separately.
//! - Outside pipeline mode a file can still be requested explicitly.
//!
//! The level filter sits behind a reload layer: logging starts before run
//! parameters exist and is narrowed to `logging_level` once they resolve.
//! `CAPSULE_LOG` (an `EnvFilter` directive string) overrides both.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use capsule_config::LoggingLevel;
use capsule_core::{ResultsLayout, RunEnvironment};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, reload};

const LOG_ENV_VAR: &str = "CAPSULE_LOG";

/// Log timestamps are written in the lab's local (Seattle) time.
const LOG_TIME_ZONE: chrono_tz::Tz = chrono_tz::US::Pacific;

/// Handle for adjusting the level after initialization.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
    file: Option<PathBuf>,
}

impl LogHandle {
    /// Apply the resolved `logging_level`, unless `CAPSULE_LOG` is set.
    pub fn set_level(&self, level: &LoggingLevel) -> anyhow::Result<()> {
        if self.env_override {
            return Ok(());
        }
        self.filter
            .reload(EnvFilter::new(level.level_filter().to_string()))
            .context("failed to update log level")
    }

    /// Log file receiving a copy of all events, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Install the global subscriber.
pub fn init(
    env: &RunEnvironment,
    layout: &ResultsLayout,
    filepath: Option<&Path>,
) -> anyhow::Result<LogHandle> {
    let (initial, env_override) = match EnvFilter::try_from_env(LOG_ENV_VAR) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new("info"), false),
    };
    let (filter, handle) = reload::Layer::new(initial);

    let format = LineFormat {
        job_prefix: env.job_prefix().map(str::to_string),
    };

    let file = filepath.map(Path::to_path_buf).or_else(|| {
        layout.log_file_path(env, chrono::Utc::now().timestamp())
    });
    let file_layer = match &file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .event_format(format.clone())
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stdout),
        )
        .with(file_layer)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(LogHandle {
        filter: handle,
        env_override,
        file,
    })
}

/// `<timestamp> | <LEVEL> | [<job_prefix>.]<target> | <message>`
#[derive(Debug, Clone, Default)]
struct LineFormat {
    job_prefix: Option<String>,
}

impl LineFormat {
    fn write_prefix(
        &self,
        writer: &mut Writer<'_>,
        now: chrono::DateTime<chrono::Utc>,
        level: &tracing::Level,
        target: &str,
    ) -> fmt::Result {
        write!(
            writer,
            "{} | {level} | ",
            now.with_timezone(&LOG_TIME_ZONE).format("%Y-%m-%d %H:%M:%S %Z")
        )?;
        if let Some(prefix) = &self.job_prefix {
            write!(writer, "{prefix}.")?;
        }
        write!(writer, "{target} | ")
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        self.write_prefix(
            &mut writer,
            chrono::Utc::now(),
            metadata.level(),
            metadata.target(),
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
