//! Tracing initialization.
//! Builds a subscriber with an `EnvFilter`, compact or JSON formatting on
//! stderr, and an optional non-blocking file layer.
//!
//! Stdout is left to the command reports so `--json` output stays clean.
//! `DIRTIDY_LOG` overrides the level chosen on the command line.

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use std::fmt as stdfmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, registry};

/// Environment variable that overrides `--log-level`.
pub const LOG_ENV_VAR: &str = "DIRTIDY_LOG";

/// Verbosity levels exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings and errors (default)
    #[default]
    Normal,
    /// Per-file progress
    Info,
    /// Everything, including duplicate resolution details
    Debug,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "trace",
        }
    }
}

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_level(true)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    if json {
        layer.json().boxed()
    } else {
        layer.compact().boxed()
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(level.directive()))
}

/// Initialize tracing. Returns a `WorkerGuard` when a file layer was added;
/// it must be held until exit so buffered lines are flushed.
pub fn init_tracing(
    level: LogLevel,
    log_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(std::io::stderr, json, true)];
    let mut guard = None;

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        let (writer, file_guard) = tracing_appender::non_blocking(file);
        layers.push(fmt_layer(writer, json, false));
        guard = Some(file_guard);
    }

    registry()
        .with(layers)
        .with(env_filter(level))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_to_filter_directives() {
        assert_eq!(LogLevel::Quiet.directive(), "error");
        assert_eq!(LogLevel::Normal.directive(), "warn");
        assert_eq!(LogLevel::Info.directive(), "info");
        assert_eq!(LogLevel::Debug.directive(), "trace");
    }

    #[test]
    fn test_default_level_is_normal() {
        assert_eq!(LogLevel::default(), LogLevel::Normal);
    }
}
