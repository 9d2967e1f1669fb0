//! Log output for the `gflow` binary.
//!
//! The library crates only emit `tracing` events. The binary renders them on
//! stderr, either as short terminal lines or as JSON when another process
//! collects the logs. Token values never reach a log line: credentials are
//! logged by account name only.
//!
//! Filtering is taken from `GFLOW_LOG`, then `RUST_LOG`, then the level
//! picked by [`TracingConfig`], applied to the gflow crates only so that
//! `reqwest` and `hyper` stay quiet.

use std::env;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Environment variable holding a filter directive for gflow logs.
pub const LOG_ENV: &str = "GFLOW_LOG";

/// Module path prefixes of the gflow crates.
const CRATE_TARGETS: &[&str] = &["gflow_core", "gflow_google", "gflow_cli", "gflow"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter '{directive}': {source}")]
    EnvFilter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One short line per event, no timestamp.
    Terminal,
    /// One JSON object per event, with request spans closed as they finish.
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Adds file and line to every event.
    pub include_location: bool,
    /// Filter directive that wins over the environment.
    pub env_filter: Option<String>,
}

impl TracingConfig {
    /// Interactive use: warnings only, or debug with source locations.
    #[must_use]
    pub fn cli(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::WARN },
            format: TracingOutputFormat::Terminal,
            include_location: debug,
            env_filter: None,
        }
    }

    /// Structured logs for a supervising process (`--json-logs`).
    #[must_use]
    pub fn host() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Json,
            include_location: true,
            env_filter: None,
        }
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Picks the filter directive: explicit filter, then `from_env`, then
    /// `level` for every gflow crate.
    pub fn directive(&self, from_env: Option<String>) -> String {
        if let Some(ref filter) = self.env_filter {
            return filter.clone();
        }
        if let Some(filter) = from_env.filter(|f| !f.trim().is_empty()) {
            return filter;
        }
        let level = self.level.to_string().to_lowercase();
        CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the global subscriber. Call once at process start.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let from_env = env::var(LOG_ENV).or_else(|_| env::var("RUST_LOG")).ok();
    let directive = config.directive(from_env);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|source| TracingError::EnvFilter { directive, source })?;

    let layer = match config.format {
        TracingOutputFormat::Terminal => fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(std::io::stderr)
            .boxed(),
        TracingOutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
