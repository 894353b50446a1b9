use serde::Deserialize;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::{FromEnvError, ParseError};
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log level '{0}': {1}")]
    InvalidLevel(String, ParseError),
    #[error("unable to install the log subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Log {
    pub level: String,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_ansi() -> bool {
    true
}

fn filter(
    env_filter: Result<EnvFilter, FromEnvError>,
    config: Option<&Log>,
) -> Result<EnvFilter, LogError> {
    if let Ok(env_filter) = env_filter {
        return Ok(env_filter);
    }
    let level = config.map_or(DEFAULT_LEVEL, |log| log.level.as_str());
    EnvFilter::try_new(level).map_err(|err| LogError::InvalidLevel(level.to_string(), err))
}

/// setup log from an optional environment filter and the config file
///
/// if the environment filter is present, then the configured level is not used
pub fn setup(
    env_filter: Result<EnvFilter, FromEnvError>,
    config: Option<&Log>,
) -> Result<(), LogError> {
    let ansi = config.map_or(true, |log| log.ansi);
    let subscriber = Subscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .with_level(true)
        .with_env_filter(filter(env_filter, config)?)
        .with_ansi(ansi)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
