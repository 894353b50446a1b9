use chrono::FixedOffset;
use serde::Deserialize;
use std::io::Read;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::*;

use crate::calendar::GridLayout;
use crate::model::task::DEFAULT_TARGET_POMODOROS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error {0} when reading config")]
    IoError(#[from] std::io::Error),
    #[error("cannot open config file '{0}' : {1}")]
    OpeningError(PathBuf, std::io::Error),
    #[error("UTF8 format error when reading config")]
    Utf8Error,
    #[error("format error {0} when reading config")]
    FormatError(#[from] serde_yaml::Error),
    #[error("utc offset of {0} minutes is out of range")]
    InvalidOffset(i32),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Identity to start with; signed out when absent.
    pub owner: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_target_pomodoros")]
    pub default_target_pomodoros: u32,
}

fn default_target_pomodoros() -> u32 {
    DEFAULT_TARGET_POMODOROS
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_target_pomodoros: DEFAULT_TARGET_POMODOROS,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CalendarConfig {
    /// Offset east of UTC used to decide which day a task belongs to.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub layout: GridLayout,
}

impl CalendarConfig {
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub log: Option<crate::log::Log>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Config {
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(s)?;
        config.calendar.timezone()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let mut file = File::open(p).map_err(|e| ConfigError::OpeningError(p.to_owned(), e))?;
        let mut contents = vec![];
        file.read_to_end(&mut contents)?;
        let contents = String::from_utf8(contents).map_err(|_| ConfigError::Utf8Error)?;
        let config = Config::from_str(&contents)?;
        Ok(config)
    }
}
