// Module config - settings structure, RON file and command line

pub mod cli;
pub mod file;

pub use cli::Cli;
pub use file::{default_config_paths, load_file, load_settings};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::engine::display::DisplaySource;
use crate::system::priority::{MAX_CPU_CORES, RealtimeRequest};
use crate::timecode::clock::CalendarZone;
use crate::timecode::latency::LatencyModel;
use crate::timecode::rate::FrameRate;

pub const DEFAULT_NTP_SYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_NTP_SLEW_PERIOD_SECS: u64 = 30;
pub const DEFAULT_CPU_CORE: i64 = 3;
pub const DEFAULT_BUFFER_PERIODS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown frame rate '{0}' (supported: 24, 25, 29.97, 30, 29.97df, 30df)")]
    UnknownFrameRate(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Everything the engine needs, merged from defaults, file and flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output device name or listing index; `None` for the default device
    pub device: Option<String>,
    pub frame_rate: FrameRate,
    /// NTP synchronization is off when unset
    pub ntp_server: Option<String>,
    pub ntp_sync_interval_secs: u64,
    pub ntp_slew_period_secs: u64,
    /// Negative disables pinning
    pub cpu_core: Option<i64>,
    pub realtime: bool,
    pub lock_memory: bool,
    pub buffer_periods: usize,
    pub amplitude: f32,
    pub timezone: CalendarZone,
    /// Carry the calendar date in the LTC user bits
    pub encode_date: bool,
    pub display_source: DisplaySource,
    /// Apply the first measured offset at once instead of slewing
    pub step_on_start: bool,
    pub latency: LatencyModel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            frame_rate: FrameRate::default(),
            ntp_server: None,
            ntp_sync_interval_secs: DEFAULT_NTP_SYNC_INTERVAL_SECS,
            ntp_slew_period_secs: DEFAULT_NTP_SLEW_PERIOD_SECS,
            cpu_core: Some(DEFAULT_CPU_CORE),
            realtime: true,
            lock_memory: true,
            buffer_periods: DEFAULT_BUFFER_PERIODS,
            amplitude: 1.0,
            timezone: CalendarZone::default(),
            encode_date: false,
            display_source: DisplaySource::default(),
            step_on_start: true,
            latency: LatencyModel::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(device) = &self.device
            && device.trim().is_empty()
        {
            return Err(ConfigError::invalid("device", "empty device name"));
        }
        if let Some(server) = &self.ntp_server
            && server.trim().is_empty()
        {
            return Err(ConfigError::invalid("ntp_server", "empty server name"));
        }
        if self.ntp_sync_interval_secs == 0 {
            return Err(ConfigError::invalid("ntp_sync_interval_secs", "must be at least 1"));
        }
        if self.ntp_slew_period_secs == 0 {
            return Err(ConfigError::invalid("ntp_slew_period_secs", "must be at least 1"));
        }
        if self.buffer_periods == 0 {
            return Err(ConfigError::invalid("buffer_periods", "must be at least 1"));
        }
        if let Some(core) = self.cpu_core()
            && core >= MAX_CPU_CORES
        {
            return Err(ConfigError::invalid(
                "cpu_core",
                format!("{} is beyond the last addressable core {}", core, MAX_CPU_CORES - 1),
            ));
        }
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(ConfigError::invalid(
                "amplitude",
                format!("{} is outside 0.0..=1.0", self.amplitude),
            ));
        }

        let latency = &self.latency;
        let constants = [
            latency.min_offset_frames,
            latency.max_offset_frames,
            latency.decay_rate,
            latency.sine_amplitude,
            latency.quadratic_amplitude,
        ];
        if constants.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::invalid("latency", "constants must be finite"));
        }

        Ok(())
    }

    pub fn cpu_core(&self) -> Option<usize> {
        self.cpu_core
            .and_then(|core| usize::try_from(core).ok())
    }

    pub fn ntp_enabled(&self) -> bool {
        self.ntp_server.is_some()
    }

    pub fn ntp_sync_interval(&self) -> Duration {
        Duration::from_secs(self.ntp_sync_interval_secs)
    }

    pub fn realtime_request(&self) -> RealtimeRequest {
        RealtimeRequest {
            enabled: self.realtime,
            cpu_core: self.cpu_core(),
            lock_memory: self.lock_memory,
        }
    }
}
