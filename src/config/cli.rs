// Command line flags, layered over the config file

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigError, Settings, load_settings};
use crate::timecode::clock::CalendarZone;
use crate::timecode::rate::FrameRate;

#[derive(Debug, Parser)]
#[command(name = "ltc_timecode", version, about = "Real-time SMPTE linear timecode generator")]
pub struct Cli {
    /// No live timecode display
    #[arg(short, long)]
    pub quiet: bool,

    /// Output device name or index (see --list-devices)
    #[arg(short, long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Config file (default: /etc/ltc_timecode.ron, then the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Synchronize against this NTP server
    #[arg(long, value_name = "HOST")]
    pub ntp_server: Option<String>,

    /// Seconds between NTP synchronizations
    #[arg(long, value_name = "SECONDS")]
    pub ntp_sync_interval: Option<u64>,

    /// Seconds over which an NTP correction is spread
    #[arg(long, value_name = "SECONDS")]
    pub ntp_slew_period: Option<u64>,

    /// Pin the audio thread to this core; negative disables pinning
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub cpu_core: Option<i64>,

    /// Do not request real-time scheduling or lock memory
    #[arg(long)]
    pub no_realtime: bool,

    /// Derive timecode from UTC instead of local time
    #[arg(long)]
    pub utc: bool,

    /// Encode the calendar date in the LTC user bits
    #[arg(long)]
    pub encode_date: bool,

    /// Output level, 0.0 to 1.0
    #[arg(long, value_name = "LEVEL")]
    pub amplitude: Option<f32>,

    /// Discard audio, paced by the system clock
    #[arg(long)]
    pub null_output: bool,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// List supported frame rates and exit
    #[arg(long)]
    pub list_rates: bool,

    /// 24, 25, 29.97, 30, 29.97df or 30df
    #[arg(value_name = "FRAME_RATE")]
    pub frame_rate: Option<String>,
}

impl Cli {
    /// Overrides `settings` with every flag that was given
    pub fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(rate) = &self.frame_rate {
            settings.frame_rate = rate.parse::<FrameRate>()?;
        }
        if let Some(device) = &self.device {
            settings.device = Some(device.clone());
        }
        if let Some(server) = &self.ntp_server {
            settings.ntp_server = Some(server.clone());
        }
        if let Some(interval) = self.ntp_sync_interval {
            settings.ntp_sync_interval_secs = interval;
        }
        if let Some(period) = self.ntp_slew_period {
            settings.ntp_slew_period_secs = period;
        }
        if let Some(core) = self.cpu_core {
            settings.cpu_core = Some(core);
        }
        if self.no_realtime {
            settings.realtime = false;
            settings.lock_memory = false;
        }
        if self.utc {
            settings.timezone = CalendarZone::Utc;
        }
        if self.encode_date {
            settings.encode_date = true;
        }
        if let Some(amplitude) = self.amplitude {
            settings.amplitude = amplitude;
        }
        Ok(())
    }

    /// Defaults, then config file, then flags; validated
    pub fn resolve_settings(&self) -> Result<Settings, ConfigError> {
        let (mut settings, _) = load_settings(self.config.as_deref())?;
        self.apply(&mut settings)?;
        settings.validate()?;
        Ok(settings)
    }
}
