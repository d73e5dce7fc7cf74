// Time source - system real-time clock plus the currently applied NTP offset

use std::time::{SystemTime, UNIX_EPOCH};

use crate::ntp::state::NtpState;

/// Microseconds since the Unix epoch, negative before 1970
pub fn system_time_us(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_micros() as i64,
        Err(before) => -(before.duration().as_micros() as i64),
    }
}

/// Wall clock reading, swappable so tests can drive the clock by hand
pub trait WallClock: Send + Sync {
    fn now_us(&self) -> i64;
}

/// `CLOCK_REALTIME` through `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_us(&self) -> i64 {
        system_time_us(SystemTime::now())
    }
}

/// Reads the wall clock and, when synchronization is enabled, the NTP offset
#[derive(Clone)]
pub struct TimeSource {
    ntp: Option<NtpState>,
}

impl TimeSource {
    /// Plain system time, no network correction
    pub fn system() -> Self {
        Self { ntp: None }
    }

    pub fn with_ntp(ntp: NtpState) -> Self {
        Self { ntp: Some(ntp) }
    }

    pub fn ntp_enabled(&self) -> bool {
        self.ntp.is_some()
    }

    pub fn ntp_state(&self) -> Option<&NtpState> {
        self.ntp.as_ref()
    }

    /// Applied-so-far correction; zero when synchronization is disabled
    pub fn offset_us(&self) -> i64 {
        self.ntp
            .as_ref()
            .map(|state| state.current_offset_us())
            .unwrap_or(0)
    }

    /// `now` plus the active offset
    pub fn corrected_us(&self, now_us: i64) -> i64 {
        now_us + self.offset_us()
    }
}
