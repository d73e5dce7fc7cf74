// Timecode clock - wall clock + NTP offset + buffer delay -> SMPTE frame
//
// All arithmetic is done in 64-bit microseconds. Only the adaptive correction
// goes through floating point, and only to produce an integer offset.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::timecode::latency::{LatencyModel, buffer_delay_us, second_fraction};
use crate::timecode::rate::{FrameRate, MICROS_PER_SECOND};
use crate::timecode::smpte::SmpteTimecode;
use crate::timecode::source::{SystemClock, TimeSource, WallClock};

/// Frame labels 0 and 1 are skipped in drop-frame minutes
const DROPPED_FRAMES_PER_MINUTE: u8 = 2;

/// Time zone used for the calendar / time-of-day split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalendarZone {
    #[default]
    Local,
    Utc,
}

pub struct TimecodeClock {
    rate: FrameRate,
    sample_rate: u32,
    latency: LatencyModel,
    zone: CalendarZone,
    source: TimeSource,
    wall: Box<dyn WallClock>,
}

impl TimecodeClock {
    pub fn new(rate: FrameRate, sample_rate: u32, source: TimeSource) -> Self {
        Self {
            rate,
            sample_rate,
            latency: LatencyModel::default(),
            zone: CalendarZone::default(),
            source,
            wall: Box::new(SystemClock),
        }
    }

    pub fn with_latency_model(mut self, latency: LatencyModel) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_wall_clock(mut self, wall: Box<dyn WallClock>) -> Self {
        self.wall = wall;
        self
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    pub fn source(&self) -> &TimeSource {
        &self.source
    }

    pub fn latency_model(&self) -> &LatencyModel {
        &self.latency
    }

    /// Current wall clock reading in microseconds
    pub fn now_us(&self) -> i64 {
        self.wall.now_us()
    }

    /// Timecode that should be heard when the next written sample plays.
    ///
    /// `now_us` is the raw wall clock; the NTP offset is read from the shared
    /// state here. The adaptive correction is keyed on the raw sub-second
    /// position of `now_us`.
    pub fn compute_output_timecode(&self, now_us: i64, buffer_delay_samples: i64) -> SmpteTimecode {
        self.output_timecode_with_offset(now_us, self.source.offset_us(), buffer_delay_samples)
    }

    /// Same as `compute_output_timecode` with an offset the caller already
    /// holds, e.g. the one returned by `NtpState::apply_step`
    pub fn output_timecode_with_offset(
        &self,
        now_us: i64,
        ntp_offset_us: i64,
        buffer_delay_samples: i64,
    ) -> SmpteTimecode {
        let delay_us = buffer_delay_us(buffer_delay_samples, self.sample_rate);
        let processing_us = self
            .latency
            .offset_us(second_fraction(now_us), self.rate);

        self.timecode_at(now_us + ntp_offset_us + delay_us + processing_us)
    }

    /// Informative timecode for the console: no buffer delay, no correction
    pub fn compute_display_timecode(&self, now_us: i64, ntp_offset_us: i64) -> SmpteTimecode {
        self.timecode_at(now_us + ntp_offset_us)
    }

    /// Reads the wall clock and the shared offset and computes the display timecode
    pub fn display_timecode_now(&self) -> SmpteTimecode {
        self.compute_display_timecode(self.now_us(), self.source.offset_us())
    }

    /// Calendar and frame derivation for an already-adjusted timestamp
    pub fn timecode_at(&self, adjusted_us: i64) -> SmpteTimecode {
        let whole_seconds = adjusted_us.div_euclid(MICROS_PER_SECOND);
        let remainder_us = adjusted_us.rem_euclid(MICROS_PER_SECOND);

        let mut tc = calendar_fields(whole_seconds, self.zone);
        tc.frame = frame_label(remainder_us, tc.minute, self.rate);
        tc
    }
}

/// Frame label for a sub-second remainder, with the drop-frame rule applied
pub fn frame_label(remainder_us: i64, minute: u8, rate: FrameRate) -> u8 {
    let max_frame = rate.frames_per_second() as i64 - 1;
    let frame = (remainder_us / rate.micros_per_frame()).clamp(0, max_frame) as u8;

    if rate.drop_frame() && minute % 10 != 0 && frame < DROPPED_FRAMES_PER_MINUTE {
        DROPPED_FRAMES_PER_MINUTE
    } else {
        frame
    }
}

fn calendar_fields(unix_seconds: i64, zone: CalendarZone) -> SmpteTimecode {
    let utc: DateTime<Utc> = Utc
        .timestamp_opt(unix_seconds, 0)
        .single()
        .unwrap_or_default();

    match zone {
        CalendarZone::Utc => fields_of(&utc),
        CalendarZone::Local => fields_of(&utc.with_timezone(&Local)),
    }
}

fn fields_of<T: Datelike + Timelike>(dt: &T) -> SmpteTimecode {
    SmpteTimecode {
        year: dt.year(),
        month: dt.month() as u8,
        day: dt.day() as u8,
        hour: dt.hour() as u8,
        minute: dt.minute() as u8,
        second: dt.second() as u8,
        frame: 0,
    }
}
