// Latency model - buffer delay conversion and the adaptive per-second correction
//
// Computing and queuing a frame lags more right after a second rollover than
// mid-second. The correction blends three curves, measured in output frames:
//
//   exponential: max - (1 - e^(-k * f)) * (max - min)
//   sinusoidal:  + a_sin * sin(2 * pi * f)
//   quadratic:   + a_quad * (1 - f^2)
//
// where f is the position inside the current second, in [0, 1).
// The constants were tuned on real hardware; they are fields so a deployment
// can override them from the config file.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::timecode::rate::{FrameRate, MICROS_PER_SECOND};

pub const DEFAULT_MIN_OFFSET_FRAMES: f64 = 1.0;
pub const DEFAULT_MAX_OFFSET_FRAMES: f64 = 3.5;
pub const DEFAULT_DECAY_RATE: f64 = 3.0;
pub const DEFAULT_SINE_AMPLITUDE: f64 = 0.2;
pub const DEFAULT_QUADRATIC_AMPLITUDE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyModel {
    /// Offset approached near the end of a second
    pub min_offset_frames: f64,
    /// Offset at the very start of a second
    pub max_offset_frames: f64,
    /// Exponential decay constant `k`
    pub decay_rate: f64,
    pub sine_amplitude: f64,
    pub quadratic_amplitude: f64,
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            min_offset_frames: DEFAULT_MIN_OFFSET_FRAMES,
            max_offset_frames: DEFAULT_MAX_OFFSET_FRAMES,
            decay_rate: DEFAULT_DECAY_RATE,
            sine_amplitude: DEFAULT_SINE_AMPLITUDE,
            quadratic_amplitude: DEFAULT_QUADRATIC_AMPLITUDE,
        }
    }
}

impl LatencyModel {
    /// Correction in (fractional) output frames for a position within the second
    pub fn offset_frames(&self, second_fraction: f64) -> f64 {
        let f = second_fraction.clamp(0.0, 1.0);

        let normalized = 1.0 - (-self.decay_rate * f).exp();
        let mut offset =
            self.max_offset_frames - normalized * (self.max_offset_frames - self.min_offset_frames);

        offset += self.sine_amplitude * (2.0 * PI * f).sin();
        offset += self.quadratic_amplitude * (1.0 - f * f);

        offset
    }

    /// Correction converted to whole microseconds (truncated toward zero)
    pub fn offset_us(&self, second_fraction: f64, rate: FrameRate) -> i64 {
        (rate.frame_duration_us() * self.offset_frames(second_fraction)) as i64
    }
}

/// Queued samples to microseconds, rounded to nearest; negative delay counts as zero
pub fn buffer_delay_us(delay_samples: i64, sample_rate: u32) -> i64 {
    let delay = delay_samples.max(0);
    let rate = sample_rate as i64;
    (delay * MICROS_PER_SECOND + rate / 2) / rate
}

/// Position of a microsecond timestamp inside its second, in [0, 1)
pub fn second_fraction(time_us: i64) -> f64 {
    time_us.rem_euclid(MICROS_PER_SECOND) as f64 / MICROS_PER_SECOND as f64
}
