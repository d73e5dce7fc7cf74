// Frame rate catalog - the six SMPTE rates the generator can emit

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Television standard, only affects LTC bit layout (polarity bit position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TvStandard {
    /// 525 lines / 60 Hz family (24, 29.97, 30 fps)
    Ntsc,
    /// 625 lines / 50 Hz family (25 fps)
    Pal,
}

/// One of the supported SMPTE frame rates.
///
/// There is no way to build any other rate: parsing an unknown name fails
/// with [`ConfigError::UnknownFrameRate`] before a clock is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FrameRate {
    Fps24,
    Fps25,
    Fps2997,
    Fps30,
    Fps2997Drop,
    Fps30Drop,
}

pub const SUPPORTED_RATES: [FrameRate; 6] = [
    FrameRate::Fps24,
    FrameRate::Fps25,
    FrameRate::Fps2997,
    FrameRate::Fps30,
    FrameRate::Fps2997Drop,
    FrameRate::Fps30Drop,
];

impl FrameRate {
    /// Nominal rate as used for display and slew sizing
    pub fn fps(&self) -> f64 {
        match self {
            FrameRate::Fps24 => 24.0,
            FrameRate::Fps25 => 25.0,
            FrameRate::Fps2997 | FrameRate::Fps2997Drop => 29.97,
            FrameRate::Fps30 | FrameRate::Fps30Drop => 30.0,
        }
    }

    pub fn tv_standard(&self) -> TvStandard {
        match self {
            FrameRate::Fps25 => TvStandard::Pal,
            _ => TvStandard::Ntsc,
        }
    }

    pub fn drop_frame(&self) -> bool {
        matches!(self, FrameRate::Fps2997Drop | FrameRate::Fps30Drop)
    }

    /// Canonical label matched against CLI arguments and config values
    pub fn name(&self) -> &'static str {
        match self {
            FrameRate::Fps24 => "24",
            FrameRate::Fps25 => "25",
            FrameRate::Fps2997 => "29.97",
            FrameRate::Fps30 => "30",
            FrameRate::Fps2997Drop => "29.97df",
            FrameRate::Fps30Drop => "30df",
        }
    }

    /// Exact rate as `numerator / denominator` frames per second
    pub fn rational(&self) -> (i64, i64) {
        match self {
            FrameRate::Fps24 => (24, 1),
            FrameRate::Fps25 => (25, 1),
            FrameRate::Fps2997 | FrameRate::Fps2997Drop => (30_000, 1001),
            FrameRate::Fps30 | FrameRate::Fps30Drop => (30, 1),
        }
    }

    /// Number of frame labels per second, `round(fps)`
    pub fn frames_per_second(&self) -> u8 {
        self.fps().round() as u8
    }

    /// Whole microseconds per frame, derived from the rational rate
    pub fn micros_per_frame(&self) -> i64 {
        let (num, den) = self.rational();
        MICROS_PER_SECOND * den / num
    }

    /// Exact frame duration in microseconds, for fractional-frame offsets
    pub fn frame_duration_us(&self) -> f64 {
        let (num, den) = self.rational();
        MICROS_PER_SECOND as f64 * den as f64 / num as f64
    }

    /// Audio samples per LTC frame at the given output sample rate
    pub fn samples_per_frame(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 / self.fps()).round() as usize
    }

    pub fn all() -> &'static [FrameRate] {
        &SUPPORTED_RATES
    }

    pub fn parse(name: &str) -> Option<FrameRate> {
        SUPPORTED_RATES
            .iter()
            .copied()
            .find(|rate| rate.name() == name.trim())
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate::Fps25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FrameRate::parse(s).ok_or_else(|| ConfigError::UnknownFrameRate(s.to_string()))
    }
}

impl TryFrom<String> for FrameRate {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameRate> for String {
    fn from(rate: FrameRate) -> Self {
        rate.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for rate in FrameRate::all() {
            assert_eq!(FrameRate::parse(rate.name()), Some(*rate));
        }
        assert_eq!(FrameRate::parse("23.976"), None);
        assert_eq!(FrameRate::parse("60"), None);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "50".parse::<FrameRate>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFrameRate(ref name) if name == "50"));
    }

    #[test]
    fn test_drop_frame_only_on_30_family() {
        for rate in FrameRate::all() {
            if rate.drop_frame() {
                assert!(rate.fps() == 29.97 || rate.fps() == 30.0);
            }
        }
        assert!(FrameRate::Fps2997Drop.drop_frame());
        assert!(FrameRate::Fps30Drop.drop_frame());
        assert!(!FrameRate::Fps2997.drop_frame());
    }

    #[test]
    fn test_micros_per_frame() {
        assert_eq!(FrameRate::Fps24.micros_per_frame(), 41_666);
        assert_eq!(FrameRate::Fps25.micros_per_frame(), 40_000);
        assert_eq!(FrameRate::Fps2997.micros_per_frame(), 33_366);
        assert_eq!(FrameRate::Fps30.micros_per_frame(), 33_333);
    }

    #[test]
    fn test_samples_per_frame_at_48k() {
        assert_eq!(FrameRate::Fps24.samples_per_frame(48_000), 2000);
        assert_eq!(FrameRate::Fps25.samples_per_frame(48_000), 1920);
        assert_eq!(FrameRate::Fps2997.samples_per_frame(48_000), 1602);
        assert_eq!(FrameRate::Fps30Drop.samples_per_frame(48_000), 1600);
    }

    #[test]
    fn test_frames_per_second_rounds() {
        assert_eq!(FrameRate::Fps2997Drop.frames_per_second(), 30);
        assert_eq!(FrameRate::Fps24.frames_per_second(), 24);
    }

    #[test]
    fn test_tv_standard() {
        assert_eq!(FrameRate::Fps25.tv_standard(), TvStandard::Pal);
        assert_eq!(FrameRate::Fps24.tv_standard(), TvStandard::Ntsc);
        assert_eq!(FrameRate::Fps30Drop.tv_standard(), TvStandard::Ntsc);
    }
}
