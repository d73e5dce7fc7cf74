// SMPTE timecode value - a derived snapshot, recomputed every period

use std::fmt;

use crate::timecode::rate::FrameRate;

/// Calendar date plus time of day and frame label.
///
/// `frame` is always in `[0, round(fps))`. For drop-frame rates the labels
/// 0 and 1 never appear in minutes not divisible by ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SmpteTimecode {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
}

impl SmpteTimecode {
    /// Time-of-day fields only, ordered for comparisons in tests and display
    pub fn time_fields(&self) -> (u8, u8, u8, u8) {
        (self.hour, self.minute, self.second, self.frame)
    }

    /// Frames into the day (nominal labels, no drop-frame compensation)
    pub fn frame_of_day(&self, rate: FrameRate) -> u32 {
        let fps = rate.frames_per_second() as u32;
        ((self.hour as u32 * 60 + self.minute as u32) * 60 + self.second as u32) * fps
            + self.frame as u32
    }
}

impl fmt::Display for SmpteTimecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hour, self.minute, self.second, self.frame
        )
    }
}

/// Console rendering: `HH:MM:SS:FF @ 25.000 fps`, `;` before the frame for drop-frame
pub fn format_timecode(tc: &SmpteTimecode, rate: FrameRate) -> String {
    let separator = if rate.drop_frame() { ';' } else { ':' };
    format!(
        "{:02}:{:02}:{:02}{}{:02} @ {:.3} fps",
        tc.hour,
        tc.minute,
        tc.second,
        separator,
        tc.frame,
        rate.fps()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SmpteTimecode {
        SmpteTimecode {
            year: 2024,
            month: 3,
            day: 9,
            hour: 7,
            minute: 5,
            second: 42,
            frame: 3,
        }
    }

    #[test]
    fn test_format_non_drop() {
        assert_eq!(
            format_timecode(&sample(), FrameRate::Fps25),
            "07:05:42:03 @ 25.000 fps"
        );
    }

    #[test]
    fn test_format_drop_frame_uses_semicolon() {
        assert_eq!(
            format_timecode(&sample(), FrameRate::Fps2997Drop),
            "07:05:42;03 @ 29.970 fps"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "07:05:42:03");
    }

    #[test]
    fn test_frame_of_day() {
        let tc = SmpteTimecode {
            hour: 1,
            minute: 0,
            second: 1,
            frame: 2,
            ..Default::default()
        };
        assert_eq!(tc.frame_of_day(FrameRate::Fps25), (3600 + 1) * 25 + 2);
    }
}
