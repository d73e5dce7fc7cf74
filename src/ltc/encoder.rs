// Biphase-mark LTC encoder
//
// Every bit cell starts with a level transition; a '1' adds a second transition
// at mid-cell. Half-cell boundaries are spread evenly over the frame's samples,
// so non-integer samples-per-bit (1602 / 160 at 29.97) never accumulate drift.
// The output level carries over from one frame to the next.

use crate::ltc::TimecodeEncoder;
use crate::ltc::frame::{LTC_FRAME_BITS, LtcFrame};
use crate::timecode::rate::FrameRate;
use crate::timecode::smpte::SmpteTimecode;

const HALF_CELLS: usize = LTC_FRAME_BITS * 2;

pub struct LtcEncoder {
    rate: FrameRate,
    amplitude: f32,
    encode_date: bool,
    samples_per_frame: usize,
    level: bool,
    buffer: Vec<f32>,
    last_frame: LtcFrame,
}

impl LtcEncoder {
    pub fn new(rate: FrameRate, sample_rate: u32) -> Self {
        let samples_per_frame = rate.samples_per_frame(sample_rate);
        Self {
            rate,
            amplitude: 1.0,
            encode_date: false,
            samples_per_frame,
            level: false,
            buffer: vec![0.0; samples_per_frame],
            last_frame: LtcFrame::default(),
        }
    }

    /// Peak sample value, clamped to `0.0..=1.0`
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    pub fn with_date(mut self, encode_date: bool) -> Self {
        self.encode_date = encode_date;
        self
    }

    /// Word produced by the most recent `encode` call
    pub fn last_frame(&self) -> LtcFrame {
        self.last_frame
    }

    fn half_cell_boundary(&self, k: usize) -> usize {
        (k * self.samples_per_frame + HALF_CELLS / 2) / HALF_CELLS
    }

    fn render(&mut self, frame: LtcFrame) {
        let high = self.amplitude;
        let low = -self.amplitude;

        for bit in 0..LTC_FRAME_BITS {
            let start = self.half_cell_boundary(2 * bit);
            let mid = self.half_cell_boundary(2 * bit + 1);
            let end = self.half_cell_boundary(2 * bit + 2);

            self.level = !self.level;
            let value = if self.level { high } else { low };
            self.buffer[start..mid].fill(value);

            if frame.bit(bit) {
                self.level = !self.level;
            }
            let value = if self.level { high } else { low };
            self.buffer[mid..end].fill(value);
        }
    }
}

impl TimecodeEncoder for LtcEncoder {
    fn encode(&mut self, timecode: &SmpteTimecode) -> &[f32] {
        let frame = LtcFrame::from_timecode(timecode, self.rate, self.encode_date);
        self.render(frame);
        self.last_frame = frame;
        &self.buffer
    }

    fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    fn rate(&self) -> FrameRate {
        self.rate
    }
}
