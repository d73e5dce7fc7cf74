// LTC decoder - recovers 80-bit words from a biphase-mark sample stream
//
// Used to verify generated audio. Runs of constant sign are classified by
// length against the nominal bit cell: two short runs make a '1', one long
// run makes a '0'. A word is reported whenever the last 80 bits end in the
// sync word.

use crate::ltc::frame::{LTC_FRAME_BITS, LtcFrame, SYNC_WORD, SYNC_WORD_POSITION};
use crate::timecode::rate::FrameRate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub frame: LtcFrame,
    /// Index of the sample that ended the word's last bit
    pub end_sample: u64,
}

pub struct LtcDecoder {
    short_limit: f64,
    long_limit: f64,
    level: Option<bool>,
    run_length: usize,
    half_pending: bool,
    window: u128,
    bits_in_window: usize,
    position: u64,
}

impl LtcDecoder {
    pub fn new(rate: FrameRate, sample_rate: u32) -> Self {
        let samples_per_bit = rate.samples_per_frame(sample_rate) as f64 / LTC_FRAME_BITS as f64;
        Self {
            short_limit: samples_per_bit * 0.75,
            long_limit: samples_per_bit * 1.5,
            level: None,
            run_length: 0,
            half_pending: false,
            window: 0,
            bits_in_window: 0,
            position: 0,
        }
    }

    pub fn decode(&mut self, samples: &[f32]) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();

        for &sample in samples {
            let level = sample > 0.0;
            match self.level {
                Some(previous) if previous != level => {
                    self.end_run(&mut frames);
                    self.run_length = 1;
                }
                _ => self.run_length += 1,
            }
            self.level = Some(level);
            self.position += 1;
        }

        frames
    }

    /// Terminates the pending run as if the signal had flipped after the last sample
    pub fn flush(&mut self) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        if self.run_length > 0 {
            self.end_run(&mut frames);
            self.run_length = 0;
        }
        self.level = None;
        frames
    }

    fn end_run(&mut self, frames: &mut Vec<DecodedFrame>) {
        let length = self.run_length as f64;

        if length < self.short_limit {
            if self.half_pending {
                self.half_pending = false;
                self.push_bit(true, frames);
            } else {
                self.half_pending = true;
            }
        } else if length < self.long_limit {
            // A pending half cell here means we were out of phase; drop it
            self.half_pending = false;
            self.push_bit(false, frames);
        } else {
            self.reset();
        }
    }

    fn push_bit(&mut self, bit: bool, frames: &mut Vec<DecodedFrame>) {
        self.window = (self.window >> 1) | ((bit as u128) << (LTC_FRAME_BITS - 1));
        self.bits_in_window = (self.bits_in_window + 1).min(LTC_FRAME_BITS);

        let sync = (self.window >> SYNC_WORD_POSITION) as u16;
        if self.bits_in_window == LTC_FRAME_BITS && sync == SYNC_WORD {
            frames.push(DecodedFrame {
                frame: LtcFrame { bits: self.window },
                end_sample: self.position,
            });
            self.bits_in_window = 0;
        }
    }

    fn reset(&mut self) {
        self.half_pending = false;
        self.window = 0;
        self.bits_in_window = 0;
    }
}
