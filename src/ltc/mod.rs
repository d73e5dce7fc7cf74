// Module LTC - SMPTE linear timecode words and their audio encoding

pub mod decoder;
pub mod encoder;
pub mod frame;

pub use decoder::{DecodedFrame, LtcDecoder};
pub use encoder::LtcEncoder;
pub use frame::LtcFrame;

use crate::timecode::rate::FrameRate;
use crate::timecode::smpte::SmpteTimecode;

/// Turns one timecode value into one frame of audio
pub trait TimecodeEncoder: Send {
    /// Returns exactly `samples_per_frame()` samples
    fn encode(&mut self, timecode: &SmpteTimecode) -> &[f32];

    fn samples_per_frame(&self) -> usize;

    fn rate(&self) -> FrameRate;
}
