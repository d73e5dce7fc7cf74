// Format conversion for CPAL output buffers
//
// The timecode signal is produced as f32. The device may ask for:
// - f32: written as is
// - i16: signed 16-bit (common on ALSA hw devices)
// - u16: offset binary 16-bit
//
// Conversion happens per sample in the callback, without allocation.

use cpal::{FromSample, Sample};

/// Writes one mono sample to every channel of an interleaved frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    let converted = T::from_sample(sample);
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = converted;
    }
}

/// Fills an interleaved buffer from `next`, one mono sample per frame.
///
/// Frames for which `next` has nothing are written as silence.
/// Returns `(frames_filled, frames_silenced)`.
#[inline]
pub fn fill_interleaved<T, F>(data: &mut [T], channels: usize, mut next: F) -> (usize, usize)
where
    T: Sample + FromSample<f32>,
    F: FnMut() -> Option<f32>,
{
    let mut filled = 0;
    let mut silenced = 0;

    for frame in data.chunks_mut(channels.max(1)) {
        match next() {
            Some(sample) => {
                write_mono_to_interleaved_frame(sample, frame);
                filled += 1;
            }
            None => {
                write_mono_to_interleaved_frame(0.0, frame);
                silenced += 1;
            }
        }
    }

    (filled, silenced)
}
