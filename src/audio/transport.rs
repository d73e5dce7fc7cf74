// Transport abstraction - where encoded frames go once the clock has stamped them

use ringbuf::HeapRb;
use ringbuf::traits::{Observer, Producer, Split};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{AudioError, AudioResult, OUTPUT_CHANNELS, SAMPLE_RATE};
use crate::connection::status::DeviceStatus;
use crate::timecode::rate::FrameRate;

pub type SampleProducer = ringbuf::HeapProd<f32>;
pub type SampleConsumer = ringbuf::HeapCons<f32>;

/// Lock-free queue between the producer thread and the device callback
pub fn create_sample_channel(capacity: usize) -> (SampleProducer, SampleConsumer) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    rb.split()
}

/// Queues `samples` as one unit once the ring has room for all of them.
///
/// A period is never split: on timeout or on a failed `check` nothing has been
/// pushed, so the ring only ever holds whole LTC words. Returns whether the
/// call had to wait for the consumer.
pub fn push_whole_period(
    producer: &mut SampleProducer,
    samples: &[f32],
    deadline: Instant,
    poll_interval: Duration,
    mut check: impl FnMut() -> AudioResult<()>,
) -> AudioResult<bool> {
    let capacity = producer.capacity().get();
    if samples.len() > capacity {
        return Err(AudioError::UnsupportedConfig(format!(
            "period of {} samples in a {} sample queue",
            samples.len(),
            capacity
        )));
    }

    let mut waited = false;
    while producer.vacant_len() < samples.len() {
        waited = true;
        if Instant::now() >= deadline {
            return Err(AudioError::WriteTimeout);
        }
        check()?;
        thread::sleep(poll_interval);
    }

    let pushed = producer.push_slice(samples);
    debug_assert_eq!(pushed, samples.len());
    Ok(waited)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Device name or index from `--list-devices`; `None` for the system default
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// One LTC frame worth of samples
    pub period_frames: usize,
    /// Queue depth in periods
    pub buffer_periods: usize,
}

impl TransportConfig {
    pub fn new(device: Option<String>, rate: FrameRate, buffer_periods: usize) -> Self {
        Self {
            device,
            sample_rate: SAMPLE_RATE,
            channels: OUTPUT_CHANNELS,
            period_frames: rate.samples_per_frame(SAMPLE_RATE),
            buffer_periods: buffer_periods.max(1),
        }
    }

    pub fn buffer_frames(&self) -> usize {
        self.period_frames * self.buffer_periods
    }
}

/// Output stream driven by the producer thread.
///
/// `write` may block for at most a few periods while the queue drains and
/// never indefinitely. `delay_samples` is the number of samples that will play
/// before the next sample written.
pub trait AudioTransport {
    fn write(&mut self, samples: &[f32]) -> AudioResult<usize>;

    fn delay_samples(&self) -> i64;

    /// Bring the stream back after a recoverable error
    fn recover(&mut self) -> AudioResult<()>;

    fn close(&mut self);

    fn status(&self) -> DeviceStatus;

    /// Frames the device had to fill with silence so far
    fn underruns(&self) -> u64;
}

impl<T: AudioTransport + ?Sized> AudioTransport for Box<T> {
    fn write(&mut self, samples: &[f32]) -> AudioResult<usize> {
        (**self).write(samples)
    }

    fn delay_samples(&self) -> i64 {
        (**self).delay_samples()
    }

    fn recover(&mut self) -> AudioResult<()> {
        (**self).recover()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn status(&self) -> DeviceStatus {
        (**self).status()
    }

    fn underruns(&self) -> u64 {
        (**self).underruns()
    }
}
