// Null output - a virtual device paced by the system clock
//
// Consumes samples at the configured rate from the first write on, so the
// producer loop runs at real speed and sees a realistic queue delay without
// audio hardware. Optionally keeps everything written for inspection.

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::audio::timing::TransportTiming;
use crate::audio::transport::{AudioTransport, TransportConfig};
use crate::audio::{AudioError, AudioResult};
use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};
use crate::timecode::rate::MICROS_PER_SECOND;

/// Shared buffer receiving a copy of every written sample
pub type SampleSink = Arc<Mutex<Vec<f32>>>;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct NullTransport {
    sample_rate: u32,
    capacity: usize,
    paced: bool,
    write_timeout: Duration,
    /// Virtual playback start, set by the first write
    origin: Option<Instant>,
    written: u64,
    timing: TransportTiming,
    status: AtomicDeviceStatus,
    sink: Option<SampleSink>,
}

impl NullTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let period = Duration::from_micros(
            config.period_frames as u64 * MICROS_PER_SECOND as u64 / config.sample_rate.max(1) as u64,
        );
        Self {
            sample_rate: config.sample_rate,
            capacity: config.buffer_frames(),
            paced: true,
            write_timeout: period * (config.buffer_periods as u32 + 2),
            origin: None,
            written: 0,
            timing: TransportTiming::new(config.sample_rate),
            status: AtomicDeviceStatus::new(DeviceStatus::Connected),
            sink: None,
        }
    }

    /// Never blocks and reports no queue delay
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn with_sink(mut self, sink: SampleSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn timing(&self) -> &TransportTiming {
        &self.timing
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn elapsed_samples(&self, now: Instant) -> u64 {
        self.origin
            .map(|origin| {
                let micros = now.saturating_duration_since(origin).as_micros() as u64;
                micros * self.sample_rate as u64 / MICROS_PER_SECOND as u64
            })
            .unwrap_or(0)
    }

    /// Samples still queued; a starved virtual device restarts from the current position
    fn queued(&mut self, now: Instant) -> u64 {
        if !self.paced || self.origin.is_none() {
            return 0;
        }

        let elapsed = self.elapsed_samples(now);
        if elapsed > self.written {
            let missing = elapsed - self.written;
            self.timing.record_underrun(missing as usize);
            self.timing.record_played(self.written as usize);
            self.origin = Some(now);
            self.written = 0;
            debug!(missing, "null output starved");
            return 0;
        }

        self.written - elapsed
    }
}

impl AudioTransport for NullTransport {
    fn write(&mut self, samples: &[f32]) -> AudioResult<usize> {
        if self.status.get() == DeviceStatus::Disconnected {
            return Err(AudioError::Disconnected);
        }

        if self.paced {
            let deadline = Instant::now() + self.write_timeout;
            loop {
                let now = Instant::now();
                let queued = self.queued(now) as usize;
                if queued + samples.len() <= self.capacity.max(samples.len()) {
                    break;
                }
                if now >= deadline {
                    return Err(AudioError::WriteTimeout);
                }
                thread::sleep(POLL_INTERVAL);
            }
            if self.origin.is_none() {
                self.origin = Some(Instant::now());
            }
        }

        self.written += samples.len() as u64;
        if let Some(sink) = &self.sink {
            sink.lock().extend_from_slice(samples);
        }
        Ok(samples.len())
    }

    fn delay_samples(&self) -> i64 {
        if !self.paced || self.origin.is_none() {
            return 0;
        }
        self.written.saturating_sub(self.elapsed_samples(Instant::now())) as i64
    }

    fn recover(&mut self) -> AudioResult<()> {
        if self.status.get() == DeviceStatus::Disconnected {
            return Err(AudioError::Disconnected);
        }
        self.status.set(DeviceStatus::Connected);
        Ok(())
    }

    fn close(&mut self) {
        self.status.set(DeviceStatus::Disconnected);
    }

    fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    fn underruns(&self) -> u64 {
        self.timing.underruns()
    }
}
