// CPAL output transport - producer thread -> ring buffer -> device callback
//
// # Format Support
//
// The stream is built for whichever of F32 / I16 / U16 the device offers at
// 48 kHz, preferring mono F32. Samples stay f32 in the ring and are converted
// in the callback by `fill_interleaved`. With more than one channel the mono
// signal is copied to every channel.
//
// # Delay
//
// `delay_samples` = ring occupancy + the callback-to-playback latency reported
// by the device in `OutputCallbackInfo`. Periods enter the ring whole, so a
// timed-out write leaves no truncated word behind for `recover` to flush.
//
// # Stream Limitations
//
// `cpal::Stream` is not `Send`: the transport must be opened on the thread
// that writes to it.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, Device, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    StreamError, SupportedBufferSize, SupportedStreamConfig,
};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::audio::device::{AudioDeviceManager, is_supported_format};
use crate::audio::format_conversion::fill_interleaved;
use crate::audio::timing::TransportTiming;
use crate::audio::transport::{
    AudioTransport, SampleConsumer, SampleProducer, TransportConfig, create_sample_channel,
    push_whole_period,
};
use crate::audio::{AudioError, AudioResult};
use crate::connection::status::{AtomicDeviceStatus, DeviceStatus};
use crate::timecode::rate::MICROS_PER_SECOND;

const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct CpalTransport {
    stream: Stream,
    producer: SampleProducer,
    timing: TransportTiming,
    status: AtomicDeviceStatus,
    last_error: Arc<Mutex<Option<String>>>,
    device_name: String,
    channels: usize,
    sample_format: SampleFormat,
    write_timeout: Duration,
    /// Underrun count already reported to the caller
    reported_underruns: u64,
    /// Set once the ring has been filled; underruns before that are startup silence
    primed: bool,
}

impl CpalTransport {
    pub fn open(config: &TransportConfig) -> AudioResult<Self> {
        let manager = AudioDeviceManager::new();
        let device = manager.find_output_device(config.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = select_config(&device, config)?;
        let sample_format = supported.sample_format();
        let channels = supported.channels() as usize;

        let mut stream_config: StreamConfig = supported.config();
        stream_config.buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max }
                if (*min as usize..=*max as usize).contains(&config.period_frames) =>
            {
                BufferSize::Fixed(config.period_frames as u32)
            }
            _ => BufferSize::Default,
        };

        let (producer, consumer) = create_sample_channel(config.buffer_frames());
        let timing = TransportTiming::new(config.sample_rate);
        let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);
        let last_error = Arc::new(Mutex::new(None));

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(
                &device,
                &stream_config,
                channels,
                consumer,
                timing.clone(),
                status.clone(),
                Arc::clone(&last_error),
            ),
            SampleFormat::I16 => build_stream::<i16>(
                &device,
                &stream_config,
                channels,
                consumer,
                timing.clone(),
                status.clone(),
                Arc::clone(&last_error),
            ),
            SampleFormat::U16 => build_stream::<u16>(
                &device,
                &stream_config,
                channels,
                consumer,
                timing.clone(),
                status.clone(),
                Arc::clone(&last_error),
            ),
            other => {
                return Err(AudioError::UnsupportedConfig(format!(
                    "sample format {:?}",
                    other
                )));
            }
        }?;

        stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))?;
        status.set(DeviceStatus::Connected);

        info!(
            device = %device_name,
            sample_rate = config.sample_rate,
            channels,
            format = ?sample_format,
            buffer = ?stream_config.buffer_size,
            "Audio output started"
        );

        let period_us = config.period_frames as u64 * MICROS_PER_SECOND as u64 / config.sample_rate as u64;

        Ok(Self {
            stream,
            producer,
            timing,
            status,
            last_error,
            device_name,
            channels,
            sample_format,
            write_timeout: Duration::from_micros(period_us * (config.buffer_periods as u64 + 2)),
            reported_underruns: 0,
            primed: false,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    fn check_status(&mut self) -> AudioResult<()> {
        match self.status.get() {
            DeviceStatus::Disconnected => Err(AudioError::Disconnected),
            DeviceStatus::Error => {
                let message = self
                    .last_error
                    .lock()
                    .take()
                    .unwrap_or_else(|| "unknown stream error".to_string());
                Err(AudioError::Stream(message))
            }
            _ => Ok(()),
        }
    }

    fn check_underruns(&mut self) -> AudioResult<()> {
        let total = self.timing.underruns();
        if !self.primed {
            self.reported_underruns = total;
            return Ok(());
        }
        if total > self.reported_underruns {
            let missed = total - self.reported_underruns;
            self.reported_underruns = total;
            return Err(AudioError::Underrun(missed));
        }
        Ok(())
    }
}

impl AudioTransport for CpalTransport {
    fn write(&mut self, samples: &[f32]) -> AudioResult<usize> {
        self.check_status()?;
        self.check_underruns()?;

        let deadline = Instant::now() + self.write_timeout;
        let status = &self.status;
        let waited = push_whole_period(&mut self.producer, samples, deadline, WRITE_POLL_INTERVAL, || {
            match status.get() {
                DeviceStatus::Disconnected => Err(AudioError::Disconnected),
                _ => Ok(()),
            }
        })?;

        if waited || self.producer.is_full() {
            self.primed = true;
        }
        Ok(samples.len())
    }

    fn delay_samples(&self) -> i64 {
        (self.producer.occupied_len() as u64 + self.timing.device_latency_samples()) as i64
    }

    fn recover(&mut self) -> AudioResult<()> {
        if self.status.get() == DeviceStatus::Disconnected {
            return Err(AudioError::Disconnected);
        }

        self.stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))?;
        self.reported_underruns = self.timing.underruns();
        self.primed = false;
        self.status.set(DeviceStatus::Connected);
        debug!(device = %self.device_name, "Audio stream recovered");
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!(error = %e, "pause on close failed");
        }
        self.status.set(DeviceStatus::Disconnected);
    }

    fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    fn underruns(&self) -> u64 {
        self.timing.underruns()
    }
}

/// Picks a 48 kHz config: mono before multichannel, F32 before I16 before U16
fn select_config(device: &Device, config: &TransportConfig) -> AudioResult<SupportedStreamConfig> {
    let rate = SampleRate(config.sample_rate);
    let ranges = device
        .supported_output_configs()
        .map_err(|e| AudioError::UnsupportedConfig(e.to_string()))?;

    let format_rank = |format: SampleFormat| match format {
        SampleFormat::F32 => 0,
        SampleFormat::I16 => 1,
        _ => 2,
    };

    ranges
        .filter(|range| {
            is_supported_format(range.sample_format())
                && range.min_sample_rate() <= rate
                && range.max_sample_rate() >= rate
        })
        .min_by_key(|range| {
            (
                range.channels() != config.channels,
                range.channels(),
                format_rank(range.sample_format()),
            )
        })
        .map(|range| range.with_sample_rate(rate))
        .ok_or_else(|| {
            AudioError::UnsupportedConfig(format!("{} Hz in F32/I16/U16", config.sample_rate))
        })
}

/// Output stream for any supported sample type; the callback only pops from
/// the ring and converts
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    mut consumer: SampleConsumer,
    timing: TransportTiming,
    status: AtomicDeviceStatus,
    last_error: Arc<Mutex<Option<String>>>,
) -> AudioResult<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let callback_timing = timing;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                // No allocation, no blocking
                let (filled, silenced) = fill_interleaved(data, channels, || consumer.try_pop());
                callback_timing.record_played(filled + silenced);
                if silenced > 0 {
                    callback_timing.record_underrun(silenced);
                }

                let stamp = info.timestamp();
                if let Some(latency) = stamp.playback.duration_since(&stamp.callback) {
                    callback_timing.set_device_latency_micros(latency.as_micros() as u64);
                }
            },
            move |err| match err {
                StreamError::DeviceNotAvailable => {
                    warn!("Audio device no longer available");
                    status.set(DeviceStatus::Disconnected);
                }
                StreamError::BackendSpecific { err } => {
                    warn!(error = %err, "Audio stream error");
                    *last_error.lock() = Some(err.to_string());
                    status.mark_error();
                }
            },
            None,
        )
        .map_err(|e| AudioError::BuildStream(e.to_string()))
}
