// Module audio - output transports for the timecode stream

pub mod cpal_output;
pub mod device;
pub mod format_conversion;
pub mod null;
pub mod timing;
pub mod transport;

pub use cpal_output::CpalTransport;
pub use device::{AudioDeviceInfo, AudioDeviceManager};
pub use null::NullTransport;
pub use timing::TransportTiming;
pub use transport::{AudioTransport, TransportConfig};

use thiserror::Error;

/// Fixed output sample rate
pub const SAMPLE_RATE: u32 = 48_000;

/// Timecode is a single mono signal
pub const OUTPUT_CHANNELS: u16 = 1;

#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Device does not support {0}")]
    UnsupportedConfig(String),

    #[error("Failed to build output stream: {0}")]
    BuildStream(String),

    #[error("Failed to start output stream: {0}")]
    PlayStream(String),

    #[error("Output underrun ({0} frames of silence)")]
    Underrun(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Write did not complete before the deadline")]
    WriteTimeout,

    #[error("Audio device disconnected")]
    Disconnected,
}

impl AudioError {
    /// Transient errors are handled by `AudioTransport::recover`; the rest need a reopen
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AudioError::Underrun(_) | AudioError::Stream(_) | AudioError::WriteTimeout
        )
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
