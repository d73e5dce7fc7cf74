// Module engine - producer, display and NTP threads around the shared clock state

pub mod coordinator;
pub mod display;
pub mod producer;
pub mod snapshot;
pub mod sync_task;

pub use coordinator::{Coordinator, EngineConfig, NtpConfig, RunSummary};
pub use display::{DisplaySource, DisplayTask};
pub use producer::{Producer, ProducerStats};
pub use snapshot::{DisplaySnapshot, SnapshotData};
pub use sync_task::{SyncStats, SyncTask};

use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Audio output error: {0}")]
    Audio(#[from] AudioError),

    #[error("Failed to spawn thread: {0}")]
    Spawn(std::io::Error),

    #[error("Thread '{0}' panicked")]
    ThreadPanicked(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
