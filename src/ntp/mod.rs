// Module NTP - minimal SNTP client and the slewed offset it feeds

pub mod client;
pub mod packet;
pub mod state;
pub mod sync;

pub use client::{OffsetSource, UdpOffsetSource, resolve_server};
pub use state::{NtpState, SlewState};
pub use sync::{NtpSettings, NtpSynchronizer, select_offset};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NtpError {
    #[error("Cannot resolve time server '{0}'")]
    Resolve(String),

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Implausible offset of {0} us")]
    Implausible(i64),

    #[error("Synchronization cancelled")]
    Cancelled,

    #[error("No valid samples out of {0} queries")]
    NoValidSamples(usize),
}

impl NtpError {
    /// Whether the failure concerns a single query rather than the whole sync
    pub fn is_per_query(&self) -> bool {
        matches!(
            self,
            NtpError::Timeout(_) | NtpError::MalformedReply(_) | NtpError::Implausible(_) | NtpError::Io(_)
        )
    }
}

pub type NtpResult<T> = Result<T, NtpError>;
