// ltc_timecode - SMPTE linear timecode generator locked to the wall clock

pub mod audio;
pub mod config;
pub mod connection;
pub mod engine;
pub mod ltc;
pub mod ntp;
pub mod shutdown;
pub mod system;
pub mod timecode;

pub use audio::{AudioError, AudioTransport, CpalTransport, NullTransport, TransportConfig};
pub use config::{Cli, ConfigError, Settings};
pub use engine::{Coordinator, EngineConfig, EngineError, RunSummary};
pub use ltc::{LtcDecoder, LtcEncoder, LtcFrame, TimecodeEncoder};
pub use ntp::{NtpError, NtpState, NtpSynchronizer};
pub use shutdown::ShutdownToken;
pub use timecode::{CalendarZone, FrameRate, SmpteTimecode, TimeSource, TimecodeClock};
