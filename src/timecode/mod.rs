// Module timecode - frame rates, SMPTE values and the latency-compensated clock

pub mod clock;
pub mod latency;
pub mod rate;
pub mod smpte;
pub mod source;

pub use clock::{CalendarZone, TimecodeClock};
pub use latency::LatencyModel;
pub use rate::{FrameRate, TvStandard};
pub use smpte::{SmpteTimecode, format_timecode};
pub use source::TimeSource;
