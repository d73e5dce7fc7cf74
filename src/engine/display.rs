// Console display thread - lowest priority, redraws only on change

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::engine::snapshot::DisplaySnapshot;
use crate::shutdown::ShutdownToken;
use crate::system::priority;
use crate::timecode::clock::TimecodeClock;
use crate::timecode::smpte::{SmpteTimecode, format_timecode};

pub const DISPLAY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Where the displayed value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplaySource {
    /// Recomputed from the wall clock and NTP offset, no latency compensation
    #[default]
    Wall,
    /// Last value handed to the encoder
    Output,
}

pub struct DisplayTask {
    clock: Arc<TimecodeClock>,
    snapshot: DisplaySnapshot,
    source: DisplaySource,
    out: Box<dyn Write + Send>,
    lower_priority: bool,
}

impl DisplayTask {
    pub fn new(
        clock: Arc<TimecodeClock>,
        snapshot: DisplaySnapshot,
        source: DisplaySource,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            clock,
            snapshot,
            source,
            out,
            lower_priority: true,
        }
    }

    /// Keep the caller's scheduling class (tests)
    pub fn keep_priority(mut self) -> Self {
        self.lower_priority = false;
        self
    }

    fn current(&self) -> Option<SmpteTimecode> {
        match self.source {
            DisplaySource::Wall => Some(self.clock.display_timecode_now()),
            DisplaySource::Output => self.snapshot.latest().map(|s| s.timecode),
        }
    }

    /// Runs until shutdown; returns the number of redraws
    pub fn run(mut self, shutdown: &ShutdownToken) -> io::Result<u64> {
        if self.lower_priority {
            priority::request_idle();
        }

        let rate = self.clock.rate();
        let mut last: Option<SmpteTimecode> = None;
        let mut renders = 0u64;

        while !shutdown.is_requested() {
            if let Some(tc) = self.current()
                && last != Some(tc)
            {
                write!(self.out, "\r{}", format_timecode(&tc, rate))?;
                self.out.flush()?;
                last = Some(tc);
                renders += 1;
            }
            thread::sleep(DISPLAY_POLL_INTERVAL);
        }

        writeln!(self.out)?;
        self.out.flush()?;
        debug!(renders, "Display stopped");
        Ok(renders)
    }
}
