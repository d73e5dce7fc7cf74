// Periodic NTP resynchronization thread

use std::time::Duration;

use tracing::{info, warn};

use crate::ntp::{NtpError, NtpState, NtpSynchronizer};
use crate::shutdown::ShutdownToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub succeeded: u64,
    pub failed: u64,
}

pub struct SyncTask {
    synchronizer: NtpSynchronizer,
    state: NtpState,
    interval: Duration,
}

impl SyncTask {
    pub fn new(synchronizer: NtpSynchronizer, state: NtpState, interval: Duration) -> Self {
        Self {
            synchronizer,
            state,
            interval,
        }
    }

    /// One synchronization; failures leave the state unchanged and are only logged
    pub fn sync_once(&self, shutdown: &ShutdownToken, stats: &mut SyncStats) -> Result<i64, NtpError> {
        match self.synchronizer.synchronize(&self.state, shutdown) {
            Ok(offset) => {
                stats.succeeded += 1;
                Ok(offset)
            }
            Err(NtpError::Cancelled) => Err(NtpError::Cancelled),
            Err(e) => {
                stats.failed += 1;
                warn!(server = self.synchronizer.server(), error = %e, "NTP sync failed, keeping current offset");
                Err(e)
            }
        }
    }

    /// Sleeps `interval` (waking to check shutdown), syncs, repeats
    pub fn run(self, shutdown: &ShutdownToken) -> SyncStats {
        let mut stats = SyncStats::default();
        info!(
            server = self.synchronizer.server(),
            interval_secs = self.interval.as_secs(),
            "NTP sync thread started"
        );

        while shutdown.sleep(self.interval) {
            if let Err(NtpError::Cancelled) = self.sync_once(shutdown, &mut stats) {
                break;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntp::NtpSettings;
    use crate::timecode::rate::FrameRate;
    use std::net::UdpSocket;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_exits_promptly_on_shutdown() {
        let sync = NtpSynchronizer::new("127.0.0.1:9", FrameRate::Fps25);
        let task = SyncTask::new(sync, NtpState::new(), Duration::from_secs(3600));

        let shutdown = ShutdownToken::new();
        let stopper = shutdown.clone();
        let start = Instant::now();
        let handle = thread::spawn(move || task.run(&stopper));
        thread::sleep(Duration::from_millis(50));
        shutdown.request();

        let stats = handle.join().unwrap();
        assert_eq!(stats, SyncStats::default());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_unanswered_server_counts_failure() {
        // Bound but silent socket: every query times out
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = silent.local_addr().unwrap();

        let sync = NtpSynchronizer::new(addr.to_string(), FrameRate::Fps25).with_settings(NtpSettings {
            query_count: 2,
            query_spacing: Duration::ZERO,
            query_timeout: Duration::from_millis(20),
            ..NtpSettings::default()
        });
        let state = NtpState::new();
        let task = SyncTask::new(sync, state.clone(), Duration::from_secs(1));

        let mut stats = SyncStats::default();
        let result = task.sync_once(&ShutdownToken::new(), &mut stats);

        assert!(matches!(result, Err(NtpError::NoValidSamples(2))));
        assert_eq!(stats.failed, 1);
        assert_eq!(state.snapshot().target_offset_us, 0);
    }
}
