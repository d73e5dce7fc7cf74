// NTP synchronizer - several queries, keep the smallest plausible offset, retarget the slew
//
// The smallest-magnitude sample is kept rather than an average: the query with
// the least network-induced bias is the best estimate of the true clock skew.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ntp::client::{OffsetSource, UdpOffsetSource};
use crate::ntp::state::{NtpState, slew_frames};
use crate::ntp::{NtpError, NtpResult};
use crate::shutdown::ShutdownToken;
use crate::timecode::rate::FrameRate;

pub const DEFAULT_QUERY_COUNT: usize = 5;
pub const DEFAULT_QUERY_SPACING: Duration = Duration::from_millis(200);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Samples at or beyond this magnitude are treated as corrupt
pub const DEFAULT_MAX_OFFSET_US: i64 = 10_000_000;
pub const DEFAULT_SLEW_PERIOD_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct NtpSettings {
    pub query_count: usize,
    pub query_spacing: Duration,
    pub query_timeout: Duration,
    pub max_offset_us: i64,
    pub slew_period_secs: u64,
}

impl Default for NtpSettings {
    fn default() -> Self {
        Self {
            query_count: DEFAULT_QUERY_COUNT,
            query_spacing: DEFAULT_QUERY_SPACING,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_offset_us: DEFAULT_MAX_OFFSET_US,
            slew_period_secs: DEFAULT_SLEW_PERIOD_SECS,
        }
    }
}

/// Smallest-magnitude sample strictly below `max_offset_us`; first one wins ties
pub fn select_offset(samples: &[i64], max_offset_us: i64) -> Option<i64> {
    samples
        .iter()
        .copied()
        .filter(|offset| offset.unsigned_abs() < max_offset_us.unsigned_abs())
        .fold(None, |best: Option<i64>, offset| match best {
            Some(b) if b.unsigned_abs() <= offset.unsigned_abs() => Some(b),
            _ => Some(offset),
        })
}

pub struct NtpSynchronizer {
    server: String,
    rate: FrameRate,
    settings: NtpSettings,
}

impl NtpSynchronizer {
    pub fn new(server: impl Into<String>, rate: FrameRate) -> Self {
        Self {
            server: server.into(),
            rate,
            settings: NtpSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: NtpSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn settings(&self) -> &NtpSettings {
        &self.settings
    }

    /// Measures against the configured server over a fresh socket and
    /// retargets `state`. On error `state` is left untouched.
    pub fn synchronize(&self, state: &NtpState, shutdown: &ShutdownToken) -> NtpResult<i64> {
        let mut source = UdpOffsetSource::connect(&self.server, self.settings.query_timeout)?;
        self.synchronize_with(&mut source, state, shutdown)
    }

    pub fn synchronize_with<S: OffsetSource>(
        &self,
        source: &mut S,
        state: &NtpState,
        shutdown: &ShutdownToken,
    ) -> NtpResult<i64> {
        let samples = self.measure_with(source, shutdown)?;
        let offset = select_offset(&samples, self.settings.max_offset_us)
            .ok_or(NtpError::NoValidSamples(self.settings.query_count))?;

        let frames = slew_frames(self.settings.slew_period_secs, self.rate.fps());
        let slew = state.retarget(offset, frames);

        info!(
            server = %self.server,
            offset_us = offset,
            samples = samples.len(),
            step_us = slew.step_us,
            "NTP sync complete"
        );
        Ok(offset)
    }

    /// Runs the query series; failed or implausible queries are skipped
    pub fn measure_with<S: OffsetSource>(
        &self,
        source: &mut S,
        shutdown: &ShutdownToken,
    ) -> NtpResult<Vec<i64>> {
        let count = self.settings.query_count;
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            if shutdown.is_requested() {
                return Err(NtpError::Cancelled);
            }

            match source.query_offset() {
                Ok(offset) if offset.unsigned_abs() < self.settings.max_offset_us.unsigned_abs() => {
                    samples.push(offset)
                }
                Ok(offset) => warn!(query = i + 1, "{}", NtpError::Implausible(offset)),
                Err(e) => debug!(query = i + 1, error = %e, "NTP query failed"),
            }

            if i + 1 < count && !shutdown.sleep(self.settings.query_spacing) {
                return Err(NtpError::Cancelled);
            }
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        replies: VecDeque<NtpResult<i64>>,
        calls: usize,
    }

    impl Scripted {
        fn new(replies: Vec<NtpResult<i64>>) -> Self {
            Self {
                replies: replies.into(),
                calls: 0,
            }
        }
    }

    impl OffsetSource for Scripted {
        fn query_offset(&mut self) -> NtpResult<i64> {
            self.calls += 1;
            self.replies
                .pop_front()
                .unwrap_or(Err(NtpError::Timeout(Duration::from_secs(5))))
        }
    }

    fn fast_sync(rate: FrameRate) -> NtpSynchronizer {
        NtpSynchronizer::new("127.0.0.1", rate).with_settings(NtpSettings {
            query_spacing: Duration::ZERO,
            ..NtpSettings::default()
        })
    }

    #[test]
    fn test_select_offset_minimum_magnitude() {
        assert_eq!(select_offset(&[5000, -300, 9_999_999, 450], DEFAULT_MAX_OFFSET_US), Some(-300));
    }

    #[test]
    fn test_select_offset_discards_implausible() {
        assert_eq!(select_offset(&[10_000_000, -12_000_000], DEFAULT_MAX_OFFSET_US), None);
        assert_eq!(select_offset(&[10_000_000, 9_000_000], DEFAULT_MAX_OFFSET_US), Some(9_000_000));
        assert_eq!(select_offset(&[], DEFAULT_MAX_OFFSET_US), None);
    }

    #[test]
    fn test_select_offset_tie_keeps_first() {
        assert_eq!(select_offset(&[300, -300], DEFAULT_MAX_OFFSET_US), Some(300));
        assert_eq!(select_offset(&[-300, 300], DEFAULT_MAX_OFFSET_US), Some(-300));
    }

    #[test]
    fn test_synchronize_retargets_state() {
        let sync = fast_sync(FrameRate::Fps25);
        let state = NtpState::new();
        let mut source = Scripted::new(vec![Ok(5000), Ok(-300), Ok(9_999_999), Ok(450), Ok(12_000_000)]);

        let offset = sync
            .synchronize_with(&mut source, &state, &ShutdownToken::new())
            .unwrap();

        assert_eq!(offset, -300);
        assert_eq!(source.calls, 5);
        let snap = state.snapshot();
        assert_eq!(snap.target_offset_us, -300);
        assert_eq!(snap.current_offset_us, 0);
        assert_eq!(snap.step_us, -1);
    }

    #[test]
    fn test_failed_queries_are_skipped() {
        let sync = fast_sync(FrameRate::Fps30);
        let state = NtpState::new();
        let mut source = Scripted::new(vec![
            Err(NtpError::Timeout(Duration::from_secs(5))),
            Err(NtpError::MalformedReply("short".into())),
            Ok(90_000),
        ]);

        assert_eq!(
            sync.synchronize_with(&mut source, &state, &ShutdownToken::new()).unwrap(),
            90_000
        );
        // 30 s * 30 fps = 900 frames
        assert_eq!(state.snapshot().step_us, 100);
    }

    #[test]
    fn test_total_failure_leaves_state_untouched() {
        let sync = fast_sync(FrameRate::Fps25);
        let state = NtpState::new();
        state.retarget(1_000, 10);
        state.apply_step();
        let before = state.snapshot();

        let mut source = Scripted::new(vec![Ok(20_000_000)]);
        let result = sync.synchronize_with(&mut source, &state, &ShutdownToken::new());

        assert!(matches!(result, Err(NtpError::NoValidSamples(5))));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_cancelled_before_first_query() {
        let sync = fast_sync(FrameRate::Fps25);
        let state = NtpState::new();
        let shutdown = ShutdownToken::new();
        shutdown.request();

        let mut source = Scripted::new(vec![Ok(1)]);
        let result = sync.synchronize_with(&mut source, &state, &shutdown);

        assert!(matches!(result, Err(NtpError::Cancelled)));
        assert_eq!(source.calls, 0);
        assert_eq!(state.snapshot().target_offset_us, 0);
    }
}
