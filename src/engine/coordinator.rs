// Coordinator - owns the shared state and the three threads
//
//   ltc-audio    producer, real-time priority
//   ltc-display  console line, idle priority (optional)
//   ltc-ntp      periodic resync (only with a server configured)
//
// All of them watch the same ShutdownToken. When the producer stops, for
// whatever reason, the coordinator requests shutdown so the others follow.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::SAMPLE_RATE;
use crate::audio::transport::AudioTransport;
use crate::audio::AudioResult;
use crate::config::Settings;
use crate::connection::reconnect::ReconnectionStrategy;
use crate::engine::EngineError;
use crate::engine::display::{DisplaySource, DisplayTask};
use crate::engine::producer::{Producer, ProducerStats};
use crate::engine::snapshot::DisplaySnapshot;
use crate::engine::sync_task::{SyncStats, SyncTask};
use crate::ltc::LtcEncoder;
use crate::ntp::{NtpError, NtpSettings, NtpState, NtpSynchronizer};
use crate::shutdown::ShutdownToken;
use crate::system::priority::RealtimeRequest;
use crate::timecode::clock::{CalendarZone, TimecodeClock};
use crate::timecode::latency::LatencyModel;
use crate::timecode::rate::FrameRate;
use crate::timecode::source::TimeSource;

#[derive(Debug, Clone)]
pub struct NtpConfig {
    pub server: String,
    pub sync_interval: Duration,
    pub settings: NtpSettings,
    pub step_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rate: FrameRate,
    pub zone: CalendarZone,
    pub latency: LatencyModel,
    pub amplitude: f32,
    pub encode_date: bool,
    pub display_source: DisplaySource,
    pub realtime: RealtimeRequest,
    pub reconnect: ReconnectionStrategy,
    pub ntp: Option<NtpConfig>,
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let ntp = settings.ntp_server.as_ref().map(|server| NtpConfig {
            server: server.clone(),
            sync_interval: settings.ntp_sync_interval(),
            settings: NtpSettings {
                slew_period_secs: settings.ntp_slew_period_secs,
                ..NtpSettings::default()
            },
            step_on_start: settings.step_on_start,
        });

        Self {
            rate: settings.frame_rate,
            zone: settings.timezone,
            latency: settings.latency,
            amplitude: settings.amplitude,
            encode_date: settings.encode_date,
            display_source: settings.display_source,
            realtime: settings.realtime_request(),
            reconnect: ReconnectionStrategy::default(),
            ntp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub producer: ProducerStats,
    pub display_renders: u64,
    pub ntp: SyncStats,
    /// Offset measured before audio started, if any
    pub initial_offset_us: Option<i64>,
}

pub struct Coordinator {
    config: EngineConfig,
    shutdown: ShutdownToken,
    ntp_state: NtpState,
    snapshot: DisplaySnapshot,
    clock: Arc<TimecodeClock>,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        let ntp_state = NtpState::new();
        let source = if config.ntp.is_some() {
            TimeSource::with_ntp(ntp_state.clone())
        } else {
            TimeSource::system()
        };

        let clock = TimecodeClock::new(config.rate, SAMPLE_RATE, source)
            .with_latency_model(config.latency)
            .with_zone(config.zone);

        Self {
            snapshot: DisplaySnapshot::new(config.rate),
            clock: Arc::new(clock),
            shutdown: ShutdownToken::new(),
            ntp_state,
            config,
        }
    }

    /// Replaces the internal token, e.g. with one already wired to signals
    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn ntp_state(&self) -> NtpState {
        self.ntp_state.clone()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.snapshot.clone()
    }

    pub fn clock(&self) -> Arc<TimecodeClock> {
        Arc::clone(&self.clock)
    }

    fn synchronizer(&self, ntp: &NtpConfig) -> NtpSynchronizer {
        NtpSynchronizer::new(ntp.server.clone(), self.config.rate).with_settings(ntp.settings.clone())
    }

    /// Best-effort measurement before any audio is produced
    pub fn initial_sync(&self) -> Option<i64> {
        let ntp = self.config.ntp.as_ref()?;
        match self.synchronizer(ntp).synchronize(&self.ntp_state, &self.shutdown) {
            Ok(offset) => {
                if ntp.step_on_start {
                    self.ntp_state.jump_to_target();
                }
                info!(offset_us = offset, stepped = ntp.step_on_start, "Initial NTP sync");
                Some(offset)
            }
            Err(NtpError::Cancelled) => None,
            Err(e) => {
                warn!(server = %ntp.server, error = %e, "Initial NTP sync failed, starting from system time");
                None
            }
        }
    }

    /// Runs until shutdown is requested or the audio output fails for good.
    ///
    /// `open` is called on the producer thread (device handles need not be
    /// `Send`). `display` receives the live timecode line when given.
    pub fn run<T, F>(
        &self,
        open: F,
        display: Option<Box<dyn Write + Send>>,
    ) -> Result<RunSummary, EngineError>
    where
        T: AudioTransport + 'static,
        F: FnMut() -> AudioResult<T> + Send + 'static,
    {
        let mut summary = RunSummary {
            initial_offset_us: self.initial_sync(),
            ..RunSummary::default()
        };
        if self.shutdown.is_requested() {
            return Ok(summary);
        }

        let encoder = LtcEncoder::new(self.config.rate, SAMPLE_RATE)
            .with_amplitude(self.config.amplitude)
            .with_date(self.config.encode_date);
        let producer = Producer::new(
            self.clock(),
            Box::new(encoder),
            self.snapshot(),
            self.config.realtime,
            self.config.reconnect.clone(),
        );

        let (ready_tx, ready_rx) = mpsc::channel();
        let shutdown = self.shutdown_token();
        let producer_handle = thread::Builder::new()
            .name("ltc-audio".into())
            .spawn(move || producer.run(open, ready_tx, &shutdown))
            .map_err(EngineError::Spawn)?;

        // Wait for the device to open before starting the helpers
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = producer_handle.join();
                return Err(EngineError::Audio(e));
            }
            Err(_) => {
                return Err(match producer_handle.join() {
                    Ok(Err(e)) => EngineError::Audio(e),
                    _ => EngineError::ThreadPanicked("ltc-audio"),
                });
            }
        }

        let display_handle = match display {
            Some(out) => {
                let task = DisplayTask::new(self.clock(), self.snapshot(), self.config.display_source, out);
                let shutdown = self.shutdown_token();
                match spawn_named("ltc-display", move || task.run(&shutdown)) {
                    Ok(handle) => Some(handle),
                    Err(e) => return Err(self.abandon(e, producer_handle, None)),
                }
            }
            None => None,
        };

        let sync_handle = match &self.config.ntp {
            Some(ntp) => {
                let task = SyncTask::new(self.synchronizer(ntp), self.ntp_state(), ntp.sync_interval);
                let shutdown = self.shutdown_token();
                match spawn_named("ltc-ntp", move || task.run(&shutdown)) {
                    Ok(handle) => Some(handle),
                    Err(e) => return Err(self.abandon(e, producer_handle, display_handle)),
                }
            }
            None => None,
        };

        let producer_result = producer_handle.join();
        self.shutdown.request();

        if let Some(handle) = display_handle {
            match handle.join() {
                Ok(Ok(renders)) => summary.display_renders = renders,
                Ok(Err(e)) => warn!(error = %e, "Display output failed"),
                Err(_) => warn!("Display thread panicked"),
            }
        }
        if let Some(handle) = sync_handle {
            match handle.join() {
                Ok(stats) => summary.ntp = stats,
                Err(_) => warn!("NTP sync thread panicked"),
            }
        }

        match producer_result {
            Ok(Ok(stats)) => {
                summary.producer = stats;
                Ok(summary)
            }
            Ok(Err(e)) => Err(EngineError::Audio(e)),
            Err(_) => Err(EngineError::ThreadPanicked("ltc-audio")),
        }
    }

    /// Stops and joins the threads already running when a helper could not start
    fn abandon(
        &self,
        cause: EngineError,
        producer: JoinHandle<AudioResult<ProducerStats>>,
        display: Option<JoinHandle<io::Result<u64>>>,
    ) -> EngineError {
        warn!(error = %cause, "Helper thread failed to start, stopping audio");
        self.shutdown.request();

        if let Some(handle) = display
            && handle.join().is_err()
        {
            warn!("Display thread panicked");
        }
        if producer.join().is_err() {
            warn!("Audio thread panicked");
        }
        cause
    }
}

fn spawn_named<R, F>(name: &'static str, body: F) -> Result<JoinHandle<R>, EngineError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(body)
        .map_err(EngineError::Spawn)
}
