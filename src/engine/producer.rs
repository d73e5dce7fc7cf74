// Audio producer - the time-critical loop
//
// Per output period:
//   1. advance the NTP slew by one step, keeping the offset it replaced
//   2. read the queue delay and compute the output timecode with that offset
//   3. encode one LTC frame and write it (blocks until the queue has room)
//   4. publish the timecode for the display (non-blocking)
//
// Recoverable transport errors restart the stream in place. Anything else
// closes the transport and reopens it with backoff; when the attempts run
// out the loop returns the error.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{debug, error, info, warn};

use crate::audio::transport::AudioTransport;
use crate::audio::{AudioError, AudioResult};
use crate::connection::reconnect::ReconnectionStrategy;
use crate::engine::snapshot::DisplaySnapshot;
use crate::ltc::TimecodeEncoder;
use crate::shutdown::ShutdownToken;
use crate::system::priority::{self, RealtimeRequest};
use crate::timecode::clock::TimecodeClock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub frames: u64,
    pub recoveries: u64,
    pub reopens: u64,
    pub underruns: u64,
}

pub struct Producer {
    clock: Arc<TimecodeClock>,
    encoder: Box<dyn TimecodeEncoder>,
    snapshot: DisplaySnapshot,
    realtime: RealtimeRequest,
    reconnect: ReconnectionStrategy,
}

impl Producer {
    pub fn new(
        clock: Arc<TimecodeClock>,
        encoder: Box<dyn TimecodeEncoder>,
        snapshot: DisplaySnapshot,
        realtime: RealtimeRequest,
        reconnect: ReconnectionStrategy,
    ) -> Self {
        Self {
            clock,
            encoder,
            snapshot,
            realtime,
            reconnect,
        }
    }

    /// Produces one frame: slew step, timecode, encode, write, publish
    pub fn produce_frame<T: AudioTransport>(&mut self, transport: &mut T) -> AudioResult<()> {
        let now_us = self.clock.now_us();
        // One lock per frame: the step hands back the offset in effect for it
        let offset_us = match self.clock.source().ntp_state() {
            Some(ntp) => ntp.apply_step(),
            None => 0,
        };
        let delay = transport.delay_samples();
        let timecode = self
            .clock
            .output_timecode_with_offset(now_us, offset_us, delay);

        let samples = self.encoder.encode(&timecode);
        transport.write(samples)?;

        self.snapshot.publish(timecode);
        Ok(())
    }

    /// Opens the transport on this thread, reports the open result through
    /// `ready`, then loops until shutdown or an unrecoverable error
    pub fn run<T, F>(
        mut self,
        mut open: F,
        ready: Sender<AudioResult<()>>,
        shutdown: &ShutdownToken,
    ) -> Result<ProducerStats, AudioError>
    where
        T: AudioTransport,
        F: FnMut() -> AudioResult<T>,
    {
        priority::prepare_producer_thread(&self.realtime);

        let mut transport = match open() {
            Ok(transport) => {
                let _ = ready.send(Ok(()));
                transport
            }
            Err(e) => {
                let _ = ready.send(Err(e.clone()));
                return Err(e);
            }
        };

        let mut stats = ProducerStats::default();
        let result = loop {
            if shutdown.is_requested() {
                break Ok(());
            }

            match self.produce_frame(&mut transport) {
                Ok(()) => stats.frames += 1,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Audio write failed, recovering stream");
                    match transport.recover() {
                        Ok(()) => stats.recoveries += 1,
                        Err(recover_err) => {
                            if let Err(fatal) =
                                self.reopen(&mut open, &mut transport, recover_err, shutdown, &mut stats)
                            {
                                break Err(fatal);
                            }
                        }
                    }
                }
                Err(e) => {
                    if let Err(fatal) = self.reopen(&mut open, &mut transport, e, shutdown, &mut stats) {
                        break Err(fatal);
                    }
                }
            }
        };

        stats.underruns = transport.underruns();
        transport.close();
        info!(frames = stats.frames, recoveries = stats.recoveries, reopens = stats.reopens, "Audio producer stopped");

        result.map(|()| stats)
    }

    fn reopen<T, F>(
        &mut self,
        open: &mut F,
        transport: &mut T,
        cause: AudioError,
        shutdown: &ShutdownToken,
        stats: &mut ProducerStats,
    ) -> Result<(), AudioError>
    where
        T: AudioTransport,
        F: FnMut() -> AudioResult<T>,
    {
        warn!(error = %cause, "Audio device lost, reopening");
        transport.close();

        while let Some(delay) = self.reconnect.next_delay() {
            if !shutdown.sleep(delay) {
                return Ok(());
            }

            match open() {
                Ok(fresh) => {
                    *transport = fresh;
                    self.reconnect.reset();
                    stats.reopens += 1;
                    info!("Audio device reopened");
                    return Ok(());
                }
                Err(e) => debug!(
                    attempt = self.reconnect.current_attempt(),
                    error = %e,
                    "Reopen failed"
                ),
            }
        }

        error!(
            attempts = self.reconnect.max_attempts(),
            "Giving up on audio device"
        );
        Err(cause)
    }
}
