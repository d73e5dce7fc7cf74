// Full pipeline on the null output: clock -> encoder -> transport -> decoder

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ltc_timecode::audio::null::SampleSink;
use ltc_timecode::engine::{DisplaySource, EngineConfig};
use ltc_timecode::timecode::CalendarZone;
use ltc_timecode::{
    Coordinator, FrameRate, LtcDecoder, NullTransport, Settings, TransportConfig,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn settings(rate: FrameRate) -> Settings {
    Settings {
        frame_rate: rate,
        realtime: false,
        lock_memory: false,
        timezone: CalendarZone::Utc,
        display_source: DisplaySource::Output,
        buffer_periods: 2,
        ..Settings::default()
    }
}

fn stop_after(coordinator: &Coordinator, delay: Duration) -> thread::JoinHandle<()> {
    let shutdown = coordinator.shutdown_token();
    thread::spawn(move || {
        thread::sleep(delay);
        shutdown.request();
    })
}

#[test]
fn test_every_written_frame_decodes() {
    let rate = FrameRate::Fps25;
    let settings = settings(rate);
    let coordinator = Coordinator::new(EngineConfig::from_settings(&settings));
    let sink = SampleSink::default();

    let transport = TransportConfig::new(None, rate, settings.buffer_periods);
    let writer = sink.clone();
    let stopper = stop_after(&coordinator, Duration::from_millis(500));
    let summary = coordinator
        .run(move || Ok(NullTransport::new(&transport).with_sink(writer.clone())), None)
        .unwrap();
    stopper.join().unwrap();

    let samples = sink.lock().clone();
    assert_eq!(samples.len() as u64, summary.producer.frames * 1920);

    let mut decoder = LtcDecoder::new(rate, 48_000);
    let mut decoded = decoder.decode(&samples);
    decoded.extend(decoder.flush());
    assert_eq!(decoded.len() as u64, summary.producer.frames);

    // Consecutive periods usually carry consecutive labels
    let steps = decoded
        .windows(2)
        .filter(|w| {
            let a = w[0].frame.timecode().frame_of_day(rate);
            let b = w[1].frame.timecode().frame_of_day(rate);
            b == a + 1
        })
        .count();
    assert!(steps > 0);

    let last = coordinator.snapshot().latest().unwrap();
    assert_eq!(
        decoded.last().unwrap().frame.timecode().time_fields(),
        last.timecode.time_fields()
    );
}

#[test]
fn test_display_follows_output() {
    let rate = FrameRate::Fps30Drop;
    let settings = settings(rate);
    let coordinator = Coordinator::new(EngineConfig::from_settings(&settings));
    let screen = Captured::default();

    let transport = TransportConfig::new(None, rate, settings.buffer_periods);
    let stopper = stop_after(&coordinator, Duration::from_millis(300));
    let summary = coordinator
        .run(
            move || Ok(NullTransport::new(&transport)),
            Some(Box::new(screen.clone())),
        )
        .unwrap();
    stopper.join().unwrap();

    assert!(summary.display_renders > 0);
    let text = String::from_utf8(screen.0.lock().clone()).unwrap();
    assert!(text.starts_with('\r'));
    assert!(text.ends_with('\n'));
    assert!(text.contains("@ 30.000 fps"));
    // Drop-frame separator
    assert!(text.contains(';'));
}

#[test]
fn test_shutdown_before_start_skips_audio() {
    let coordinator = Coordinator::new(EngineConfig::from_settings(&settings(FrameRate::Fps24)));
    coordinator.shutdown_token().request();

    let transport = TransportConfig::new(None, FrameRate::Fps24, 2);
    let summary = coordinator
        .run(move || Ok(NullTransport::new(&transport)), None)
        .unwrap();

    assert_eq!(summary.producer.frames, 0);
    assert!(coordinator.snapshot().latest().is_none());
}

#[test]
fn test_threads_exit_promptly_after_request() {
    let rate = FrameRate::Fps2997;
    let settings = settings(rate);
    let coordinator = Coordinator::new(EngineConfig::from_settings(&settings));

    let shutdown = coordinator.shutdown_token();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(400));
        let requested = Instant::now();
        shutdown.request();
        requested
    });

    let transport = TransportConfig::new(None, rate, settings.buffer_periods);
    let summary = coordinator
        .run(move || Ok(NullTransport::new(&transport)), Some(Box::new(io::sink())))
        .unwrap();
    let requested = stopper.join().unwrap();

    // Producer finishes its current period, display its current refresh
    assert!(
        requested.elapsed() < Duration::from_millis(250),
        "shutdown took {:?}",
        requested.elapsed()
    );
    assert!(summary.producer.frames > 0);
    assert!(summary.display_renders > 0);
}
