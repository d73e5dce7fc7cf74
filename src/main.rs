use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ltc_timecode::audio::AudioDeviceManager;
use ltc_timecode::engine::EngineConfig;
use ltc_timecode::{
    Cli, Coordinator, CpalTransport, FrameRate, NullTransport, Settings, ShutdownToken,
    TransportConfig,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.list_rates {
        for rate in FrameRate::all() {
            let drop = if rate.drop_frame() { " (drop frame)" } else { "" };
            println!("{:<8} {:.3} fps{}", rate.name(), rate.fps(), drop);
        }
        return ExitCode::SUCCESS;
    }

    if cli.list_devices {
        let manager = AudioDeviceManager::new();
        println!("Host: {}", manager.host_name());
        for device in manager.list_output_devices() {
            println!(
                "{:>3}  {}{}{}",
                device.index,
                device.name,
                if device.is_default { " [default]" } else { "" },
                if device.supports_output_rate { "" } else { " (no 48 kHz output)" },
            );
        }
        return ExitCode::SUCCESS;
    }

    let settings = match cli.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let shutdown = ShutdownToken::new();
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, shutdown.flag()) {
            error!(signal, error = %e, "Failed to register signal handler");
            return ExitCode::FAILURE;
        }
    }

    // Under systemd (INVOCATION_ID set) or without a terminal, log instead of drawing
    let interactive =
        !cli.quiet && io::stdout().is_terminal() && std::env::var_os("INVOCATION_ID").is_none();
    log_startup(&settings, cli.null_output);

    let coordinator = Coordinator::new(EngineConfig::from_settings(&settings)).with_shutdown(shutdown);
    let display: Option<Box<dyn Write + Send>> = if interactive {
        Some(Box::new(io::stdout()))
    } else {
        None
    };

    let transport = TransportConfig::new(settings.device.clone(), settings.frame_rate, settings.buffer_periods);
    let result = if cli.null_output {
        coordinator.run(move || Ok(NullTransport::new(&transport)), display)
    } else {
        coordinator.run(move || CpalTransport::open(&transport), display)
    };

    match result {
        Ok(summary) => {
            info!(
                frames = summary.producer.frames,
                underruns = summary.producer.underruns,
                reopens = summary.producer.reopens,
                ntp_syncs = summary.ntp.succeeded,
                "Stopped"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_startup(settings: &Settings, null_output: bool) {
    let device = if null_output {
        "null"
    } else {
        settings.device.as_deref().unwrap_or("default")
    };
    info!(
        rate = settings.frame_rate.name(),
        device,
        ntp_server = settings.ntp_server.as_deref().unwrap_or("none"),
        zone = ?settings.timezone,
        realtime = settings.realtime,
        cpu_core = ?settings.cpu_core(),
        "Starting LTC generator"
    );
}
