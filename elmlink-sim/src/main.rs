//! Host-side stand-in for the wireless transport
//!
//! Exposes the command characteristic over TCP: every CR- or LF-terminated
//! line is one write, every reply is sent back followed by `\r\n`. A pulse
//! thread plays the wheel sensor and a telemetry thread logs periodic samples.
//!
//! Usage: cargo run -p elmlink-sim -- [OPTIONS]
//! Then `nc 127.0.0.1 35000` and type `ATZ`, `010C`, ...

use anyhow::{Context, Result};
use clap::Parser;
use elmlink_core::{
    Config, Interpreter, Link, LogLevel, LogSink, PulseCounter, RandomSource, SensorSampler,
    SensorSource, SharedSampler, TelemetryEmitter,
};
use log::{debug, error, info, warn};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Bound on a single command line; the rest of a longer line is discarded
const MAX_LINE_LEN: usize = 64;
const TELEMETRY_POLL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "elmlink-sim")]
#[command(about = "Serve the ELM327 emulator core over TCP")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:35000")]
    listen: String,

    /// JSON config file (wheel circumference, telemetry interval, payload cap)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated wheel pulses per second (0 = wheel stopped)
    #[arg(short, long, default_value = "5")]
    pulse_hz: f64,

    /// Seed for the simulated RPM/temperature readings
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl From<CliLogLevel> for LogLevel {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Off => Self::Off,
            CliLogLevel::Error => Self::Error,
            CliLogLevel::Warn => Self::Warn,
            CliLogLevel::Info => Self::Info,
            CliLogLevel::Debug => Self::Debug,
        }
    }
}

/// Install the subscriber. All our output goes through `log`, so the `log`
/// max level is the only filter; it is lowered again once the config is read.
fn init_logging(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .init();
    log::set_max_level(level.as_level_filter());
}

/// Expects logging to be up: a bad `--config` only warns and falls back.
fn load_config(args: &Args) -> Config {
    let mut config = args
        .config
        .as_deref()
        .map_or_else(Config::default, Config::load_or_default);
    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }
    config.validate();
    config
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_level.map_or_else(LogLevel::default, LogLevel::from));
    let config = load_config(&args);
    log::set_max_level(config.log_level.as_level_filter());

    info!(
        "Starting elmlink-sim: wheel={}m telemetry={}ms payload_cap={}",
        config.wheel_circumference_m, config.telemetry_interval_ms, config.max_payload_len
    );

    let pulses = Arc::new(PulseCounter::new());
    let source = match args.seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    };
    let sampler: SharedSampler<_> = Arc::new(Mutex::new(
        SensorSampler::new(Arc::clone(&pulses), source)
            .with_wheel_circumference(config.wheel_circumference_m),
    ));

    spawn_pulse_source(Arc::clone(&pulses), args.pulse_hz);
    spawn_telemetry(Arc::clone(&sampler), config.telemetry_interval());

    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Listening on {}", args.listen);

    let interpreter = Interpreter::new(sampler);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                debug!("Accepted {:?}", stream.peer_addr());
                let link =
                    Link::new(interpreter.clone()).with_max_payload_len(config.max_payload_len);
                std::thread::spawn(move || handle_client(stream, &link));
            }
            Err(e) => warn!("Connection error: {e}"),
        }
    }

    Ok(())
}

/// Edge-trigger stand-in: one `increment` per simulated wheel pulse
fn spawn_pulse_source(pulses: Arc<PulseCounter>, pulse_hz: f64) {
    if !pulse_hz.is_finite() || pulse_hz <= 0.0 {
        info!("Pulse source disabled");
        return;
    }
    let period = Duration::from_secs_f64(1.0 / pulse_hz);
    info!("Pulse source: {pulse_hz} Hz");
    std::thread::spawn(move || loop {
        std::thread::sleep(period);
        pulses.increment();
    });
}

fn spawn_telemetry(sampler: SharedSampler<RandomSource>, interval: Duration) {
    std::thread::spawn(move || {
        let stop = AtomicBool::new(false);
        TelemetryEmitter::new(interval, Instant::now()).run(
            &sampler,
            &mut LogSink,
            TELEMETRY_POLL,
            &stop,
        );
    });
}

fn handle_client<S: SensorSource>(mut stream: TcpStream, link: &Link<S>) {
    link.on_connect();

    let mut buffer = Vec::with_capacity(MAX_LINE_LEN);
    let mut byte = [0u8; 1];
    // set once a line overflows, cleared at its terminator
    let mut discarding = false;

    loop {
        match stream.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                let ch = byte[0];
                if ch == b'\r' || ch == b'\n' {
                    if discarding {
                        discarding = false;
                        buffer.clear();
                        continue;
                    }
                    if buffer.is_empty() {
                        continue;
                    }
                    let mut write_result = Ok(());
                    link.on_write(&buffer, &mut |payload: &[u8]| {
                        write_result = stream
                            .write_all(payload)
                            .and_then(|()| stream.write_all(b"\r\n"));
                    });
                    if let Err(e) = write_result {
                        error!("Write error: {e}");
                        break;
                    }
                    buffer.clear();
                } else if discarding {
                    // rest of an overlong line
                } else if buffer.len() < MAX_LINE_LEN {
                    buffer.push(ch);
                } else {
                    warn!("Command exceeds {MAX_LINE_LEN} bytes, discarding line");
                    discarding = true;
                    buffer.clear();
                }
            }
            Err(e) => {
                error!("Read error: {e}");
                break;
            }
        }
    }

    link.on_disconnect();
}
