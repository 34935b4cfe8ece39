//! Periodic telemetry, independent of command traffic.
//!
//! The emitter is polled; each tick compares the time since the last emission
//! with the interval and, once due, samples speed, RPM and coolant temperature
//! and hands them to a [`TelemetrySink`]. A tick costs at most three readings.

use log::{debug, info};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use crate::dispatch::SharedSampler;
use crate::sensors::{Reading, SensorSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Waiting,
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub speed: Reading,
    pub rpm: Reading,
    pub engine_temp: Reading,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speed={} rpm={} temp={}", self.speed, self.rpm, self.engine_temp)
    }
}

/// Diagnostic collaborator receiving periodic snapshots
pub trait TelemetrySink {
    fn emit(&mut self, snapshot: &Snapshot);
}

/// Writes snapshots to the log at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&mut self, snapshot: &Snapshot) {
        info!("Telemetry: {snapshot}");
    }
}

impl<F: FnMut(&Snapshot)> TelemetrySink for F {
    fn emit(&mut self, snapshot: &Snapshot) {
        self(snapshot);
    }
}

pub struct TelemetryEmitter {
    interval: Duration,
    last_emit: Instant,
    state: EmitterState,
}

impl TelemetryEmitter {
    /// The first emission happens one `interval` after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_emit: start,
            state: EmitterState::Waiting,
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advance the emitter to `now`. Returns the snapshot if one was emitted.
    pub fn tick<S, K>(
        &mut self,
        now: Instant,
        sampler: &SharedSampler<S>,
        sink: &mut K,
    ) -> Option<Snapshot>
    where
        S: SensorSource,
        K: TelemetrySink + ?Sized,
    {
        if now.saturating_duration_since(self.last_emit) < self.interval {
            return None;
        }
        self.state = EmitterState::Due;

        let snapshot = {
            let mut sampler = sampler.lock().unwrap_or_else(PoisonError::into_inner);
            Snapshot {
                speed: sampler.sample_speed(),
                rpm: sampler.sample_rpm(),
                engine_temp: sampler.sample_engine_temp(),
            }
        };
        sink.emit(&snapshot);

        self.last_emit = now;
        self.state = EmitterState::Waiting;
        Some(snapshot)
    }

    /// Tick every `poll` until `stop` is set.
    pub fn run<S, K>(
        mut self,
        sampler: &SharedSampler<S>,
        sink: &mut K,
        poll: Duration,
        stop: &AtomicBool,
    )
    where
        S: SensorSource,
        K: TelemetrySink + ?Sized,
    {
        debug!("Telemetry emitter started, interval {:?}", self.interval);
        while !stop.load(Ordering::Relaxed) {
            self.tick(Instant::now(), sampler, sink);
            std::thread::sleep(poll);
        }
        debug!("Telemetry emitter stopped");
    }
}
