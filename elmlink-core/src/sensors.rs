//! Speed, RPM, and coolant temperature readings.
//!
//! Speed is derived from the wheel [`PulseCounter`]. RPM and temperature have
//! no physical sensor behind them; a [`SensorSource`] stands in, uniform-random
//! in production and a fixed sequence under test.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::config::{DEFAULT_WHEEL_CIRCUMFERENCE_M, ENGINE_TEMP_RANGE, RPM_RANGE};
use crate::pulse::PulseCounter;

/// Unit tag carried by every [`Reading`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    KmPerHour,
    Rpm,
    Celsius,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::KmPerHour => "km/h",
            Self::Rpm => "rpm",
            Self::Celsius => "°C",
        }
    }
}

/// A single sensor value, produced fresh on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub value: i64,
    pub unit: Unit,
}

impl Reading {
    pub const fn new(value: i64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

/// Source of the simulated (non pulse-derived) readings.
pub trait SensorSource: Send {
    fn rpm(&mut self) -> i64;
    fn engine_temp(&mut self) -> i64;
}

/// Uniform draws from [`RPM_RANGE`] and [`ENGINE_TEMP_RANGE`].
pub struct RandomSource<R = StdRng> {
    rng: R,
}

impl RandomSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible stream, same seed gives the same readings
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn draw(&mut self, range: RangeInclusive<i64>) -> i64 {
        self.rng.gen_range(range)
    }
}

impl<R: Rng + Send> SensorSource for RandomSource<R> {
    fn rpm(&mut self) -> i64 {
        self.draw(RPM_RANGE)
    }

    fn engine_temp(&mut self) -> i64 {
        self.draw(ENGINE_TEMP_RANGE)
    }
}

/// Replays fixed sequences, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct FixedSource {
    rpm: Vec<i64>,
    temp: Vec<i64>,
    rpm_idx: usize,
    temp_idx: usize,
}

impl FixedSource {
    /// # Panics
    /// Panics if either sequence is empty.
    pub fn new(rpm: Vec<i64>, temp: Vec<i64>) -> Self {
        assert!(
            !rpm.is_empty() && !temp.is_empty(),
            "FixedSource needs at least one value per sequence"
        );
        Self {
            rpm,
            temp,
            rpm_idx: 0,
            temp_idx: 0,
        }
    }

    /// Always returns the same pair
    pub fn constant(rpm: i64, temp: i64) -> Self {
        Self::new(vec![rpm], vec![temp])
    }
}

fn next_in(seq: &[i64], idx: &mut usize) -> i64 {
    let value = seq[*idx % seq.len()];
    *idx = idx.wrapping_add(1);
    value
}

impl SensorSource for FixedSource {
    fn rpm(&mut self) -> i64 {
        next_in(&self.rpm, &mut self.rpm_idx)
    }

    fn engine_temp(&mut self) -> i64 {
        next_in(&self.temp, &mut self.temp_idx)
    }
}

/// Produces readings on demand. Nothing is cached between calls.
pub struct SensorSampler<S> {
    pulses: Arc<PulseCounter>,
    wheel_circumference_m: f64,
    source: S,
}

impl<S: SensorSource> SensorSampler<S> {
    pub fn new(pulses: Arc<PulseCounter>, source: S) -> Self {
        Self {
            pulses,
            wheel_circumference_m: DEFAULT_WHEEL_CIRCUMFERENCE_M,
            source,
        }
    }

    /// Non-positive or non-finite values are rejected and the current
    /// circumference is kept, so speed can never go negative.
    #[must_use]
    pub fn with_wheel_circumference(mut self, meters: f64) -> Self {
        if meters.is_finite() && meters > 0.0 {
            self.wheel_circumference_m = meters;
        } else {
            warn!(
                "Ignoring wheel circumference {meters}, keeping {}",
                self.wheel_circumference_m
            );
        }
        self
    }

    pub fn wheel_circumference(&self) -> f64 {
        self.wheel_circumference_m
    }

    pub fn pulse_counter(&self) -> &Arc<PulseCounter> {
        &self.pulses
    }

    /// Drains the pulse counter: a second call with no new pulses yields 0.
    pub fn sample_speed(&mut self) -> Reading {
        let pulses = self.pulses.read_and_reset();
        Reading::new(speed_from_pulses(pulses, self.wheel_circumference_m), Unit::KmPerHour)
    }

    pub fn sample_rpm(&mut self) -> Reading {
        Reading::new(self.source.rpm(), Unit::Rpm)
    }

    pub fn sample_engine_temp(&mut self) -> Reading {
        Reading::new(self.source.engine_temp(), Unit::Celsius)
    }
}

/// `pulses * (circumference / 1000) * 3600`, truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
pub fn speed_from_pulses(pulses: u32, wheel_circumference_m: f64) -> i64 {
    (f64::from(pulses) * (wheel_circumference_m / 1000.0) * 3600.0) as i64
}
