//! ELM327-style OBD2 interpreter core
//!
//! Accepts short ASCII commands delivered by a wireless transport, classifies
//! them as adapter ("AT") commands or mode 01 PID requests, and produces the
//! reply string. Readings come from a wheel pulse counter (speed) and a
//! simulated source (RPM, coolant temperature).
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use elmlink_core::{FixedSource, Interpreter, PulseCounter, SensorSampler};
//!
//! let pulses = Arc::new(PulseCounter::new());
//! let sampler = SensorSampler::new(pulses, FixedSource::constant(1500, 90));
//! let interp = Interpreter::new(Arc::new(Mutex::new(sampler)));
//!
//! assert_eq!(interp.handle(" atz "), "ELM327 v1.5");
//! assert_eq!(interp.handle("010C"), "410C 5DC");
//! assert_eq!(interp.handle("010D"), "410D 0");
//! ```

pub mod at;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod obd;
pub mod pulse;
pub mod sensors;
pub mod telemetry;
pub mod transport;

pub use at::AtCommand;
pub use config::{Config, ConfigError, LogLevel};
pub use dispatch::{normalize, CommandKind, Interpreter, SharedSampler};
pub use error::LinkError;
pub use obd::{parse_pid_reply, Pid};
pub use pulse::PulseCounter;
pub use sensors::{FixedSource, RandomSource, Reading, SensorSampler, SensorSource, Unit};
pub use telemetry::{EmitterState, LogSink, Snapshot, TelemetryEmitter, TelemetrySink};
pub use transport::{ConnectionState, Link, ReplySink};
