//! Wheel pulse counter shared between the edge-trigger callback and the sampler.
//!
//! The edge-trigger context may preempt the main loop at any point, so the
//! counter is a single `AtomicU32`: `increment` is a `fetch_add` and
//! `read_and_reset` is a `swap(0)`. An increment either lands before the swap
//! (and is returned by it) or after it (and is returned by the next one).
//!
//! Accepted limitation: the counter wraps after 2^32 pulses between two
//! samples. At any plausible wheel speed and sampling rate that never happens.

use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide pulse accumulator.
///
/// Only `increment` and `read_and_reset` are exposed; there is no raw access
/// that could split the read from the reset.
#[derive(Debug, Default)]
pub struct PulseCounter {
    pulses: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            pulses: AtomicU32::new(0),
        }
    }

    /// Record one edge. Safe to call from the interrupt/edge-trigger context:
    /// never blocks, never loses an update.
    #[inline]
    pub fn increment(&self) {
        self.pulses.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the pulses accumulated since the previous call and zero the counter.
    pub fn read_and_reset(&self) -> u32 {
        self.pulses.swap(0, Ordering::AcqRel)
    }
}
