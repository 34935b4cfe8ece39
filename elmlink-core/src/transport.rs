//! Boundary with the wireless transport collaborator.
//!
//! The collaborator owns advertising, connections and the characteristic
//! plumbing. It calls [`Link::on_write`] for every write on the command
//! characteristic and [`Link::on_connect`] / [`Link::on_disconnect`] on
//! lifecycle events; the link answers through a [`ReplySink`].

use atomic_enum::atomic_enum;
use log::{debug, info, warn};
use std::sync::atomic::Ordering;

use crate::config::DEFAULT_MAX_PAYLOAD_LEN;
use crate::dispatch::{CommandKind, Interpreter};
use crate::error::LinkError;
use crate::sensors::SensorSource;

/// Only gates the connect/disconnect log lines; no protocol state depends on it.
#[atomic_enum]
#[derive(PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Outbound half of the characteristic channel
pub trait ReplySink {
    fn send_reply(&mut self, payload: &[u8]);
}

impl<F: FnMut(&[u8])> ReplySink for F {
    fn send_reply(&mut self, payload: &[u8]) {
        self(payload);
    }
}

/// Decode an inbound write. Only ASCII is accepted.
pub fn decode_command(raw: &[u8]) -> Result<&str, LinkError> {
    match raw.iter().position(|b| !b.is_ascii()) {
        Some(valid_up_to) => Err(LinkError::Decode { valid_up_to }),
        // all ASCII, so valid UTF-8
        None => std::str::from_utf8(raw).map_err(|e| LinkError::Decode {
            valid_up_to: e.valid_up_to(),
        }),
    }
}

/// Truncate `reply` to `cap` bytes, reporting whether truncation happened.
pub fn fit_payload(reply: &[u8], cap: usize) -> (&[u8], Option<LinkError>) {
    if reply.len() > cap {
        (
            &reply[..cap],
            Some(LinkError::PayloadTooLong {
                len: reply.len(),
                cap,
            }),
        )
    } else {
        (reply, None)
    }
}

pub struct Link<S> {
    interpreter: Interpreter<S>,
    max_payload_len: usize,
    connection: AtomicConnectionState,
}

impl<S: SensorSource> Link<S> {
    pub fn new(interpreter: Interpreter<S>) -> Self {
        Self {
            interpreter,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            connection: AtomicConnectionState::new(ConnectionState::Disconnected),
        }
    }

    #[must_use]
    pub fn with_max_payload_len(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    pub fn on_connect(&self) {
        let previous = self
            .connection
            .swap(ConnectionState::Connected, Ordering::Relaxed);
        if previous != ConnectionState::Connected {
            info!("Client connected");
        }
    }

    pub fn on_disconnect(&self) {
        let previous = self
            .connection
            .swap(ConnectionState::Disconnected, Ordering::Relaxed);
        if previous != ConnectionState::Disconnected {
            info!("Client disconnected");
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.load(Ordering::Relaxed)
    }

    /// Reply text for one inbound write, before the payload cap is applied.
    ///
    /// Input that is not ASCII cannot match any known command; it gets the
    /// unrecognized reply for its best-effort class.
    pub fn reply_to(&self, raw: &[u8]) -> String {
        match decode_command(raw) {
            Ok(command) => self.interpreter.handle(command),
            Err(e) => {
                let kind = CommandKind::classify_bytes(raw);
                warn!("Undecodable command ({e}), replying as {kind:?}");
                kind.unrecognized_reply().to_string()
            }
        }
    }

    /// Handle one write on the command characteristic: exactly one reply is sent.
    pub fn on_write<R: ReplySink + ?Sized>(&self, raw: &[u8], sink: &mut R) {
        let reply = self.reply_to(raw);
        let (payload, truncated) = fit_payload(reply.as_bytes(), self.max_payload_len);
        if let Some(e) = truncated {
            warn!("{e}, truncating");
        }
        debug!("Sending {} byte reply", payload.len());
        sink.send_reply(payload);
    }
}
