//! Mode 01 (current data) PID requests.
//!
//! Replies use a simplified frame: `"41"`, the PID as two uppercase hex
//! digits, a space, then the reading in uppercase hex with no padding.
//! No checksum and no CR terminator, e.g. `"410C 5DC"` for 1500 RPM.

use log::debug;

use crate::sensors::{Reading, SensorSampler, SensorSource};

/// Reply for requests that match no known PID
pub const NO_DATA: &str = "NO DATA";

/// Mode-response header for mode 01
const MODE_01_RESPONSE: &str = "41";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Pid {
    CoolantTemp = 0x05,
    Rpm = 0x0C,
    Speed = 0x0D,
}

/// Full request strings, matched exactly.
const PID_TABLE: &[(&str, Pid)] = &[
    ("010C", Pid::Rpm),
    ("010D", Pid::Speed),
    ("0105", Pid::CoolantTemp),
];

impl Pid {
    /// Look up a normalized request. No prefix truncation: `"010C00"` is not RPM.
    pub fn from_request(command: &str) -> Option<Self> {
        PID_TABLE
            .iter()
            .find(|(code, _)| *code == command)
            .map(|&(_, pid)| pid)
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        PID_TABLE
            .iter()
            .map(|&(_, pid)| pid)
            .find(|pid| pid.code() == code)
    }

    pub fn sample<S: SensorSource>(self, sampler: &mut SensorSampler<S>) -> Reading {
        match self {
            Self::Rpm => sampler.sample_rpm(),
            Self::Speed => sampler.sample_speed(),
            Self::CoolantTemp => sampler.sample_engine_temp(),
        }
    }
}

/// Render a reply frame for `pid` carrying `value`
pub fn format_pid_reply(pid: Pid, value: i64) -> String {
    format!("{MODE_01_RESPONSE}{:02X} {value:X}", pid.code())
}

/// Handle a normalized OBD2 request, sampling the matching sensor
pub fn handle_obd_request<S: SensorSource>(
    command: &str,
    sampler: &mut SensorSampler<S>,
) -> String {
    match Pid::from_request(command) {
        Some(pid) => {
            let reading = pid.sample(sampler);
            debug!("PID {:02X}: {reading}", pid.code());
            format_pid_reply(pid, reading.value)
        }
        None => {
            debug!("Unrecognized PID request: {command:?}");
            NO_DATA.to_string()
        }
    }
}

/// Decode a reply produced by [`format_pid_reply`].
///
/// Accepts the frame with or without surrounding whitespace and in any case.
pub fn parse_pid_reply(reply: &str) -> Option<(Pid, i64)> {
    let text = reply.trim().to_uppercase();
    let (head, value) = text.split_once(' ')?;
    let pid_hex = head.strip_prefix(MODE_01_RESPONSE)?;
    if pid_hex.len() != 2 {
        return None;
    }
    let pid = Pid::from_code(u8::from_str_radix(pid_hex, 16).ok()?)?;
    let value = i64::from_str_radix(value, 16).ok()?;
    Some((pid, value))
}
