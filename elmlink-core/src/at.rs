//! Adapter configuration ("AT") commands.
//!
//! Only the first three characters of the normalized command are looked at,
//! so `ATE0`, `ATE1` and `ATE` all map to [`AtCommand::EchoOff`]. No adapter
//! state is kept: `ATE0` does not actually turn echo off.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand {
    Reset,
    Identify,
    EchoOff,
    HeadersOff,
    ProtocolAuto,
    Unknown,
}

/// Identification string returned by `ATZ` and `ATI`
pub const DEVICE_ID: &str = "ELM327 v1.5";

/// Recognized prefixes, checked in order; first match wins.
const AT_TABLE: &[(&str, AtCommand)] = &[
    ("ATZ", AtCommand::Reset),
    ("ATI", AtCommand::Identify),
    ("ATE", AtCommand::EchoOff),
    ("ATH", AtCommand::HeadersOff),
    ("ATS", AtCommand::ProtocolAuto),
];

impl AtCommand {
    /// Classify a normalized (trimmed, uppercased) command by its 3-character prefix.
    /// Shorter inputs are `Unknown`.
    pub fn parse(command: &str) -> Self {
        let Some(prefix) = command.get(..3) else {
            return Self::Unknown;
        };
        AT_TABLE
            .iter()
            .find(|(code, _)| *code == prefix)
            .map_or(Self::Unknown, |&(_, cmd)| cmd)
    }

    pub const fn reply(self) -> &'static str {
        match self {
            Self::Reset | Self::Identify => DEVICE_ID,
            Self::EchoOff | Self::HeadersOff | Self::ProtocolAuto => "OK",
            Self::Unknown => "ERROR",
        }
    }
}

/// Handle a normalized AT command and return its reply
pub fn handle_at_command(command: &str) -> &'static str {
    let cmd = AtCommand::parse(command);
    if cmd == AtCommand::Unknown {
        debug!("Unrecognized AT command: {command:?}");
    }
    cmd.reply()
}
