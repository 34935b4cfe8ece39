//! Command classification and dispatch.
//!
//! Every command yields exactly one reply. Commands starting with `AT` go to
//! the AT handler, everything else (empty input included) is treated as an
//! OBD2 request.

use log::debug;
use std::sync::{Arc, Mutex, PoisonError};

use crate::at::{handle_at_command, AtCommand};
use crate::obd::{handle_obd_request, NO_DATA};
use crate::sensors::{SensorSampler, SensorSource};

/// Sampler shared between command dispatch and periodic telemetry
pub type SharedSampler<S> = Arc<Mutex<SensorSampler<S>>>;

const AT_PREFIX: &str = "AT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    At,
    Obd,
}

impl CommandKind {
    pub fn classify(normalized: &str) -> Self {
        if normalized.starts_with(AT_PREFIX) {
            Self::At
        } else {
            Self::Obd
        }
    }

    /// Best-effort classification of input that is not valid text
    pub fn classify_bytes(raw: &[u8]) -> Self {
        let start = raw
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(raw.len());
        let trimmed = &raw[start..];
        if trimmed.len() >= 2 && trimmed[..2].eq_ignore_ascii_case(AT_PREFIX.as_bytes()) {
            Self::At
        } else {
            Self::Obd
        }
    }

    /// Reply for a command of this kind that matched nothing
    pub const fn unrecognized_reply(self) -> &'static str {
        match self {
            Self::At => AtCommand::Unknown.reply(),
            Self::Obd => NO_DATA,
        }
    }
}

/// Trim surrounding whitespace and uppercase
pub fn normalize(command: &str) -> String {
    command.trim().to_uppercase()
}

/// Routes commands to the AT or OBD2 handler.
pub struct Interpreter<S> {
    sampler: SharedSampler<S>,
}

impl<S> Clone for Interpreter<S> {
    fn clone(&self) -> Self {
        Self {
            sampler: Arc::clone(&self.sampler),
        }
    }
}

impl<S: SensorSource> Interpreter<S> {
    pub fn new(sampler: SharedSampler<S>) -> Self {
        Self { sampler }
    }

    pub fn sampler(&self) -> &SharedSampler<S> {
        &self.sampler
    }

    /// Interpret one raw command string and return its reply
    pub fn handle(&self, raw: &str) -> String {
        let command = normalize(raw);
        let kind = CommandKind::classify(&command);
        debug!("RX: {command:?} ({kind:?})");

        let reply = match kind {
            CommandKind::At => handle_at_command(&command).to_string(),
            CommandKind::Obd => {
                let mut sampler = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
                handle_obd_request(&command, &mut sampler)
            }
        };

        debug!("TX: {reply:?}");
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::PulseCounter;
    use crate::sensors::FixedSource;
    use proptest::prelude::*;

    fn interpreter() -> Interpreter<FixedSource> {
        let sampler = SensorSampler::new(
            Arc::new(PulseCounter::new()),
            FixedSource::constant(1500, 90),
        );
        Interpreter::new(Arc::new(Mutex::new(sampler)))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" atz  "), "ATZ");
        assert_eq!(normalize("\t010c\r\n"), "010C");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_classify() {
        assert_eq!(CommandKind::classify("ATZ"), CommandKind::At);
        assert_eq!(CommandKind::classify("AT"), CommandKind::At);
        assert_eq!(CommandKind::classify("A"), CommandKind::Obd);
        assert_eq!(CommandKind::classify("010C"), CommandKind::Obd);
        assert_eq!(CommandKind::classify(""), CommandKind::Obd);
    }

    #[test]
    fn test_classify_bytes() {
        assert_eq!(CommandKind::classify_bytes(b"  at\xff"), CommandKind::At);
        assert_eq!(CommandKind::classify_bytes(b"A\xff"), CommandKind::Obd);
        assert_eq!(CommandKind::classify_bytes(b"\xff\xfe"), CommandKind::Obd);
    }

    #[test]
    fn test_end_to_end() {
        let interp = interpreter();
        assert_eq!(interp.handle(" atz  "), "ELM327 v1.5");
        assert_eq!(interp.handle("010D"), "410D 0");
        assert_eq!(interp.handle("XYZQ"), "NO DATA");
        assert_eq!(interp.handle("010c"), "410C 5DC");
        assert_eq!(interp.handle("at"), "ERROR");
        assert_eq!(interp.handle(""), "NO DATA");
    }

    #[test]
    fn test_shared_sampler_sees_pulses() {
        let interp = interpreter();
        let counter = Arc::clone(interp.sampler().lock().unwrap().pulse_counter());
        for _ in 0..1000 {
            counter.increment();
        }
        assert_eq!(interp.handle("010D"), "410D 1D88");
        assert_eq!(interp.handle("010D"), "410D 0");
    }

    fn casing_and_padding() -> impl Strategy<Value = (Vec<bool>, String, String)> {
        (
            proptest::collection::vec(any::<bool>(), 8),
            "[ \t\r\n]{0,4}",
            "[ \t\r\n]{0,4}",
        )
    }

    fn mangle(command: &str, lower: &[bool], lead: &str, trail: &str) -> String {
        let body: String = command
            .chars()
            .zip(lower.iter().cycle())
            .map(|(c, &l)| if l { c.to_ascii_lowercase() } else { c })
            .collect();
        format!("{lead}{body}{trail}")
    }

    proptest! {
        #[test]
        fn at_replies_ignore_case_and_whitespace(
            idx in 0usize..5,
            suffix in "[0-9]{0,2}",
            (lower, lead, trail) in casing_and_padding(),
        ) {
            let table = [
                ("ATZ", "ELM327 v1.5"),
                ("ATI", "ELM327 v1.5"),
                ("ATE", "OK"),
                ("ATH", "OK"),
                ("ATS", "OK"),
            ];
            let (code, expected) = table[idx];
            let raw = mangle(&format!("{code}{suffix}"), &lower, &lead, &trail);
            prop_assert_eq!(interpreter().handle(&raw), expected);
        }

        #[test]
        fn pid_replies_ignore_case_and_whitespace(
            (lower, lead, trail) in casing_and_padding(),
        ) {
            let raw = mangle("010c", &lower, &lead, &trail);
            prop_assert_eq!(interpreter().handle(&raw), "410C 5DC");
        }

        #[test]
        fn unknown_at_commands_reply_error(rest in "[A-Z0-9@ ]{0,6}") {
            let command = format!("AT{rest}");
            let known = ["ATZ", "ATI", "ATE", "ATH", "ATS"];
            prop_assume!(!known.iter().any(|k| command.trim().starts_with(k)));
            prop_assert_eq!(interpreter().handle(&command), "ERROR");
        }

        #[test]
        fn unknown_requests_reply_no_data(command in "[0-9A-Za-z ]{0,8}") {
            let normalized = normalize(&command);
            prop_assume!(!normalized.starts_with("AT"));
            prop_assume!(!["010C", "010D", "0105"].contains(&normalized.as_str()));
            prop_assert_eq!(interpreter().handle(&command), "NO DATA");
        }
    }
}
