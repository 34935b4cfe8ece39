use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use elmlink_core::config::{ENGINE_TEMP_RANGE, RPM_RANGE};
use elmlink_core::{
    parse_pid_reply, Config, FixedSource, Interpreter, Link, Pid, PulseCounter, RandomSource,
    SensorSampler, SensorSource, SharedSampler, Snapshot, TelemetryEmitter,
};

fn shared<S: SensorSource>(
    pulses: &Arc<PulseCounter>,
    source: S,
    config: &Config,
) -> SharedSampler<S> {
    Arc::new(Mutex::new(
        SensorSampler::new(Arc::clone(pulses), source)
            .with_wheel_circumference(config.wheel_circumference_m),
    ))
}

fn link<S: SensorSource>(sampler: &SharedSampler<S>, config: &Config) -> Link<S> {
    Link::new(Interpreter::new(Arc::clone(sampler))).with_max_payload_len(config.max_payload_len)
}

fn exchange<S: SensorSource>(link: &Link<S>, command: &str) -> String {
    let mut replies = Vec::new();
    link.on_write(command.as_bytes(), &mut |p: &[u8]| replies.push(p.to_vec()));
    assert_eq!(replies.len(), 1, "expected exactly one reply for {command:?}");
    String::from_utf8(replies.remove(0)).unwrap()
}

#[test]
fn test_session() {
    let config = Config::default();
    let pulses = Arc::new(PulseCounter::new());
    let sampler = shared(&pulses, FixedSource::new(vec![800, 3000], vec![70, 100]), &config);
    let link = link(&sampler, &config);

    link.on_connect();
    assert_eq!(exchange(&link, " atz  "), "ELM327 v1.5");
    assert_eq!(exchange(&link, "ate0"), "OK");
    assert_eq!(exchange(&link, "ATH0"), "OK");
    assert_eq!(exchange(&link, "ATSP0"), "OK");
    assert_eq!(exchange(&link, "ATI"), "ELM327 v1.5");
    assert_eq!(exchange(&link, "ATX"), "ERROR");

    assert_eq!(exchange(&link, "010D"), "410D 0");
    assert_eq!(exchange(&link, "010C"), "410C 320");
    assert_eq!(exchange(&link, "010C"), "410C BB8");
    assert_eq!(exchange(&link, "0105"), "4105 46");
    assert_eq!(exchange(&link, "0105"), "4105 64");
    assert_eq!(exchange(&link, "XYZQ"), "NO DATA");
    link.on_disconnect();
}

#[test]
fn test_speed_from_pulses() {
    let config = Config::default();
    let pulses = Arc::new(PulseCounter::new());
    let sampler = shared(&pulses, FixedSource::constant(1000, 80), &config);
    let link = link(&sampler, &config);

    for _ in 0..1000 {
        pulses.increment();
    }
    let reply = exchange(&link, "010d");
    assert_eq!(parse_pid_reply(&reply), Some((Pid::Speed, 7560)));
    assert_eq!(exchange(&link, "010D"), "410D 0");
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    let pulses = Arc::new(PulseCounter::new());
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let pulses = Arc::clone(&pulses);
            thread::spawn(move || {
                for _ in 0..1000 {
                    pulses.increment();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(pulses.read_and_reset(), 10_000);
    assert_eq!(pulses.read_and_reset(), 0);
}

#[test]
fn test_reads_interleaved_with_increments_account_for_every_pulse() {
    let pulses = Arc::new(PulseCounter::new());
    let writer = {
        let pulses = Arc::clone(&pulses);
        thread::spawn(move || {
            for _ in 0..10_000 {
                pulses.increment();
            }
        })
    };

    let mut total = 0u64;
    while !writer.is_finished() {
        total += u64::from(pulses.read_and_reset());
    }
    writer.join().unwrap();
    total += u64::from(pulses.read_and_reset());
    assert_eq!(total, 10_000);
}

#[test]
fn test_random_readings_stay_in_range() {
    let config = Config::default();
    let pulses = Arc::new(PulseCounter::new());
    let sampler = shared(&pulses, RandomSource::from_entropy(), &config);
    let link = link(&sampler, &config);

    for _ in 0..1000 {
        let (pid, rpm) = parse_pid_reply(&exchange(&link, "010C")).unwrap();
        assert_eq!(pid, Pid::Rpm);
        assert!(RPM_RANGE.contains(&rpm), "rpm {rpm} out of range");

        let (pid, temp) = parse_pid_reply(&exchange(&link, "0105")).unwrap();
        assert_eq!(pid, Pid::CoolantTemp);
        assert!(ENGINE_TEMP_RANGE.contains(&temp), "temp {temp} out of range");
    }
}

#[test]
fn test_telemetry_and_commands_share_sampler() {
    let config = Config::default();
    let pulses = Arc::new(PulseCounter::new());
    let sampler = shared(&pulses, FixedSource::constant(1200, 88), &config);
    let link = link(&sampler, &config);

    let start = Instant::now();
    let mut emitter = TelemetryEmitter::new(config.telemetry_interval(), start);
    let mut snapshots: Vec<Snapshot> = Vec::new();

    assert_eq!(exchange(&link, "010C"), "410C 4B0");
    for _ in 0..10 {
        pulses.increment();
    }
    let due = start + Duration::from_millis(config.telemetry_interval_ms);
    emitter.tick(due, &sampler, &mut |s: &Snapshot| snapshots.push(*s));

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].speed.value, 75);
    // telemetry drained the counter
    assert_eq!(exchange(&link, "010D"), "410D 0");
}

#[test]
fn test_config_payload_cap() {
    let config = Config::from_json(r#"{"max_payload_len": 6}"#).unwrap();
    let pulses = Arc::new(PulseCounter::new());
    let sampler = shared(&pulses, FixedSource::constant(1500, 90), &config);
    let link = link(&sampler, &config);

    assert_eq!(exchange(&link, "ATZ"), "ELM327");
    assert_eq!(exchange(&link, "010C"), "410C 5");
    assert_eq!(exchange(&link, "ATE"), "OK");
}
