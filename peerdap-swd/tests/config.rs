// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Configuration and error serialization.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use test_case::test_case;

use peerdap_swd::SwdError;
use peerdap_swd::interface::SwdConfig;
use peerdap_swd::protocol::Speed;

#[test]
fn config_serde_round_trip() {
    let config = SwdConfig {
        speed: Speed::Slow,
        idle_padding: true,
        max_wait_attempts: 8,
    };

    let json = serde_json::to_string(&config).expect("serialize");
    assert_eq!(
        json,
        r#"{"speed":"Slow","idle_padding":true,"max_wait_attempts":8}"#
    );
    let back: SwdConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, config);
}

#[test]
fn partial_config_takes_defaults() {
    let config: SwdConfig = serde_json::from_str(r#"{"speed":"Turbo"}"#).expect("deserialize");
    assert_eq!(
        config,
        SwdConfig {
            speed: Speed::Turbo,
            ..SwdConfig::default()
        }
    );
}

#[test_case(Speed::Slow, 100, 250)]
#[test_case(Speed::Medium, 50, 500)]
#[test_case(Speed::Fast, 25, 1000)]
#[test_case(Speed::Turbo, 0, 4000)]
fn speed_settings(speed: Speed, cycles: u32, khz: u32) {
    assert_eq!(speed.delay_cycles(), cycles);
    assert_eq!(speed.speed_khz(), khz);
}

#[test]
fn session_config() {
    let (mut swd, _bus) = session(Target::new());
    assert_eq!(swd.config(), SwdConfig::default());

    swd.set_speed(Speed::Medium);
    swd.set_idle_padding(true);
    swd.set_max_wait_attempts(0);
    assert_eq!(
        swd.config(),
        SwdConfig {
            speed: Speed::Medium,
            idle_padding: true,
            max_wait_attempts: 1,
        }
    );
    assert_eq!(swd.speed(), Speed::Medium);
}

#[test_case(SwdError::NoAck(7), r#"{"kind":"no ack","detail":"7"}"#)]
#[test_case(SwdError::Stalled(32), r#"{"kind":"stalled","detail":"32 attempts"}"#)]
#[test_case(SwdError::ReadParity, r#"{"kind":"read parity","detail":""}"#)]
fn error_json(error: SwdError, json: &str) {
    assert_eq!(serde_json::to_string(&error).expect("serialize"), json);
}

#[test_case(SwdError::NoAck(7), "No ACK: 7")]
#[test_case(SwdError::Stalled(32), "Stalled: 32 attempts")]
#[test_case(SwdError::FaultAck, "Fault ACK")]
#[test_case(SwdError::Api, "API Error")]
fn error_display(error: SwdError, text: &str) {
    assert_eq!(error.to_string(), text);
}
