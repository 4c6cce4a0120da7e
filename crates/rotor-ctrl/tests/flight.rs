//! Flight-surface tests over the stub transport, plus the full
//! discovery-to-dispatch scenario. Paused tokio clock throughout.

use std::time::Duration;

use rotor_ctrl::{ControlConfig, ControlGate, FlightController, MotorTuner, UnifiedTuner};
use rotor_ctrl::{ControlForces, Direction};
use rotor_link::stub::{StubRemote, StubTransport};
use rotor_link::{control_url, ControlLink, LinkConfig, LinkHandle, LinkState, DEFAULT_CONTROL_PORT};
use rotor_proto::MotorId;
use rotor_scan::socket::StubBeaconSocket;
use rotor_scan::Scanner;

async fn wait_connected(handle: &LinkHandle) {
    let mut watch = handle.state_watch();
    loop {
        if *watch.borrow() == LinkState::Connected {
            return;
        }
        watch.changed().await.expect("link actor gone");
    }
}

async fn drain() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn as_strs(frames: &[String]) -> Vec<&str> {
    frames.iter().map(String::as_str).collect()
}

async fn connected_link(url: &str) -> (ControlLink, StubRemote, ControlGate) {
    let (transport, remote) = StubTransport::new();
    let link = ControlLink::spawn(transport, LinkConfig::default(), url.to_string());
    let handle = link.handle();
    wait_connected(&handle).await;
    drain().await;
    remote.clear_sent();
    let gate = ControlGate::new(handle);
    (link, remote, gate)
}

#[tokio::test(start_paused = true)]
async fn discovery_to_dispatch_end_to_end() {
    let (socket, feed) = StubBeaconSocket::new();
    let mut scanner = Scanner::start(socket);
    feed.push("ESP32|10.0.0.5|AA:BB:CC:DD:EE:FF");
    let beacon = scanner.wait_detected().await.unwrap();
    assert_eq!(beacon.ip, "10.0.0.5");

    let url = control_url(&beacon.ip, DEFAULT_CONTROL_PORT);
    assert_eq!(url, "ws://10.0.0.5:81/");

    let (_link, remote, gate) = connected_link(&url).await;
    let mut fc = FlightController::new(gate, ControlForces::default(), &ControlConfig::default());

    fc.nudge_throttle(100);
    fc.press_direction(Direction::Forward);
    fc.release_pitch();
    assert!(fc.is_armed());

    drain().await;
    remote.clear_sent();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sent = remote.sent();
    assert_eq!(
        as_strs(&sent),
        vec![
            "A1_IN1:100", "A1_IN2:0",
            "A2_IN1:100", "A2_IN2:0",
            "B1_IN1:100", "B1_IN2:0",
            "B2_IN1:100", "B2_IN2:0",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn emergency_stop_is_the_last_word() {
    let (_link, remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut fc =
        FlightController::new(gate.clone(), ControlForces::default(), &ControlConfig::default());
    let mut tuner = MotorTuner::attach(gate, &ControlConfig::default());

    fc.nudge_throttle(120);
    fc.press_direction(Direction::Forward);
    drain().await;

    // a per-motor debounce is still pending when the stop lands
    tuner.set(MotorId::A2, 200.0);
    fc.emergency_stop();
    assert!(!fc.is_armed());

    drain().await;
    let sent = remote.sent();
    let tail: Vec<&String> = sent.iter().rev().take(8).collect();
    assert_eq!(tail.len(), 8);
    for frame in tail {
        assert!(frame.ends_with(":0"), "expected all-stop, got {}", frame);
    }

    // nothing fires after the stop: no tick, and the pending debounce is
    // silenced by the halted gate when its timer elapses
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(remote.sent(), sent);
}

#[tokio::test(start_paused = true)]
async fn edits_after_a_stop_transmit_again() {
    let (_link, remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut fc =
        FlightController::new(gate.clone(), ControlForces::default(), &ControlConfig::default());
    let mut tuner = MotorTuner::attach(gate, &ControlConfig::default());

    tuner.set(MotorId::A1, 70.0);
    fc.emergency_stop();
    drain().await;
    remote.clear_sent();

    // the halt only invalidates what was pending, not the surface itself
    tuner.set(MotorId::A1, 90.0);
    tokio::time::sleep(Duration::from_millis(150)).await;
    let sent = remote.sent();
    assert_eq!(as_strs(&sent), vec!["A1_IN1:90", "A1_IN2:0"]);
}

#[tokio::test(start_paused = true)]
async fn land_disarms_and_zeroes() {
    let (_link, remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut fc = FlightController::new(gate, ControlForces::default(), &ControlConfig::default());

    fc.take_off();
    assert!(fc.is_armed());
    assert_eq!(fc.movement().throttle, 120);
    drain().await;

    fc.land();
    assert!(!fc.is_armed());
    assert_eq!(fc.movement(), rotor_ctrl::Movement::default());

    drain().await;
    let sent = remote.sent();
    for frame in sent.iter().rev().take(8) {
        assert!(frame.ends_with(":0"));
    }
}

#[tokio::test(start_paused = true)]
async fn directional_release_resets_only_that_axis() {
    let (_link, _remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut fc = FlightController::new(gate, ControlForces::default(), &ControlConfig::default());

    fc.nudge_throttle(50);
    fc.press_direction(Direction::Forward);
    fc.press_direction(Direction::Right);
    let m = fc.movement();
    assert_eq!((m.pitch, m.roll), (80, 80));

    fc.release_pitch();
    let m = fc.movement();
    assert_eq!((m.throttle, m.pitch, m.roll), (50, 0, 80));
}

#[tokio::test(start_paused = true)]
async fn motor_edits_coalesce_per_motor() {
    let (_link, remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut tuner = MotorTuner::attach(gate, &ControlConfig::default());
    drain().await;
    remote.clear_sent();

    tuner.set(MotorId::A1, 120.0);
    tuner.set(MotorId::A1, 130.0);
    tuner.step_up(MotorId::A1);
    tuner.set(MotorId::B1, -50.0);
    assert_eq!(tuner.value(MotorId::A1), 131);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let sent = remote.sent();
    assert_eq!(sent.len(), 4, "one coalesced send per motor: {:?}", sent);
    for frame in ["A1_IN1:131", "A1_IN2:0", "B1_IN1:0", "B1_IN2:50"] {
        assert!(sent.iter().any(|s| s == frame), "missing {} in {:?}", frame, sent);
    }
}

#[tokio::test(start_paused = true)]
async fn unified_edits_coalesce_to_last_value() {
    let (_link, remote, gate) = connected_link("ws://10.0.0.5:81/").await;
    let mut tuner = UnifiedTuner::attach(gate, &ControlConfig::default());
    drain().await;
    remote.clear_sent();

    tuner.set(100.0);
    tuner.set(80.0);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let sent = remote.sent();
    assert_eq!(
        as_strs(&sent),
        vec![
            "A1_IN1:80", "A1_IN2:0",
            "A2_IN1:0", "A2_IN2:80",
            "B1_IN1:0", "B1_IN2:80",
            "B2_IN1:0", "B2_IN2:80",
        ]
    );
}
