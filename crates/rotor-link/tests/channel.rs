//! Channel state machine tests against the in-memory stub transport,
//! with the tokio clock paused so backoff delays are exact.

use std::time::Duration;

use rotor_link::stub::StubTransport;
use rotor_link::{
    control_url, ControlLink, LinkConfig, LinkError, LinkHandle, LinkState, DEFAULT_CONTROL_PORT,
};
use rotor_proto::CalibrationValues;

fn spawn_link() -> (ControlLink, rotor_link::stub::StubRemote) {
    let (transport, remote) = StubTransport::new();
    let link = ControlLink::spawn(
        transport,
        LinkConfig::default(),
        control_url("10.0.0.5", DEFAULT_CONTROL_PORT),
    );
    (link, remote)
}

async fn wait_state(handle: &LinkHandle, want: LinkState) {
    let mut watch = handle.state_watch();
    loop {
        if *watch.borrow() == want {
            return;
        }
        watch.changed().await.expect("link actor gone");
    }
}

/// Let the actor finish in-flight sends (paused clock: 1ms only advances
/// once every task is idle).
async fn drain() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn connects_and_sends_greeting() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    wait_state(&handle, LinkState::Connected).await;
    drain().await;
    assert_eq!(remote.sent(), vec!["hello".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_then_failed_terminal() {
    let (transport, remote) = StubTransport::new();
    remote.fail_next_connects(100);
    let link = ControlLink::spawn(
        transport,
        LinkConfig::default(),
        control_url("10.0.0.5", DEFAULT_CONTROL_PORT),
    );
    let handle = link.handle();

    wait_state(&handle, LinkState::Failed).await;

    let times = remote.connect_times();
    assert_eq!(times.len(), 6, "initial attempt plus five retries");
    let gaps: Vec<u64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis() as u64)
        .collect();
    assert_eq!(gaps, vec![1000, 2000, 3000, 4000, 5000]);

    // terminal: no further automatic attempts
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(remote.connect_count(), 6);
    assert_eq!(handle.state(), LinkState::Failed);
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_resets_from_failed() {
    let (transport, remote) = StubTransport::new();
    remote.fail_next_connects(100);
    let link = ControlLink::spawn(
        transport,
        LinkConfig::default(),
        control_url("10.0.0.5", DEFAULT_CONTROL_PORT),
    );
    let handle = link.handle();
    wait_state(&handle, LinkState::Failed).await;

    remote.fail_next_connects(0);
    handle.reconnect();
    wait_state(&handle, LinkState::Connected).await;
    assert_eq!(remote.connect_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn normal_close_never_reconnects() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    wait_state(&handle, LinkState::Connected).await;

    remote.close(1000, "teardown");
    wait_state(&handle, LinkState::Disconnected).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(remote.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn abnormal_close_reconnects_after_one_step() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    wait_state(&handle, LinkState::Connected).await;

    remote.close(1006, "wifi dropout");
    wait_state(&handle, LinkState::Reconnecting).await;
    wait_state(&handle, LinkState::Connected).await;

    let times = remote.connect_times();
    assert_eq!(times.len(), 2);
    assert_eq!((times[1] - times[0]).as_millis(), 1000);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_reconnect() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    wait_state(&handle, LinkState::Connected).await;

    remote.close(1006, "dropout");
    wait_state(&handle, LinkState::Reconnecting).await;

    handle.close();
    wait_state(&handle, LinkState::Disconnected).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(remote.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_while_disconnected_is_dropped() {
    let (transport, remote) = StubTransport::new();
    remote.fail_next_connects(100);
    let link = ControlLink::spawn(
        transport,
        LinkConfig::default(),
        control_url("10.0.0.5", DEFAULT_CONTROL_PORT),
    );
    let handle = link.handle();
    assert_eq!(handle.send("A1_IN1:50"), Err(LinkError::NotConnected));
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn calibration_pushed_after_settle_and_on_reconnect() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    handle.set_calibration(CalibrationValues::default());
    wait_state(&handle, LinkState::Connected).await;

    // settle delay has not elapsed yet: greeting only
    drain().await;
    assert_eq!(remote.sent().len(), 1);
    tokio::time::sleep(Duration::from_millis(600)).await;
    let sent = remote.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].starts_with("CALIB:"));

    // re-sent automatically once the link comes back
    remote.close(1006, "dropout");
    wait_state(&handle, LinkState::Reconnecting).await;
    wait_state(&handle, LinkState::Connected).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    let sent = remote.sent();
    assert!(sent.last().unwrap().starts_with("CALIB:"));
    assert_eq!(sent.iter().filter(|s| s.starts_with("CALIB:")).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_messages_surface_verbatim() {
    let (link, remote) = spawn_link();
    let handle = link.handle();
    wait_state(&handle, LinkState::Connected).await;

    let mut messages = handle.message_watch();
    remote.push_message("battery 3.7V");
    messages.changed().await.unwrap();
    assert_eq!(handle.last_message().as_deref(), Some("battery 3.7V"));
}

#[tokio::test(start_paused = true)]
async fn guarded_calibration_transfer() {
    let (transport, remote) = StubTransport::new();
    remote.fail_next_connects(100);
    let link = ControlLink::spawn(
        transport,
        LinkConfig::default(),
        control_url("10.0.0.5", DEFAULT_CONTROL_PORT),
    );
    let handle = link.handle();

    let calib = CalibrationValues::default();
    assert!(!rotor_link::send_calibration(&handle, None));
    assert!(!rotor_link::send_calibration(&handle, Some(&calib)));
    assert!(remote.sent().is_empty());
}
