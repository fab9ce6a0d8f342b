//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for the Homeworks client
//!
//! These tests run the client against the scripted controller from `homeworks-testsuite`.

use async_trait::async_trait;
use homeworks_client::{
    Address, BoxedTransport, ClientConfig, ClientError, Connector, Credentials, HeartbeatConfig,
    HomeworksClient, HomeworksEvent, LedState, LinkState, Notification,
};
use homeworks_testsuite::{ControllerScript, MockController, RecordingConnector, WAIT_TIMEOUT};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Helper Functions
// ============================================================================

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

async fn connected(script: ControllerScript) -> (MockController, HomeworksClient) {
    let controller = MockController::start(script).await.unwrap();
    let client = HomeworksClient::new(controller.client_config());
    client.connect().await.unwrap();
    assert!(controller.wait_for_line("DLMON").await);
    (controller, client)
}

fn notifications(client: &HomeworksClient) -> mpsc::UnboundedReceiver<Notification> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(move |notification| {
        let _ = tx.send(notification.clone());
    });
    rx
}

async fn next_matching(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    wanted: impl Fn(&Notification) -> bool,
) -> Notification {
    timeout(WAIT_TIMEOUT, async {
        loop {
            let notification = rx.recv().await.expect("notification channel closed");
            if wanted(&notification) {
                return notification;
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}

fn is_connectivity(notification: &Notification) -> bool {
    matches!(
        notification,
        Notification::ConnectionLost | Notification::ConnectionRestored
    )
}

struct NeverConnects;

#[async_trait]
impl Connector for NeverConnects {
    async fn connect(&self, _config: &ClientConfig) -> io::Result<BoxedTransport> {
        std::future::pending().await
    }
}

// ============================================================================
// Connection and Login Tests
// ============================================================================

#[tokio::test]
async fn login_with_password_then_monitoring() {
    let (controller, client) = connected(ControllerScript::with_login("lutron")).await;

    assert!(client.is_connected());
    assert_eq!(client.state(), LinkState::Connected);
    assert_eq!(
        controller.received(),
        vec!["lutron", "PROMPTOFF", "KBMON", "KLMON", "DLMON"]
    );
    client.close().await;
}

#[tokio::test]
async fn login_with_username_and_password() {
    let controller = MockController::start(ControllerScript::with_login("admin, lutron"))
        .await
        .unwrap();
    let config = controller
        .client_config()
        .with_credentials(Credentials::new("admin", "lutron"));
    let client = HomeworksClient::new(config);

    client.connect().await.unwrap();
    assert_eq!(controller.received().first().map(String::as_str), Some("admin, lutron"));
    client.close().await;
}

#[tokio::test]
async fn controller_without_login() {
    let (controller, client) = connected(ControllerScript::default()).await;
    assert_eq!(controller.received(), vec!["PROMPTOFF", "KBMON", "KLMON", "DLMON"]);
    assert!(client.is_connected());
    client.close().await;
}

#[tokio::test]
async fn wrong_password_fails_authentication() {
    let controller = MockController::start(ControllerScript::with_login("lutron"))
        .await
        .unwrap();
    let config = controller
        .client_config()
        .with_credentials(Credentials::password("wrong"));
    let client = HomeworksClient::new(config);

    let result = client.connect().await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))), "{result:?}");
    assert_eq!(client.state(), LinkState::Failed);
    assert!(!controller.received().iter().any(|line| line == "KBMON"));
}

#[tokio::test]
async fn prompt_without_credentials_is_reported() {
    let controller = MockController::start(ControllerScript::with_login("lutron"))
        .await
        .unwrap();
    let config = ClientConfig {
        credentials: None,
        ..controller.client_config()
    };
    let client = HomeworksClient::new(config);

    let result = client.connect().await;
    assert!(matches!(result, Err(ClientError::CredentialsRequired)), "{result:?}");
    assert!(!result.unwrap_err().is_recoverable());
}

#[tokio::test]
async fn connect_times_out() {
    let config = ClientConfig::new("controller.invalid", 23)
        .with_connect_timeout(Duration::from_millis(50));
    let client = HomeworksClient::with_connector(config, NeverConnects);

    let result = client.connect().await;
    assert!(matches!(result, Err(ClientError::ConnectTimeout(_))), "{result:?}");
    assert_eq!(client.state(), LinkState::Failed);
}

#[tokio::test]
async fn second_connect_is_rejected() {
    let (controller, client) = connected(ControllerScript::default()).await;
    assert!(matches!(client.connect().await, Err(ClientError::AlreadyConnected)));
    assert_eq!(controller.connections(), 1);
    client.close().await;
}

#[tokio::test]
async fn in_memory_transport() {
    let controller = MockController::start(ControllerScript::with_login("lutron"))
        .await
        .unwrap();
    let client = HomeworksClient::with_connector(controller.client_config(), controller.connector());

    client.connect().await.unwrap();
    assert!(controller.wait_for_line("DLMON").await);
    client.request_light_level(addr("[01:02:03:04]")).await.unwrap();
    assert!(controller.wait_for_line("RDL, [01:02:03:04]").await);
    client.close().await;
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn set_light_level_writes_fadedim() {
    let (controller, client) = connected(ControllerScript::with_login("lutron")).await;

    client
        .set_light_level(addr("[01:02:03:04]"), 50, 2, 0)
        .await
        .unwrap();
    assert!(controller.wait_for_line("FADEDIM, 50, 2, 0, [01:02:03:04]").await);
    client.close().await;
}

#[tokio::test]
async fn button_commands() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let keypad = addr("[01:04:10]");

    client.press_button(keypad, 3).await.unwrap();
    client.release_button(keypad, 3).await.unwrap();
    assert!(controller.wait_for_line("KBR, [01:04:10], 3").await);
    let received = controller.received();
    let press = received.iter().position(|l| l == "KBP, [01:04:10], 3");
    let release = received.iter().position(|l| l == "KBR, [01:04:10], 3");
    assert!(press.is_some() && press < release);
    client.close().await;
}

#[tokio::test]
async fn invalid_command_is_not_written() {
    let (controller, client) = connected(ControllerScript::default()).await;
    controller.clear_received();

    let result = client.press_button(addr("[01:04:10]"), 25).await;
    assert!(matches!(&result, Err(error) if error.is_encoding() && !error.is_transport()));

    client.request_led_states(addr("[01:04:10]")).await.unwrap();
    assert!(controller.wait_for_line("RKLS, [01:04:10]").await);
    assert_eq!(controller.received(), vec!["RKLS, [01:04:10]"]);
    assert!(client.is_connected());
    client.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_never_interleave() {
    let controller = MockController::start(ControllerScript::default()).await.unwrap();
    let recording = RecordingConnector::new(controller.connector(), 3);
    let log = recording.log();
    let client = HomeworksClient::with_connector(controller.client_config(), recording);
    client.connect().await.unwrap();

    let keypad = addr("[01:04:10]");
    let sends: Vec<_> = (1..=24)
        .map(|button| {
            let client = client.clone();
            tokio::spawn(async move { client.press_button(keypad, button).await })
        })
        .collect();
    for send in sends {
        send.await.unwrap().unwrap();
    }

    let mut expected: Vec<String> = (1..=24).map(|b| format!("KBP, [01:04:10], {b}")).collect();
    let mut written: Vec<String> = log
        .lines()
        .into_iter()
        .filter(|line| !matches!(line.as_str(), "PROMPTOFF" | "KBMON" | "KLMON" | "DLMON"))
        .collect();
    expected.sort();
    written.sort();
    assert_eq!(written, expected);
    client.close().await;
}

// ============================================================================
// Event Delivery Tests
// ============================================================================

#[tokio::test]
async fn level_report_reaches_address_subscriber() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let dimmer = addr("[01:02:03:04]");

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.subscribe_address(dimmer, move |notification| {
        let _ = tx.send(notification.clone());
    });

    assert!(controller.send_line("DL, [01:02:03:05], 10"));
    assert!(controller.send_line("DL, [01:02:03:04], 75"));

    let notification = next_matching(&mut rx, |_| true).await;
    assert_eq!(
        notification,
        Notification::Event(HomeworksEvent::LightLevelChanged { address: dimmer, level: 75 })
    );
    client.close().await;
}

#[tokio::test]
async fn reports_arrive_in_wire_order() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let mut rx = notifications(&client);

    for line in [
        "KBP, [01:04:10], 1",
        "KBH, [01:04:10], 1",
        "KBR, [01:04:10], 1",
        "Invalid command",
        "KLS, [01:04:10], 110000000000000000000000",
    ] {
        assert!(controller.send_line(line));
    }

    let keypad = addr("[01:04:10]");
    let mut events = Vec::new();
    while events.len() < 5 {
        if let Notification::Event(event) = next_matching(&mut rx, |n| n.event().is_some()).await {
            events.push(event);
        }
    }
    assert_eq!(events[0], HomeworksEvent::ButtonPress { address: keypad, button: 1 });
    assert_eq!(events[1], HomeworksEvent::ButtonHold { address: keypad, button: 1 });
    assert_eq!(events[2], HomeworksEvent::ButtonRelease { address: keypad, button: 1 });
    assert!(matches!(events[3], HomeworksEvent::ControllerError { .. }));
    assert_eq!(events[4].led(2), Some(LedState::On));
    assert_eq!(events[4].led(3), Some(LedState::Off));
    client.close().await;
}

#[tokio::test]
async fn request_light_level_round_trip() {
    let (_controller, client) = connected(ControllerScript::default()).await;
    let dimmer = addr("[01:01:00:02:04]");
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.subscribe_address(dimmer, move |notification| {
        let _ = tx.send(notification.clone());
    });

    client.set_light_level(dimmer, 40, 0, 0).await.unwrap();
    client.request_light_level(dimmer).await.unwrap();

    for _ in 0..2 {
        let notification = next_matching(&mut rx, |_| true).await;
        assert_eq!(
            notification,
            Notification::Event(HomeworksEvent::LightLevelChanged { address: dimmer, level: 40 })
        );
    }
    client.close().await;
}

#[tokio::test]
async fn contact_closure_round_trip() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let output = addr("[02:06:03:01]");
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.subscribe_address(output, move |notification| {
        let _ = tx.send(notification.clone());
    });

    client.close_contact(output).await.unwrap();
    client.request_contact_state(output).await.unwrap();
    client.open_contact(output).await.unwrap();

    let mut states = Vec::new();
    for _ in 0..3 {
        match next_matching(&mut rx, |_| true).await {
            Notification::Event(HomeworksEvent::ContactClosureChanged { address, closed }) => {
                assert_eq!(address, output);
                states.push(closed);
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }
    assert_eq!(states, vec![true, true, false]);
    assert!(controller.wait_for_line("CCOOPEN, [02:06:03:01]").await);
    assert!(controller.received().contains(&"RCCOS, [02:06:03:01]".to_string()));
    client.close().await;
}

// ============================================================================
// Reconnection Tests
// ============================================================================

#[tokio::test]
async fn reconnects_and_restores_monitoring() {
    let (controller, client) = connected(ControllerScript::with_login("lutron")).await;
    let mut rx = notifications(&client);

    assert!(controller.drop_connection());

    assert_eq!(next_matching(&mut rx, is_connectivity).await, Notification::ConnectionLost);
    assert_eq!(
        next_matching(&mut rx, is_connectivity).await,
        Notification::ConnectionRestored
    );
    assert!(controller.wait_for_count("DLMON", 2).await);
    assert_eq!(controller.connections(), 2);
    assert_eq!(controller.received().iter().filter(|l| *l == "lutron").count(), 2);
    assert!(client.is_connected());

    assert!(controller.send_line("KBP, [01:04:10], 4"));
    let event = next_matching(&mut rx, |n| n.event().is_some()).await;
    assert_eq!(
        event,
        Notification::Event(HomeworksEvent::ButtonPress { address: addr("[01:04:10]"), button: 4 })
    );
    client.close().await;
}

#[tokio::test]
async fn send_during_outage_is_rejected() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let mut rx = notifications(&client);
    let keypad = addr("[01:04:10]");

    controller.set_accepting(false);
    assert!(controller.drop_connection());
    assert_eq!(next_matching(&mut rx, is_connectivity).await, Notification::ConnectionLost);

    let result = client.press_button(keypad, 1).await;
    assert!(matches!(&result, Err(ClientError::NotConnected)), "{result:?}");
    assert!(result.unwrap_err().is_transport());
    assert!(!client.is_connected());

    controller.set_accepting(true);
    assert_eq!(
        next_matching(&mut rx, is_connectivity).await,
        Notification::ConnectionRestored
    );
    client.press_button(keypad, 1).await.unwrap();
    assert!(controller.wait_for_line("KBP, [01:04:10], 1").await);
    client.close().await;
}

#[tokio::test]
async fn unanswered_keepalive_triggers_reconnect() {
    let controller = MockController::start(ControllerScript::default().silent())
        .await
        .unwrap();
    let config = controller.client_config().with_heartbeat(Some(HeartbeatConfig {
        idle: Duration::from_millis(100),
        grace: Duration::from_millis(100),
    }));
    let client = HomeworksClient::new(config);
    let mut rx = notifications(&client);
    client.connect().await.unwrap();

    assert!(controller.wait_for_line("OSREV").await);
    assert_eq!(next_matching(&mut rx, is_connectivity).await, Notification::ConnectionLost);
    assert_eq!(
        next_matching(&mut rx, is_connectivity).await,
        Notification::ConnectionRestored
    );
    assert!(controller.connections() >= 2);
    client.close().await;
}

#[tokio::test]
async fn answered_keepalive_keeps_link_up() {
    let controller = MockController::start(ControllerScript::default()).await.unwrap();
    let config = controller.client_config().with_heartbeat(Some(HeartbeatConfig {
        idle: Duration::from_millis(50),
        grace: Duration::from_millis(500),
    }));
    let client = HomeworksClient::new(config);
    let mut rx = notifications(&client);
    client.connect().await.unwrap();

    assert!(controller.wait_for_count("OSREV", 3).await);
    assert_eq!(controller.connections(), 1);
    assert!(client.is_connected());
    while let Ok(notification) = rx.try_recv() {
        assert!(!is_connectivity(&notification), "{notification:?}");
    }
    client.close().await;
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn close_is_idempotent_and_allows_reconnect() {
    let (controller, client) = connected(ControllerScript::default()).await;

    client.close().await;
    client.close().await;
    assert_eq!(client.state(), LinkState::Disconnected);
    assert!(matches!(
        client.press_button(addr("[01:04:10]"), 1).await,
        Err(ClientError::NotConnected)
    ));

    client.connect().await.unwrap();
    assert!(controller.wait_for_connections(2).await);
    assert!(client.is_connected());
    client.close().await;
}

#[tokio::test]
async fn close_cancels_pending_reconnect() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let mut rx = notifications(&client);

    controller.set_accepting(false);
    assert!(controller.drop_connection());
    assert_eq!(next_matching(&mut rx, is_connectivity).await, Notification::ConnectionLost);

    timeout(WAIT_TIMEOUT, client.close())
        .await
        .expect("close did not finish");
    assert_eq!(client.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn shutdown_from_listener() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let handle = client.clone();
    client.subscribe(move |notification| {
        if let Notification::Event(HomeworksEvent::ButtonPress { .. }) = notification {
            handle.shutdown();
        }
    });

    assert!(controller.send_line("KBP, [01:04:10], 1"));
    timeout(WAIT_TIMEOUT, async {
        while client.state() != LinkState::Disconnected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener shutdown did not stop the client");

    client.close().await;
    assert_eq!(controller.connections(), 1);
}

#[tokio::test]
async fn close_spawned_from_listener() {
    let (controller, client) = connected(ControllerScript::default()).await;
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let handle = client.clone();
    client.subscribe(move |notification| {
        if notification.event().is_some_and(|e| matches!(e, HomeworksEvent::ButtonPress { .. })) {
            let handle = handle.clone();
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                handle.close().await;
                let _ = done_tx.send(handle.state());
            });
        }
    });

    assert!(controller.send_line("KBP, [01:04:10], 1"));
    let state = timeout(WAIT_TIMEOUT, done_rx.recv()).await.unwrap().unwrap();
    assert_eq!(state, LinkState::Disconnected);
}

#[tokio::test]
async fn listener_panic_does_not_stop_delivery() {
    let (controller, client) = connected(ControllerScript::default()).await;
    client.subscribe(|notification| {
        if notification.event().is_some() {
            panic!("listener failure");
        }
    });
    let mut rx = notifications(&client);

    assert!(controller.send_line("KBP, [01:04:10], 1"));
    assert!(controller.send_line("KBP, [01:04:10], 2"));
    for button in [1, 2] {
        let notification = next_matching(&mut rx, |n| n.event().is_some()).await;
        assert_eq!(
            notification,
            Notification::Event(HomeworksEvent::ButtonPress { address: addr("[01:04:10]"), button })
        );
    }
    assert!(client.is_connected());
    client.close().await;
}
