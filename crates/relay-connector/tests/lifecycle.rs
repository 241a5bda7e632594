// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection lifecycle: connects, drops, reconnects, shutdown.

mod common;

use common::{connection, wait_for, Event, Harness, RecordingListener, Reply, BASE_URL};
use crossbeam::channel::{self, Receiver, Sender};
use relay_connector::{
    Client, ConnectionInfo, ConnectionState, ConnectorConfig, ConnectorError, Listener, Request,
    Response,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn connected(endpoint_url: &str, connection_id: &str, new_endpoint_url: bool) -> Event {
    Event::Connected {
        endpoint_url: endpoint_url.to_string(),
        connection_id: connection_id.to_string(),
        new_endpoint_url,
    }
}

#[test]
fn test_state_transitions() {
    let h = Harness::new();
    assert_eq!(h.client.connection_state(), ConnectionState::Connecting);
    assert!(h.client.connection_info().is_none());

    h.connect("c1");
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);
    let info = h.client.connection_info().expect("connected");
    assert_eq!(info.connection_id(), "c1");
    assert_eq!(info.client_id(), "client-1");
    assert_eq!(info.connection_ttl_sec(), 3600);

    h.disconnect();
    assert_eq!(h.client.connection_state(), ConnectionState::Disconnected);
    assert!(h.client.connection_info().is_none());

    h.connect("c2");
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);

    let stats = h.client.stats();
    assert_eq!(stats.connects, 2);
    assert_eq!(stats.disconnects, 1);
}

#[test]
fn test_reconnect_notifies_every_registration() {
    let h = Harness::new();
    let early = RecordingListener::new("early", Reply::Status(200));
    assert!(h.client.register_listener(early.clone(), "/early"));
    h.connect("c1");
    h.disconnect();

    // Registered while disconnected: no catch-up yet
    let late = RecordingListener::new("late", Reply::Status(200));
    assert!(h.client.register_listener(late.clone(), "/late"));
    assert!(late.events().is_empty());

    // Same base URL: not a new endpoint
    h.connect("c2");
    assert_eq!(
        early.connected_events(),
        vec![
            connected(&format!("{}/early", BASE_URL), "c1", true),
            connected(&format!("{}/early", BASE_URL), "c2", false),
        ]
    );
    assert_eq!(
        late.connected_events(),
        vec![connected(&format!("{}/late", BASE_URL), "c2", false)]
    );

    // Different base URL: new endpoint
    h.disconnect();
    h.connect_to("https://relay2.example.com/v4/f/xyz", "c3");
    assert_eq!(
        late.connected_events().last(),
        Some(&connected("https://relay2.example.com/v4/f/xyz/late", "c3", true))
    );
}

#[test]
fn test_register_while_connected_catches_up() {
    let h = Harness::new();
    h.connect("c1");

    let l = RecordingListener::new("l", Reply::Status(200));
    assert!(h.client.register_listener(l.clone(), "/chat"));

    // Delivered before register_listener returned
    assert_eq!(
        l.events(),
        vec![connected(&format!("{}/chat", BASE_URL), "c1", true)]
    );
}

#[test]
fn test_disconnect_once_per_listener() {
    let h = Harness::new();
    let multi = RecordingListener::new("multi", Reply::Status(200));
    let single = RecordingListener::new("single", Reply::Status(200));
    assert!(h.client.register_listener(multi.clone(), "/a"));
    assert!(h.client.register_listener(multi.clone(), "/b"));
    assert!(h.client.register_listener(single.clone(), "/c"));

    // Not connected yet: nothing to report
    h.disconnect();
    assert_eq!(multi.count(&Event::Disconnected), 0);

    h.connect("c1");
    h.disconnect();
    h.disconnect();

    assert_eq!(multi.count(&Event::Disconnected), 1);
    assert_eq!(single.count(&Event::Disconnected), 1);
}

#[test]
fn test_back_to_back_connect_has_no_disconnect_callback() {
    let h = Harness::new();
    let l = RecordingListener::new("l", Reply::Status(200));
    assert!(h.client.register_listener(l.clone(), "/l"));

    h.connect("c1");
    h.connect("c2");

    assert_eq!(l.count(&Event::Disconnected), 0);
    assert_eq!(l.connected_events().len(), 2);
}

#[test]
fn test_unregistered_listener_gets_nothing() {
    let h = Harness::new();
    let l = RecordingListener::new("l", Reply::Status(200));
    assert!(h.client.register_listener(l.clone(), "/l"));
    assert!(h.client.unregister_listener(&l));

    h.connect("c1");
    h.disconnect();
    assert!(l.events().is_empty());
}

#[test]
fn test_c2c_endpoint_url() {
    let info: ConnectionInfo = connection("https://svc.example.com/v4/f/abc", "c1");
    let endpoint = info.endpoint_url_for("/chat");
    assert_eq!(
        info.c2c_endpoint_url(&endpoint),
        "https://c2c.example.com/v4/f/abc/chat"
    );
}

struct Panicky;

impl Listener for Panicky {
    fn on_connected(&self, _endpoint_url: &str, _info: &ConnectionInfo) {
        panic!("listener bug");
    }

    fn on_request(&self, _request: &Request, _response: Response) {
        panic!("listener bug");
    }
}

#[test]
fn test_panicking_listener_is_isolated() {
    let h = Harness::new();
    let bad = Arc::new(Panicky);
    let good = RecordingListener::new("good", Reply::Status(200));
    assert!(h.client.register_listener(bad.clone(), "/bad"));
    assert!(h.client.register_listener(good.clone(), "/good"));

    h.connect("c1");
    h.request(1, "/bad");
    h.request(2, "/good");

    assert_eq!(good.connected_events().len(), 1);
    assert_eq!(good.request_paths(), vec!["/good".to_string()]);
    assert_eq!(h.client.stats().listener_panics, 2);
}

#[test]
fn test_panicking_catch_up_does_not_reach_caller() {
    let h = Harness::new();
    h.connect("c1");

    let bad = Arc::new(Panicky);
    assert!(h.client.register_listener(bad.clone(), "/bad"));
    assert_eq!(h.client.stats().listener_panics, 1);
    assert_eq!(h.client.registration_count(), 1);
}

/// Blocks the worker inside `on_connected` until released.
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Listener for Gate {
    fn on_connected(&self, _endpoint_url: &str, _info: &ConnectionInfo) {
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(Duration::from_secs(5));
    }

    fn on_request(&self, _request: &Request, _response: Response) {}
}

fn connection_ids(listener: &RecordingListener) -> Vec<String> {
    listener
        .connected_events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Connected { connection_id, .. } => Some(connection_id),
            _ => None,
        })
        .collect()
}

#[test]
fn test_catch_up_never_overtakes_newer_epoch() {
    let h = Harness::new();
    let (entered_tx, entered_rx) = channel::unbounded();
    let (release_tx, release_rx) = channel::unbounded();
    let gate = Arc::new(Gate {
        entered: entered_tx,
        release: release_rx,
    });
    assert!(h.client.register_listener(gate.clone(), "/gate"));

    // Worker parked inside the c1 broadcast, c2 queued behind it
    h.events.connected(connection(BASE_URL, "c1")).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    h.events.connected(connection(BASE_URL, "c2")).unwrap();

    let late = RecordingListener::new("late", Reply::Status(200));
    thread::scope(|s| {
        let registering = s.spawn(|| h.client.register_listener(late.clone(), "/late"));
        assert!(wait_for(Duration::from_secs(2), || h.client.registration_count() == 2));
        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert!(registering.join().unwrap());
    });
    h.flush();

    assert_eq!(connection_ids(&late), vec!["c2".to_string()]);
    assert_eq!(h.client.connection_info().unwrap().connection_id(), "c2");
}

/// Registers another listener from inside `on_request`.
struct Registrar {
    client: Arc<Client>,
    late: Arc<RecordingListener>,
}

impl Listener for Registrar {
    fn on_connected(&self, _endpoint_url: &str, _info: &ConnectionInfo) {}

    fn on_request(&self, _request: &Request, response: Response) {
        let registered = self.client.register_listener(self.late.clone(), "/late");
        response.set_status(if registered { 201 } else { 409 });
        let _ = response.send();
    }
}

#[test]
fn test_register_from_callback_catches_up_inline() {
    let transport = common::RecordingTransport::new();
    let client = Arc::new(Client::new(ConnectorConfig::default(), transport.clone()).unwrap());
    let events = client.transport_events();
    let late = RecordingListener::new("late", Reply::Status(200));
    let registrar = Arc::new(Registrar {
        client: Arc::clone(&client),
        late: late.clone(),
    });
    assert!(client.register_listener(registrar.clone(), "/register"));

    events.connected(connection(BASE_URL, "c1")).unwrap();
    events.request(Request::new(1, "POST", "/register")).unwrap();
    events.flush().unwrap();

    assert_eq!(transport.responses()[0].status, 201);
    assert_eq!(connection_ids(&late), vec!["c1".to_string()]);

    drop(registrar);
}

#[test]
fn test_events_rejected_after_shutdown() {
    let h = Harness::new();
    let l = RecordingListener::new("l", Reply::Status(200));
    assert!(h.client.register_listener(l.clone(), "/l"));
    h.connect("c1");

    let events = h.client.transport_events();
    drop(h);

    assert!(matches!(events.disconnected(), Err(ConnectorError::Shutdown)));
    assert!(matches!(
        events.request(Request::new(1, "GET", "/l")),
        Err(ConnectorError::Shutdown)
    ));
    assert!(matches!(events.flush(), Err(ConnectorError::Shutdown)));

    // Shutdown does not look like a drop to listeners
    assert_eq!(l.count(&Event::Disconnected), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let transport = common::RecordingTransport::new();
    let result = Client::new(
        ConnectorConfig::default().with_event_queue_capacity(0),
        transport,
    );
    assert!(matches!(result, Err(ConnectorError::Config(_))));
}

#[test]
fn test_custom_thread_name() {
    let h = Harness::with_config(ConnectorConfig::default().with_worker_thread_name("edge-relay"));
    assert_eq!(h.client.config().worker_thread_name, "edge-relay");
    h.connect("c1");
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);
}
