// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use relay_connector::{
    ActivityReport, Client, ConnectionInfo, ConnectorConfig, Listener, OutboundFrame, Request,
    Response, ResponseFrame, Transport, TransportEvents,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Transport that records every outbound frame.
#[derive(Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<OutboundFrame>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.frames.lock().clone()
    }

    pub fn responses(&self) -> Vec<ResponseFrame> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| f.as_response().cloned())
            .collect()
    }

    pub fn activity_reports(&self) -> Vec<ActivityReport> {
        self.frames
            .lock()
            .iter()
            .filter_map(|f| f.as_activity_report().cloned())
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn send_frame(&self, frame: OutboundFrame) {
        self.frames.lock().push(frame);
    }
}

/// Listener callback as observed by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected {
        endpoint_url: String,
        connection_id: String,
        new_endpoint_url: bool,
    },
    Request {
        id: u64,
        path: String,
    },
    Disconnected,
    ActivityAccepted(String),
    MessageLoss(Vec<String>),
}

/// How a [`RecordingListener`] answers requests.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Send this status inline.
    Status(u16),
    /// Keep the response for the test to answer.
    Hold,
}

/// Listener that records every callback.
pub struct RecordingListener {
    name: &'static str,
    reply: Reply,
    events: Mutex<Vec<Event>>,
    held: Mutex<Vec<Response>>,
}

impl RecordingListener {
    pub fn new(name: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            events: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn connected_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Connected { .. }))
            .collect()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Request { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    /// Responses kept by a [`Reply::Hold`] listener, oldest first.
    pub fn take_held(&self) -> Vec<Response> {
        std::mem::take(&mut *self.held.lock())
    }
}

impl Listener for RecordingListener {
    fn on_connected(&self, endpoint_url: &str, info: &ConnectionInfo) {
        self.events.lock().push(Event::Connected {
            endpoint_url: endpoint_url.to_string(),
            connection_id: info.connection_id().to_string(),
            new_endpoint_url: info.new_endpoint_url(),
        });
    }

    fn on_request(&self, request: &Request, response: Response) {
        self.events.lock().push(Event::Request {
            id: request.id(),
            path: request.path().to_string(),
        });
        match self.reply {
            Reply::Status(status) => {
                response.set_status(status);
                response.set_header("X-Listener", self.name);
                response.set_body(request.body());
                let _ = response.send();
            }
            Reply::Hold => self.held.lock().push(response),
        }
    }

    fn on_disconnected(&self) {
        self.events.lock().push(Event::Disconnected);
    }

    fn on_user_activity_state_accepted(&self, correlation_vector: &str) {
        self.events
            .lock()
            .push(Event::ActivityAccepted(correlation_vector.to_string()));
    }

    fn on_message_loss(&self, flow_tags: &[String]) {
        self.events.lock().push(Event::MessageLoss(flow_tags.to_vec()));
    }
}

pub const BASE_URL: &str = "https://relay.example.com/v4/f/abc";
pub const C2C_BASE: &str = "https://c2c.example.com";

pub fn connection(base_endpoint_url: &str, connection_id: &str) -> ConnectionInfo {
    ConnectionInfo::new(base_endpoint_url, C2C_BASE, "client-1", connection_id, 3600)
}

/// Client wired to a recording transport.
pub struct Harness {
    pub client: Client,
    pub transport: Arc<RecordingTransport>,
    pub events: TransportEvents,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ConnectorConfig::default())
    }

    pub fn with_config(config: ConnectorConfig) -> Self {
        let transport = RecordingTransport::new();
        let client = Client::new(config, transport.clone()).expect("client");
        let events = client.transport_events();
        Self {
            client,
            transport,
            events,
        }
    }

    pub fn connect(&self, connection_id: &str) {
        self.connect_to(BASE_URL, connection_id);
    }

    pub fn connect_to(&self, base_endpoint_url: &str, connection_id: &str) {
        self.events
            .connected(connection(base_endpoint_url, connection_id))
            .expect("connected");
        self.flush();
    }

    pub fn disconnect(&self) {
        self.events.disconnected().expect("disconnected");
        self.flush();
    }

    pub fn request(&self, id: u64, path: &str) {
        self.events
            .request(Request::new(id, "POST", path).with_body(format!("body-{}", id)))
            .expect("request");
        self.flush();
    }

    pub fn flush(&self) {
        self.events.flush().expect("flush");
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
