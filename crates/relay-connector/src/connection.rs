// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection state machine.
//!
//! ```text
//!  Disconnected --(client created)--> Connecting --(connect)--> Connected
//!     ^  |                                                         ^  |
//!     |  +------------------------(connect)------------------------+  |
//!     +----------------------------(drop)-----------------------------+
//! ```
//!
//! Reconnecting is the transport's business, so there is no separate
//! reconnecting state: after a drop the machine waits in `Disconnected`
//! for the next connect event.
//!
//! Every connect event opens a new *epoch* carrying a fresh
//! [`ConnectionInfo`]. The machine remembers the previous epoch's base
//! endpoint URL so listeners can be told whether dependent registrations
//! need updating. A connect while already connected is accepted and simply
//! starts the next epoch.

use crate::engine::Core;
use crate::listener::Listener;
use crate::registry::ListenerId;
use crate::url::replace_url_base;
use crossbeam::channel::Sender;
use std::sync::Arc;

/// Lifecycle state of the relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and none being attempted.
    Disconnected,
    /// Waiting for the transport's first connect.
    Connecting,
    /// Connected; requests flow and responses can be sent.
    Connected,
}

/// Parameters of one relay connection epoch.
///
/// Built by the transport from the relay's connect handshake. Immutable once
/// handed to listeners; the next connect supersedes it with a new instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    base_endpoint_url: String,
    new_endpoint_url: bool,
    c2c_url_base: String,
    client_id: String,
    connection_id: String,
    connection_ttl_sec: u32,
}

impl ConnectionInfo {
    /// Describe a freshly established connection.
    ///
    /// `new_endpoint_url` is computed by the connector on delivery.
    pub fn new(
        base_endpoint_url: impl Into<String>,
        c2c_url_base: impl Into<String>,
        client_id: impl Into<String>,
        connection_id: impl Into<String>,
        connection_ttl_sec: u32,
    ) -> Self {
        Self {
            base_endpoint_url: base_endpoint_url.into(),
            new_endpoint_url: false,
            c2c_url_base: c2c_url_base.into(),
            client_id: client_id.into(),
            connection_id: connection_id.into(),
            connection_ttl_sec,
        }
    }

    /// Base URL services use to route messages to this client.
    pub fn base_endpoint_url(&self) -> &str {
        &self.base_endpoint_url
    }

    /// True if `base_endpoint_url` differs from the previous epoch's, i.e.
    /// service registrations pointing at the old URL must be refreshed.
    pub fn new_endpoint_url(&self) -> bool {
        self.new_endpoint_url
    }

    /// URL base for client-to-client routing.
    pub fn c2c_url_base(&self) -> &str {
        &self.c2c_url_base
    }

    /// Client ID, stable across reconnects.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Connection ID; a change means per-connection server state is gone.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Connection lifetime declared by the relay, in seconds.
    pub fn connection_ttl_sec(&self) -> u32 {
        self.connection_ttl_sec
    }

    /// Endpoint URL for a listener registered at `path`.
    pub fn endpoint_url_for(&self, path: &str) -> String {
        let base = self.base_endpoint_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Client-to-client variant of an endpoint URL.
    pub fn c2c_endpoint_url(&self, endpoint_url: &str) -> String {
        replace_url_base(endpoint_url, &self.c2c_url_base)
    }
}

/// Late registration waiting for its `on_connected`.
///
/// Queued to the worker so the callback is serialized with every other
/// callback and never overtakes a newer epoch's broadcast.
pub(crate) struct CatchUp {
    pub path: String,
    pub listener: Arc<dyn Listener>,
    /// Epoch that was live when the listener registered.
    pub epoch: u64,
    pub done: Sender<()>,
}

/// Result of accepting a connect event.
#[derive(Debug, Clone)]
pub(crate) struct ConnectTransition {
    /// Info as delivered to listeners (`new_endpoint_url` filled in).
    pub info: Arc<ConnectionInfo>,
    /// The new epoch number.
    pub epoch: u64,
    /// Connects after the first one, this one included.
    pub reconnects: u64,
    /// True if the previous epoch was still connected (no drop in between).
    pub replaced_live_epoch: bool,
}

/// Tracks connection state and epochs.
#[derive(Debug)]
pub(crate) struct ConnectionStateMachine {
    state: ConnectionState,
    current: Option<Arc<ConnectionInfo>>,
    previous_base_url: Option<String>,
    epoch: u64,
    reconnects: u64,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            current: None,
            previous_base_url: None,
            epoch: 0,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current epoch (0 before the first connect).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Info of the live connection, if connected.
    pub fn current(&self) -> Option<Arc<ConnectionInfo>> {
        if self.is_connected() {
            self.current.clone()
        } else {
            None
        }
    }

    /// `Disconnected -> Connecting`. Returns false in any other state.
    pub fn begin_connecting(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            true
        } else {
            false
        }
    }

    /// Accept a connect event and open a new epoch.
    pub fn connected(&mut self, mut info: ConnectionInfo) -> ConnectTransition {
        let replaced_live_epoch = self.is_connected();

        info.new_endpoint_url = self
            .previous_base_url
            .as_deref()
            .map_or(true, |prev| prev != info.base_endpoint_url);

        if self.epoch > 0 {
            self.reconnects += 1;
        }
        self.epoch += 1;
        self.previous_base_url = Some(info.base_endpoint_url.clone());

        let info = Arc::new(info);
        self.current = Some(Arc::clone(&info));
        self.state = ConnectionState::Connected;

        ConnectTransition {
            info,
            epoch: self.epoch,
            reconnects: self.reconnects,
            replaced_live_epoch,
        }
    }

    /// Accept a drop. Returns true if a live connection was lost.
    pub fn disconnected(&mut self) -> bool {
        let was_connected = self.is_connected();
        if was_connected {
            self.state = ConnectionState::Disconnected;
        }
        was_connected
    }

    /// Final state on shutdown.
    pub fn close(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}

impl Core {
    /// Open a new epoch and announce it to every registration.
    pub(crate) fn handle_connected(&self, info: ConnectionInfo) {
        self.stats.record_connect();

        let sending = self.report_lock.lock();
        let (transition, registrations, report) = {
            let registry = self.registry.read();
            let mut st = self.state.lock();
            let transition = st.connection.connected(info);
            if transition.replaced_live_epoch {
                let dropped = self.drop_pending(&mut st.pending);
                log::info!(
                    "[relay] connect without prior drop, {} pending response(s) dropped",
                    dropped
                );
            }
            // Queued or repeated report goes out before any listener can
            // request a newer one
            let report = st.activity.on_connected();
            (transition, registry.snapshot(), report)
        };
        if let Some(report) = report {
            self.send_activity_report(report);
        }
        drop(sending);

        let info = &transition.info;
        log::info!(
            "[relay] connected: epoch={} reconnects={} connection_id={} endpoint={} new_endpoint_url={}",
            transition.epoch,
            transition.reconnects,
            info.connection_id(),
            info.base_endpoint_url(),
            info.new_endpoint_url()
        );

        for (path, listener) in registrations {
            let endpoint_url = info.endpoint_url_for(&path);
            self.notify("on_connected", || listener.on_connected(&endpoint_url, info));
        }
    }

    /// Deliver a late registration's `on_connected`. Runs on the worker.
    ///
    /// Skipped if the epoch seen at registration is no longer live (the
    /// newer epoch's broadcast already covered the registration) or if the
    /// registration is gone.
    pub(crate) fn deliver_catch_up(&self, path: &str, listener: &Arc<dyn Listener>, epoch: u64) {
        let info = {
            let registry = self.registry.read();
            let st = self.state.lock();
            let live = st
                .connection
                .current()
                .filter(|_| st.connection.epoch() == epoch);
            match live {
                Some(info) if registry.is_registered(path, ListenerId::of(listener)) => info,
                _ => {
                    log::debug!("[relay] catch-up for {} superseded, skipping", path);
                    return;
                }
            }
        };

        let endpoint_url = info.endpoint_url_for(path);
        self.notify("on_connected", || listener.on_connected(&endpoint_url, &info));
    }

    /// Tear down the live epoch.
    pub(crate) fn handle_disconnected(&self) {
        let listeners = {
            let registry = self.registry.read();
            let mut st = self.state.lock();
            if !st.connection.disconnected() {
                log::debug!("[relay] disconnect while not connected, ignoring");
                return;
            }
            let dropped = self.drop_pending(&mut st.pending);
            log::info!(
                "[relay] disconnected (epoch {}), {} pending response(s) dropped",
                st.connection.epoch(),
                dropped
            );
            registry.distinct_listeners()
        };

        self.stats.record_disconnect();
        for listener in listeners {
            self.notify("on_disconnected", || listener.on_disconnected());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(base: &str, connection_id: &str) -> ConnectionInfo {
        ConnectionInfo::new(base, "https://c2c.example.com", "client-1", connection_id, 3600)
    }

    #[test]
    fn test_initial_state() {
        let sm = ConnectionStateMachine::new();
        assert_eq!(sm.state(), ConnectionState::Disconnected);
        assert_eq!(sm.epoch(), 0);
        assert!(sm.current().is_none());
    }

    #[test]
    fn test_connect_cycle() {
        let mut sm = ConnectionStateMachine::new();
        assert!(sm.begin_connecting());
        assert!(!sm.begin_connecting());
        assert_eq!(sm.state(), ConnectionState::Connecting);

        let t = sm.connected(info("https://a.example.com/ep", "c1"));
        assert_eq!(t.epoch, 1);
        assert!(!t.replaced_live_epoch);
        assert!(t.info.new_endpoint_url(), "first connect is always a new URL");
        assert!(sm.is_connected());
        assert_eq!(sm.current().unwrap().connection_id(), "c1");

        assert!(sm.disconnected());
        assert_eq!(sm.state(), ConnectionState::Disconnected);
        assert!(sm.current().is_none());
        assert!(!sm.disconnected(), "second drop is a no-op");

        let t = sm.connected(info("https://a.example.com/ep", "c2"));
        assert_eq!(t.epoch, 2);
        assert!(!t.info.new_endpoint_url());
        assert_eq!(t.reconnects, 1);

        let t = sm.connected(info("https://b.example.com/ep", "c3"));
        assert!(t.replaced_live_epoch);
        assert!(t.info.new_endpoint_url());
        assert_eq!(t.reconnects, 2);

        sm.close();
        assert_eq!(sm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_endpoint_url_for() {
        let i = info("https://svc.example.com/v4/f/abc/", "c1");
        assert_eq!(
            i.endpoint_url_for("/chat"),
            "https://svc.example.com/v4/f/abc/chat"
        );
        assert_eq!(i.endpoint_url_for("/"), "https://svc.example.com/v4/f/abc/");
        assert_eq!(
            i.c2c_endpoint_url(&i.endpoint_url_for("/chat")),
            "https://c2c.example.com/v4/f/abc/chat"
        );
    }
}
