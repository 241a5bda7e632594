// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared connector state.
//!
//! [`Core`] is shared (via `Arc`) by the client facade, the event worker,
//! the deadline timer (weakly) and every outstanding `Response` (weakly).
//! Event handlers live next to the component they drive:
//!
//! - connect/disconnect: `connection.rs`
//! - requests, responses, deadlines: `dispatcher.rs`
//! - activity reports and acks: `activity.rs`
//! - message loss: `loss.rs`
//!
//! # Locking
//!
//! `report_lock` is taken first, then `registry`, then `state`, then any
//! response's own lock. `report_lock` stays held while an activity report is
//! handed to the transport, so reports reach the wire in the order they were
//! decided. No lock is held while a listener callback runs.

use crate::activity::ActivityReporter;
use crate::config::ConnectorConfig;
use crate::connection::ConnectionStateMachine;
use crate::pending::PendingTable;
use crate::registry::ListenerRegistry;
use crate::stats::ClientStats;
use crate::timer::TimerCommand;
use crate::transport::{OutboundFrame, Transport, TransportEvent};
use crossbeam::channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// State guarded by the core mutex.
#[derive(Debug)]
pub(crate) struct CoreState {
    pub connection: ConnectionStateMachine,
    pub pending: PendingTable,
    pub activity: ActivityReporter,
}

pub(crate) struct Core {
    pub config: ConnectorConfig,
    pub transport: Arc<dyn Transport>,
    pub state: Mutex<CoreState>,
    pub registry: RwLock<ListenerRegistry>,
    pub report_lock: Mutex<()>,
    pub stats: ClientStats,
    pub timer_tx: Sender<TimerCommand>,
}

impl Core {
    pub fn new(
        config: ConnectorConfig,
        transport: Arc<dyn Transport>,
        timer_tx: Sender<TimerCommand>,
    ) -> Self {
        let activity = ActivityReporter::new(config.activity_policy);
        Self {
            config,
            transport,
            state: Mutex::new(CoreState {
                connection: ConnectionStateMachine::new(),
                pending: PendingTable::new(),
                activity,
            }),
            registry: RwLock::new(ListenerRegistry::new()),
            report_lock: Mutex::new(()),
            stats: ClientStats::new(),
            timer_tx,
        }
    }

    /// Apply one transport event. Runs on the worker thread.
    pub fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected(info) => self.handle_connected(info),
            TransportEvent::Disconnected => self.handle_disconnected(),
            TransportEvent::Request(request) => self.dispatch_request(request),
            TransportEvent::MessageLoss(tags) => self.handle_message_loss(tags),
            TransportEvent::ActivityAccepted(vector) => self.handle_activity_accepted(&vector),
        }
    }

    /// Hand a frame to the transport.
    pub fn emit(&self, frame: OutboundFrame) {
        self.transport.send_frame(frame);
    }

    /// Run a listener callback, isolating panics.
    pub fn notify<F: FnOnce()>(&self, callback: &str, f: F) {
        if catch_unwind(AssertUnwindSafe(f)).is_err() {
            self.stats.record_listener_panic();
            log::error!("[relay] listener panicked in {}", callback);
        }
    }

    /// Final teardown: no more connection, every pending response dropped.
    pub fn close(&self) {
        let mut st = self.state.lock();
        st.connection.close();
        let dropped = self.drop_pending(&mut st.pending);
        if dropped > 0 {
            log::debug!("[relay] shutdown dropped {} pending response(s)", dropped);
        }
    }
}
