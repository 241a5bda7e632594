// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client facade.
//!
//! One [`Client`] owns one logical relay connection shared by any number of
//! listeners. Creating it spawns two threads:
//!
//! - the event worker, which applies transport events in order;
//! - the deadline timer, which answers requests nobody replied to.
//!
//! Dropping the client stops and joins both, unregisters every listener and
//! drops all pending responses.
//!
//! # Example
//!
//! ```
//! use relay_connector::{
//!     Client, ConnectionInfo, ConnectorConfig, Listener, OutboundFrame, Request, Response,
//! };
//! use std::sync::Arc;
//!
//! struct Hello;
//!
//! impl Listener for Hello {
//!     fn on_connected(&self, _endpoint_url: &str, _info: &ConnectionInfo) {}
//!
//!     fn on_request(&self, _request: &Request, response: Response) {
//!         response.set_status(200);
//!         response.set_body("hello");
//!         let _ = response.send();
//!     }
//! }
//!
//! let transport = Arc::new(|frame: OutboundFrame| println!("{:?}", frame));
//! let client = Client::new(ConnectorConfig::default(), transport).unwrap();
//! let hello = Arc::new(Hello);
//! assert!(client.register_listener(hello.clone(), "/hello"));
//!
//! let events = client.transport_events();
//! events
//!     .connected(ConnectionInfo::new(
//!         "https://relay.example.com/v4/f/abc",
//!         "https://c2c.example.com",
//!         "client-1",
//!         "conn-1",
//!         3600,
//!     ))
//!     .unwrap();
//! events.request(Request::new(1, "GET", "/hello")).unwrap();
//! events.flush().unwrap();
//! assert_eq!(client.stats().responses_sent, 1);
//! ```

use crate::activity::{ActivityRecord, UserActivityState};
use crate::config::ConnectorConfig;
use crate::connection::{CatchUp, ConnectionInfo, ConnectionState};
use crate::engine::Core;
use crate::error::ConnectorError;
use crate::listener::Listener;
use crate::registry::ListenerId;
use crate::stats::ClientStatsSnapshot;
use crate::timer::TimerHandle;
use crate::transport::{Transport, TransportEvents};
use crate::worker::{spawn_worker, WorkerCommand};
use crossbeam::channel::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Multiplexing relay client.
pub struct Client {
    core: Arc<Core>,
    commands: Sender<WorkerCommand>,
    worker: Option<JoinHandle<()>>,
    timer: Option<TimerHandle>,
}

impl Client {
    /// Create a client sending outbound frames to `transport`.
    ///
    /// The client starts in [`ConnectionState::Connecting`]; feed it
    /// transport events through [`Client::transport_events`].
    pub fn new(
        config: ConnectorConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConnectorError> {
        config.validate()?;

        let worker_name = config.worker_thread_name.clone();
        let timer_name = format!("{}-timer", worker_name);
        let (timer_tx, timer_rx) = channel::bounded(1);
        let (commands, command_rx) = channel::bounded(config.event_queue_capacity);

        let core = Arc::new(Core::new(config, transport, timer_tx.clone()));
        core.state.lock().connection.begin_connecting();

        let timer = TimerHandle::spawn(Arc::downgrade(&core), timer_tx, timer_rx, timer_name.clone())
            .map_err(|source| ConnectorError::Spawn {
                name: timer_name,
                source,
            })?;

        let worker = spawn_worker(Arc::clone(&core), command_rx, worker_name.clone()).map_err(
            |source| ConnectorError::Spawn {
                name: worker_name,
                source,
            },
        )?;

        log::info!(
            "[relay] client started (response timeout {:?}, policy {:?})",
            core.config.response_timeout(),
            core.config.activity_policy
        );

        Ok(Self {
            core,
            commands,
            worker: Some(worker),
            timer: Some(timer),
        })
    }

    /// Handle the transport uses to push inbound events.
    pub fn transport_events(&self) -> TransportEvents {
        TransportEvents::new(self.commands.clone())
    }

    /// Register `listener` for requests under `path`.
    ///
    /// Returns `false` if the path is malformed or already taken. When
    /// connected, `on_connected` is delivered to the new listener on the
    /// worker thread before this returns, unless a newer connect or a drop
    /// gets there first.
    ///
    /// The client keeps only a weak reference; the caller owns the listener.
    pub fn register_listener(&self, listener: Arc<dyn Listener>, path: &str) -> bool {
        let id = ListenerId::of(&listener);
        let live_epoch = {
            let mut registry = self.core.registry.write();
            if let Err(e) = registry.register(path, Arc::downgrade(&listener), id) {
                log::debug!("[relay] cannot register listener at {:?}: {}", path, e);
                return false;
            }
            let st = self.core.state.lock();
            st.connection.current().map(|_| st.connection.epoch())
        };

        log::debug!("[relay] listener registered at {}", path);
        if let Some(epoch) = live_epoch {
            self.catch_up(path, listener, epoch);
        }
        true
    }

    fn catch_up(&self, path: &str, listener: Arc<dyn Listener>, epoch: u64) {
        let on_worker = self
            .worker
            .as_ref()
            .is_some_and(|w| w.thread().id() == std::thread::current().id());
        if on_worker {
            // Registered from a callback: already serialized
            self.core.deliver_catch_up(path, &listener, epoch);
            return;
        }

        let (done, wait) = channel::bounded(1);
        let command = WorkerCommand::CatchUp(CatchUp {
            path: path.to_string(),
            listener,
            epoch,
            done,
        });
        if self.commands.send(command).is_ok() {
            // Err means the worker exited without delivering
            let _ = wait.recv();
        }
    }

    /// Remove every registration of `listener`.
    ///
    /// Returns `false` if it held none. In-flight responses stay valid.
    pub fn unregister_listener<L: Listener + ?Sized>(&self, listener: &Arc<L>) -> bool {
        let removed = self
            .core
            .registry
            .write()
            .unregister(ListenerId::of(listener));
        if removed > 0 {
            log::debug!("[relay] listener unregistered ({} path(s))", removed);
        }
        removed > 0
    }

    /// Report user activity with a fresh correlation vector.
    pub fn set_user_activity_state(&self, state: UserActivityState) {
        self.core.set_user_activity_state(state, None);
    }

    /// Report user activity, chaining the report to `base_correlation_vector`.
    ///
    /// An invalid base is replaced by a fresh vector.
    pub fn set_user_activity_state_with_base(
        &self,
        state: UserActivityState,
        base_correlation_vector: &str,
    ) {
        self.core
            .set_user_activity_state(state, Some(base_correlation_vector));
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.core.state.lock().connection.state()
    }

    /// Parameters of the live connection, if connected.
    pub fn connection_info(&self) -> Option<Arc<ConnectionInfo>> {
        self.core.state.lock().connection.current()
    }

    pub fn activity_record(&self) -> ActivityRecord {
        self.core.state.lock().activity.record().clone()
    }

    /// Number of unresolved responses.
    pub fn pending_responses(&self) -> usize {
        self.core.state.lock().pending.len()
    }

    /// Number of registered paths.
    pub fn registration_count(&self) -> usize {
        self.core.registry.read().len()
    }

    pub fn stats(&self) -> ClientStatsSnapshot {
        self.core.stats.snapshot()
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.core.config
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == std::thread::current().id() {
                // Dropped from a listener callback: the worker cannot join itself
                let _ = self.commands.try_send(WorkerCommand::Shutdown);
            } else {
                let _ = self.commands.send(WorkerCommand::Shutdown);
                if worker.join().is_err() {
                    log::error!("[relay] worker thread panicked");
                }
            }
        }

        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }

        self.core.registry.write().clear();
        self.core.close();
        log::info!("[relay] client shut down");
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.connection_state())
            .field("registrations", &self.registration_count())
            .field("pending", &self.pending_responses())
            .finish()
    }
}
