// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request dispatch and response resolution.
//!
//! Every response is resolved exactly once, by the first of:
//!
//! | Resolver | Frame emitted | Final state |
//! |----------|---------------|-------------|
//! | `Response::send` | listener's response | `Sent` |
//! | deadline timer | `timeout_status` | `TimedOut` |
//! | disconnect / reconnect | none | `Dropped` |
//!
//! All resolvers take the core state lock before the response's own lock,
//! so the pending table and the response state always agree.

use crate::engine::Core;
use crate::listener::Listener;
use crate::pending::PendingTable;
use crate::request::Request;
use crate::response::{Response, ResponseSlot, ResponseState, SendResult};
use crate::timer::TimerCommand;
use crate::transport::{OutboundFrame, ResponseFrame};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of admitting an inbound request.
enum Admission {
    NotConnected,
    NotFound,
    Overloaded,
    Duplicate,
    Accepted {
        prefix: String,
        listener: Arc<dyn Listener>,
        slot: Arc<ResponseSlot>,
    },
}

impl Core {
    /// Route an inbound request to its listener.
    pub(crate) fn dispatch_request(self: &Arc<Self>, request: Request) {
        self.stats.record_request();

        let admission = {
            let registry = self.registry.read();
            let mut st = self.state.lock();
            if !st.connection.is_connected() {
                Admission::NotConnected
            } else {
                match registry.resolve(request.route_path()) {
                    None => Admission::NotFound,
                    Some(_) if st.pending.len() >= self.config.max_pending_responses => {
                        Admission::Overloaded
                    }
                    Some((prefix, listener)) => {
                        let slot = Arc::new(ResponseSlot::new(request.id(), st.connection.epoch()));
                        let deadline = Instant::now() + self.config.response_timeout();
                        match st.pending.insert(Arc::clone(&slot), deadline) {
                            Ok(()) => Admission::Accepted {
                                prefix,
                                listener,
                                slot,
                            },
                            Err(_) => Admission::Duplicate,
                        }
                    }
                }
            }
        };

        match admission {
            Admission::NotConnected => {
                log::warn!(
                    "[dispatch] request id={} arrived while not connected, dropping",
                    request.id()
                );
                self.stats.record_dropped_request();
            }
            Admission::NotFound => {
                log::debug!(
                    "[dispatch] no listener for {} {} (id={})",
                    request.method(),
                    request.path(),
                    request.id()
                );
                self.stats.record_not_found();
                self.emit_status(request.id(), self.config.not_found_status);
            }
            Admission::Overloaded => {
                log::warn!(
                    "[dispatch] {} responses pending, rejecting request id={}",
                    self.config.max_pending_responses,
                    request.id()
                );
                self.stats.record_overloaded();
                self.emit_status(request.id(), self.config.overloaded_status);
            }
            Admission::Duplicate => {
                log::warn!(
                    "[dispatch] duplicate request id={} while still pending, dropping",
                    request.id()
                );
                self.stats.record_duplicate_request();
            }
            Admission::Accepted {
                prefix,
                listener,
                slot,
            } => {
                let _ = self.timer_tx.try_send(TimerCommand::Wake);

                log::debug!(
                    "[dispatch] {} {} -> {} (id={})",
                    request.method(),
                    request.path(),
                    prefix,
                    request.id()
                );
                let response = Response::new(slot, Arc::downgrade(self));
                self.notify("on_request", || listener.on_request(&request, response));
            }
        }
    }

    /// Resolve `slot` by sending the listener's response.
    pub(crate) fn send_response(&self, slot: &Arc<ResponseSlot>) -> SendResult {
        let frame = {
            let mut st = self.state.lock();
            let mut data = slot.data.lock();

            if let Some(result) = data.resolved_result() {
                return result;
            }
            let Some(status) = data.status else {
                return SendResult::Incomplete;
            };
            if !st.connection.is_connected() || st.connection.epoch() != slot.epoch {
                return SendResult::Disconnected;
            }

            st.pending.remove(slot.id);
            data.state = ResponseState::Sent;
            ResponseFrame {
                id: slot.id,
                status,
                headers: data.headers.clone(),
                body: data.body.clone(),
            }
        };

        self.stats.record_sent();
        self.emit(OutboundFrame::Response(frame));
        SendResult::Ok
    }

    /// Earliest pending deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.state.lock().pending.next_deadline()
    }

    /// Time out every response whose deadline is at or before `now`.
    pub(crate) fn expire_due(&self, now: Instant) {
        let expired: Vec<u64> = {
            let mut st = self.state.lock();
            st.pending
                .take_expired(now)
                .into_iter()
                .filter(|slot| slot.resolve(ResponseState::TimedOut))
                .map(|slot| slot.id)
                .collect()
        };

        if expired.is_empty() {
            return;
        }

        self.stats.record_timeouts(expired.len() as u64);
        for id in expired {
            log::debug!("[timer] response id={} timed out", id);
            self.emit_status(id, self.config.timeout_status);
        }
    }

    /// Drop every pending response without emitting a frame.
    ///
    /// Caller must hold the state lock and pass the pending table in.
    pub(crate) fn drop_pending(&self, pending: &mut PendingTable) -> usize {
        let dropped = pending
            .drain()
            .into_iter()
            .filter(|slot| slot.resolve(ResponseState::Dropped))
            .count();
        if dropped > 0 {
            self.stats.record_dropped(dropped as u64);
        }
        dropped
    }

    fn emit_status(&self, id: u64, status: u16) {
        self.emit(OutboundFrame::Response(ResponseFrame::status_only(id, status)));
    }
}
