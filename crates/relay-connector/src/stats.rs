// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Live counters, updated lock-free from every thread.
#[derive(Debug)]
pub struct ClientStats {
    /// Requests received from the transport.
    pub requests_received: AtomicU64,

    /// Requests answered with a not-found reply.
    pub requests_not_found: AtomicU64,

    /// Requests rejected because too many responses were pending.
    pub requests_overloaded: AtomicU64,

    /// Requests dropped because no connection was live.
    pub requests_dropped: AtomicU64,

    /// Requests dropped because their id was still pending.
    pub requests_duplicate: AtomicU64,

    /// Responses sent by listeners.
    pub responses_sent: AtomicU64,

    /// Responses resolved by the deadline timer.
    pub responses_timed_out: AtomicU64,

    /// Responses dropped by a disconnect or reconnect.
    pub responses_dropped: AtomicU64,

    /// Connect events.
    pub connects: AtomicU64,

    /// Disconnects of a live connection.
    pub disconnects: AtomicU64,

    /// Message loss occurrences.
    pub loss_occurrences: AtomicU64,

    /// Activity reports handed to the transport.
    pub activity_reports_sent: AtomicU64,

    /// Activity acknowledgments received.
    pub activity_acks_received: AtomicU64,

    /// Listener callbacks that panicked.
    pub listener_panics: AtomicU64,

    created: Instant,
}

impl ClientStats {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_not_found: AtomicU64::new(0),
            requests_overloaded: AtomicU64::new(0),
            requests_dropped: AtomicU64::new(0),
            requests_duplicate: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            responses_timed_out: AtomicU64::new(0),
            responses_dropped: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            loss_occurrences: AtomicU64::new(0),
            activity_reports_sent: AtomicU64::new(0),
            activity_acks_received: AtomicU64::new(0),
            listener_panics: AtomicU64::new(0),
            created: Instant::now(),
        }
    }

    pub(crate) fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_found(&self) {
        self.requests_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overloaded(&self) {
        self.requests_overloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_request(&self) {
        self.requests_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate_request(&self) {
        self.requests_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeouts(&self, count: u64) {
        self.responses_timed_out.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.responses_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_loss(&self) {
        self.loss_occurrences.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_activity_report(&self) {
        self.activity_reports_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ack(&self) {
        self.activity_acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_listener_panic(&self) {
        self.listener_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_not_found: self.requests_not_found.load(Ordering::Relaxed),
            requests_overloaded: self.requests_overloaded.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            requests_duplicate: self.requests_duplicate.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            responses_timed_out: self.responses_timed_out.load(Ordering::Relaxed),
            responses_dropped: self.responses_dropped.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            loss_occurrences: self.loss_occurrences.load(Ordering::Relaxed),
            activity_reports_sent: self.activity_reports_sent.load(Ordering::Relaxed),
            activity_acks_received: self.activity_acks_received.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of client statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStatsSnapshot {
    pub requests_received: u64,
    pub requests_not_found: u64,
    pub requests_overloaded: u64,
    pub requests_dropped: u64,
    pub requests_duplicate: u64,
    pub responses_sent: u64,
    pub responses_timed_out: u64,
    pub responses_dropped: u64,
    pub connects: u64,
    pub disconnects: u64,
    pub loss_occurrences: u64,
    pub activity_reports_sent: u64,
    pub activity_acks_received: u64,
    pub listener_panics: u64,
    pub uptime_secs: u64,
}

impl ClientStatsSnapshot {
    /// Requests that reached a listener.
    pub fn requests_dispatched(&self) -> u64 {
        self.requests_received
            .saturating_sub(self.requests_not_found)
            .saturating_sub(self.requests_overloaded)
            .saturating_sub(self.requests_dropped)
            .saturating_sub(self.requests_duplicate)
    }

    /// Responses resolved by any path.
    pub fn responses_resolved(&self) -> u64 {
        self.responses_sent + self.responses_timed_out + self.responses_dropped
    }
}
