// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User activity state reporting.
//!
//! The application tells the relay whether the user is active. Each report
//! carries a correlation vector; the relay acknowledges a report by echoing
//! its vector back.
//!
//! Reports requested while disconnected are queued (newest wins) and sent on
//! the next connect. After a reconnect with nothing queued, the last sent
//! state is repeated with its vector incremented so the relay never loses the
//! user's state across connection epochs.

use crate::cv::CorrelationVector;
use crate::engine::Core;
use crate::transport::{ActivityReport, OutboundFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User activity as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserActivityState {
    /// Nothing reported yet.
    #[default]
    Unknown,
    /// User is interacting with the device.
    Active,
    /// User is idle or away.
    Inactive,
}

impl fmt::Display for UserActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// When a `set_user_activity_state` call produces a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityResendPolicy {
    /// Only when the state differs from the last sent one.
    #[default]
    OnChange,
    /// On every call.
    Always,
    /// When the state changed, or the last report was never acknowledged.
    UntilAcknowledged,
}

/// Snapshot of the client's activity bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityRecord {
    /// State most recently requested by the application.
    pub state: UserActivityState,
    /// State of the last report handed to the transport.
    pub last_sent_state: UserActivityState,
    /// Vector of the last report handed to the transport.
    pub last_sent_vector: Option<String>,
    /// True if the relay acknowledged `last_sent_vector`.
    pub acknowledged: bool,
}

#[derive(Debug)]
pub(crate) struct ActivityReporter {
    policy: ActivityResendPolicy,
    record: ActivityRecord,
    last_sent_cv: Option<CorrelationVector>,
    queued: Option<(UserActivityState, CorrelationVector)>,
}

impl ActivityReporter {
    pub fn new(policy: ActivityResendPolicy) -> Self {
        Self {
            policy,
            record: ActivityRecord::default(),
            last_sent_cv: None,
            queued: None,
        }
    }

    pub fn record(&self) -> &ActivityRecord {
        &self.record
    }

    #[cfg(test)]
    pub fn has_queued(&self) -> bool {
        self.queued.is_some()
    }

    /// Handle an application request. Returns the report to send now.
    pub fn request(
        &mut self,
        state: UserActivityState,
        cv: CorrelationVector,
        connected: bool,
    ) -> Option<ActivityReport> {
        self.record.state = state;

        if !self.should_send(state) {
            // Newest request wins: an older queued report is now obsolete
            self.queued = None;
            return None;
        }

        if connected {
            self.queued = None;
            Some(self.mark_sent(state, cv))
        } else {
            log::debug!("[activity] not connected, queueing {} report", state);
            self.queued = Some((state, cv));
            None
        }
    }

    /// Report to send right after a connect, if any.
    pub fn on_connected(&mut self) -> Option<ActivityReport> {
        if let Some((state, cv)) = self.queued.take() {
            return Some(self.mark_sent(state, cv));
        }

        if self.record.last_sent_state == UserActivityState::Unknown {
            return None;
        }
        let cv = self.last_sent_cv.as_ref()?.increment();
        Some(self.mark_sent(self.record.last_sent_state, cv))
    }

    /// Record an acknowledgment. Returns true if it matches the last report.
    pub fn on_accepted(&mut self, vector: &str) -> bool {
        if self.record.last_sent_vector.as_deref() == Some(vector) {
            self.record.acknowledged = true;
            true
        } else {
            false
        }
    }

    fn should_send(&self, state: UserActivityState) -> bool {
        let changed = state != self.record.last_sent_state;
        match self.policy {
            ActivityResendPolicy::OnChange => changed,
            ActivityResendPolicy::Always => true,
            ActivityResendPolicy::UntilAcknowledged => {
                changed || (self.record.last_sent_vector.is_some() && !self.record.acknowledged)
            }
        }
    }

    fn mark_sent(&mut self, state: UserActivityState, cv: CorrelationVector) -> ActivityReport {
        let vector = cv.to_string();
        self.record.last_sent_state = state;
        self.record.last_sent_vector = Some(vector.clone());
        self.record.acknowledged = false;
        self.last_sent_cv = Some(cv);

        ActivityReport {
            state,
            correlation_vector: vector,
        }
    }
}

impl Core {
    /// Application entry point for both `set_user_activity_state` variants.
    pub(crate) fn set_user_activity_state(&self, state: UserActivityState, base: Option<&str>) {
        let cv = match base {
            Some(base) => CorrelationVector::extend_from(base),
            None => CorrelationVector::new(),
        };

        // Held through the emit so the wire order matches the record
        let _sending = self.report_lock.lock();
        let report = {
            let mut st = self.state.lock();
            let connected = st.connection.is_connected();
            st.activity.request(state, cv, connected)
        };

        if let Some(report) = report {
            self.send_activity_report(report);
        }
    }

    /// Hand a report to the transport. Caller holds `report_lock`.
    pub(crate) fn send_activity_report(&self, report: ActivityReport) {
        log::debug!(
            "[activity] reporting {} (cv={})",
            report.state,
            report.correlation_vector
        );
        self.stats.record_activity_report();
        self.emit(OutboundFrame::ActivityReport(report));
    }

    /// Relay acknowledged the report carrying `vector`.
    pub(crate) fn handle_activity_accepted(&self, vector: &str) {
        self.stats.record_ack();
        let current = self.state.lock().activity.on_accepted(vector);
        if !current {
            log::debug!("[activity] ack for superseded report cv={}", vector);
        }

        let listeners = self.registry.read().distinct_listeners();
        for listener in listeners {
            self.notify("on_user_activity_state_accepted", || {
                listener.on_user_activity_state_accepted(vector);
            });
        }
    }
}
