// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport boundary.
//!
//! The physical channel to the relay (long-poll, streaming HTTP, sockets) is
//! not part of this crate. A transport integrates in two directions:
//!
//! - **Inbound**: it pushes connection events, requests, loss notices and
//!   activity acknowledgments through a [`TransportEvents`] handle obtained
//!   from `Client::transport_events()`.
//! - **Outbound**: it implements [`Transport`] and receives the frames the
//!   connector wants delivered to the relay.
//!
//! Reconnect and backoff policy belong to the transport; the connector only
//! reacts to the resulting `connected`/`disconnected` events.
//!
//! ```text
//!  relay <-> transport --TransportEvents--> [worker] --> listeners
//!                ^                                        |
//!                +------------- Transport::send_frame <---+ (Response::send)
//! ```

use crate::activity::UserActivityState;
use crate::connection::ConnectionInfo;
use crate::error::ConnectorError;
use crate::request::Request;
use crate::worker::WorkerCommand;
use crossbeam::channel::{self, Sender};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outbound sink implemented by the transport.
///
/// `send_frame` is called from the worker thread, the deadline timer thread
/// and any application thread calling `Response::send` or
/// `set_user_activity_state`. It should enqueue and return quickly; it must
/// not call back into the [`Client`](crate::Client) synchronously.
pub trait Transport: Send + Sync {
    /// Queue a frame for delivery to the relay.
    fn send_frame(&self, frame: OutboundFrame);
}

/// A closure-based transport.
impl<F> Transport for F
where
    F: Fn(OutboundFrame) + Send + Sync,
{
    fn send_frame(&self, frame: OutboundFrame) {
        self(frame);
    }
}

/// Frame the connector asks the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Reply to an inbound request (including connector-generated
    /// timeout/not-found/overload replies).
    Response(ResponseFrame),

    /// User activity state report.
    ActivityReport(ActivityReport),
}

impl OutboundFrame {
    /// The response payload, if this is a response frame.
    pub fn as_response(&self) -> Option<&ResponseFrame> {
        match self {
            Self::Response(frame) => Some(frame),
            Self::ActivityReport(_) => None,
        }
    }

    /// The activity payload, if this is an activity report.
    pub fn as_activity_report(&self) -> Option<&ActivityReport> {
        match self {
            Self::ActivityReport(report) => Some(report),
            Self::Response(_) => None,
        }
    }
}

/// Serialized response, correlated to its request by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// ID of the request being answered.
    pub id: u64,
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body.
    #[serde(default)]
    pub body: String,
}

impl ResponseFrame {
    /// Frame with a status and no content.
    pub fn status_only(id: u64, status: u16) -> Self {
        Self {
            id,
            status,
            headers: HashMap::new(),
            body: String::new(),
        }
    }
}

/// User activity state report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Reported state.
    pub state: UserActivityState,
    /// Full correlation vector of this report; acknowledgments echo it back.
    pub correlation_vector: String,
}

/// Inbound event delivered by the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection (re-)established.
    Connected(ConnectionInfo),
    /// Connection dropped.
    Disconnected,
    /// Request pushed by a remote service.
    Request(Request),
    /// Messages of these flow tags were dropped by the relay.
    MessageLoss(Vec<String>),
    /// The relay acknowledged the activity report with this vector.
    ActivityAccepted(String),
}

/// Handle used by the transport to push events into the connector.
///
/// Cheap to clone. Events are processed in order on the connector's worker
/// thread. Every method fails with [`ConnectorError::Shutdown`] once the
/// client has been dropped.
#[derive(Clone)]
pub struct TransportEvents {
    tx: Sender<WorkerCommand>,
}

impl TransportEvents {
    pub(crate) fn new(tx: Sender<WorkerCommand>) -> Self {
        Self { tx }
    }

    /// Push a raw event.
    pub fn push(&self, event: TransportEvent) -> Result<(), ConnectorError> {
        self.tx
            .send(WorkerCommand::Event(event))
            .map_err(|_| ConnectorError::Shutdown)
    }

    /// Report a successful (re)connect.
    pub fn connected(&self, info: ConnectionInfo) -> Result<(), ConnectorError> {
        self.push(TransportEvent::Connected(info))
    }

    /// Report a dropped connection.
    pub fn disconnected(&self) -> Result<(), ConnectorError> {
        self.push(TransportEvent::Disconnected)
    }

    /// Deliver an inbound request.
    pub fn request(&self, request: Request) -> Result<(), ConnectorError> {
        self.push(TransportEvent::Request(request))
    }

    /// Report a message loss occurrence.
    pub fn message_loss<I, S>(&self, flow_tags: I) -> Result<(), ConnectorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(TransportEvent::MessageLoss(
            flow_tags.into_iter().map(Into::into).collect(),
        ))
    }

    /// Report an activity state acknowledgment.
    pub fn activity_accepted(
        &self,
        correlation_vector: impl Into<String>,
    ) -> Result<(), ConnectorError> {
        self.push(TransportEvent::ActivityAccepted(correlation_vector.into()))
    }

    /// Block until every event pushed before this call has been processed.
    ///
    /// Must not be called from a listener callback: the worker would wait on
    /// itself.
    pub fn flush(&self) -> Result<(), ConnectorError> {
        let (done_tx, done_rx) = channel::bounded(1);
        self.tx
            .send(WorkerCommand::Flush(done_tx))
            .map_err(|_| ConnectorError::Shutdown)?;
        done_rx.recv().map_err(|_| ConnectorError::Shutdown)
    }
}

impl std::fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportEvents")
            .field("queued", &self.tx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        let frame = OutboundFrame::Response(ResponseFrame::status_only(3, 404));
        assert_eq!(frame.as_response().map(|r| r.status), Some(404));
        assert!(frame.as_activity_report().is_none());

        let frame = OutboundFrame::ActivityReport(ActivityReport {
            state: UserActivityState::Active,
            correlation_vector: "tul4NUsfs9Cl7mOf.0".into(),
        });
        assert!(frame.as_response().is_none());
        assert_eq!(
            frame.as_activity_report().map(|r| r.state),
            Some(UserActivityState::Active)
        );
    }

    #[test]
    fn test_frame_serialization() {
        let frame = OutboundFrame::Response(ResponseFrame::status_only(9, 504));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "response");
        assert_eq!(json["id"], 9);
        assert_eq!(json["status"], 504);

        let frame = OutboundFrame::ActivityReport(ActivityReport {
            state: UserActivityState::Inactive,
            correlation_vector: "tul4NUsfs9Cl7mOf.2".into(),
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"activity_report\""));
        assert!(json.contains("\"state\":\"inactive\""));

        let back: OutboundFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_closure_transport() {
        let (tx, rx) = channel::unbounded();
        let transport = move |frame: OutboundFrame| {
            let _ = tx.send(frame);
        };
        transport.send_frame(OutboundFrame::Response(ResponseFrame::status_only(1, 200)));
        assert_eq!(rx.try_recv().unwrap().as_response().unwrap().status, 200);
    }

    #[test]
    fn test_events_after_receiver_dropped() {
        let (tx, rx) = channel::bounded(4);
        let events = TransportEvents::new(tx);
        drop(rx);
        assert!(matches!(events.disconnected(), Err(ConnectorError::Shutdown)));
        assert!(matches!(events.flush(), Err(ConnectorError::Shutdown)));
    }
}
