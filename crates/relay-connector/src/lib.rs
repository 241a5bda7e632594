// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Relay Connector
//!
//! Client side of a push relay: one long-lived logical connection to a
//! cloud relay shared by many application listeners. Remote services send
//! HTTP-like requests to a listener's endpoint URL; the relay pushes them
//! down the connection and the listener replies through a [`Response`].
//!
//! # Features
//!
//! - **Path routing**: longest segment-aware prefix wins (`/a/b` owns `/a/b/c`)
//! - **Response correlation**: one resolution per request, with deadlines
//! - **Connection lifecycle**: epochs, endpoint URL change detection, catch-up
//!   `on_connected` for late registrations
//! - **Activity reporting**: user activity state with correlation vectors
//! - **Message loss**: per-occurrence notification to every listener
//!
//! # Architecture
//!
//! ```text
//!                  TransportEvents                      Listener callbacks
//!  transport ------------------------> [worker] -------> on_connected
//!     ^                                   |              on_request
//!     |                                   v              on_disconnected
//!     |                          +-----------------+     on_message_loss
//!     |                          | Core            |     on_user_activity_...
//!     |   Transport::send_frame  |  registry       |
//!     +--------------------------|  state (mutex)  |<---- Response::send
//!                                |  stats          |      (any thread)
//!                                +-----------------+
//!                                        ^
//!                                   [timer] deadlines
//! ```
//!
//! The physical transport is not part of this crate: implement
//! [`Transport`] for outbound frames and push inbound events through the
//! handle returned by [`Client::transport_events`].
//!
//! # Configuration File
//!
//! ```toml
//! response_timeout_ms = 10000
//! max_pending_responses = 4096
//! activity_policy = "on_change"
//! worker_thread_name = "relay-worker"
//! ```

pub mod activity;
pub mod client;
pub mod config;
pub mod connection;
pub mod cv;
pub mod error;
pub mod listener;
pub mod loss;
pub mod request;
pub mod response;
pub mod stats;
pub mod transport;
pub mod url;

mod dispatcher;
mod engine;
mod pending;
mod registry;
mod timer;
mod worker;

pub use activity::{ActivityRecord, ActivityResendPolicy, UserActivityState};
pub use client::Client;
pub use config::{ConfigError, ConnectorConfig};
pub use connection::{ConnectionInfo, ConnectionState};
pub use cv::CorrelationVector;
pub use error::{ConnectorError, CvError, PathError, RegistrationError};
pub use listener::Listener;
pub use loss::LossBatch;
pub use registry::validate_path;
pub use request::Request;
pub use response::{Response, ResponseState, SendResult};
pub use stats::{ClientStats, ClientStatsSnapshot};
pub use transport::{
    ActivityReport, OutboundFrame, ResponseFrame, Transport, TransportEvent, TransportEvents,
};
pub use url::replace_url_base;
