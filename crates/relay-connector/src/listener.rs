// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Listener trait
//!
//! Applications implement [`Listener`] to receive relay callbacks. The two
//! required methods cover the connection endpoint and incoming requests;
//! everything else has a default no-op implementation, so only the events a
//! listener cares about need to be overridden.
//!
//! # Usage
//!
//! ```
//! use relay_connector::{ConnectionInfo, Listener, Request, Response};
//!
//! struct Echo;
//!
//! impl Listener for Echo {
//!     fn on_connected(&self, endpoint_url: &str, _info: &ConnectionInfo) {
//!         println!("reachable at {}", endpoint_url);
//!     }
//!
//!     fn on_request(&self, request: &Request, response: Response) {
//!         response.set_status(200);
//!         response.set_body(request.body());
//!         let _ = response.send();
//!     }
//! }
//! ```
//!
//! # Thread Safety
//!
//! Callbacks are invoked one at a time from the connector's worker thread,
//! including the catch-up `on_connected` issued by
//! `Client::register_listener`. They must be `Send + Sync` and should not
//! block: hand long-running work off to another thread and reply through the
//! stored [`Response`] later.

use crate::connection::ConnectionInfo;
use crate::request::Request;
use crate::response::Response;

/// Relay callbacks implemented by the application.
pub trait Listener: Send + Sync {
    /// Called when the relay connection is (re-)established.
    ///
    /// # Arguments
    ///
    /// * `endpoint_url` - URL services use to reach this listener's path
    /// * `info` - Parameters of the current connection
    ///
    /// Called once per registration on every connect, and once right away
    /// when registering while already connected.
    fn on_connected(&self, endpoint_url: &str, info: &ConnectionInfo);

    /// Called when a request arrives for a path owned by this listener.
    ///
    /// Fill in `response` and call [`Response::send`], either inline or later
    /// from any thread. Unanswered requests get a timeout response from the
    /// connector after the configured deadline.
    fn on_request(&self, request: &Request, response: Response);

    /// Called when the relay connection drops.
    ///
    /// Pending responses can no longer be sent; the connector reconnects on
    /// its own.
    fn on_disconnected(&self) {}

    /// Called when the relay acknowledged an activity state report.
    ///
    /// `correlation_vector` is the full outgoing vector of the report, not
    /// the base passed to `set_user_activity_state_with_base`.
    fn on_user_activity_state_accepted(&self, correlation_vector: &str) {
        let _ = correlation_vector;
    }

    /// Called when the relay dropped messages of the given flow tags.
    ///
    /// Delivered once per loss occurrence. Resynchronisation is up to the
    /// application.
    fn on_message_loss(&self, flow_tags: &[String]) {
        let _ = flow_tags;
    }
}
