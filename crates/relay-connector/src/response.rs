// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Response to a relay request.
//!
//! A [`Response`] is handed to the listener together with its request. It
//! stays mutable until resolved, which happens exactly once by whichever
//! comes first:
//!
//! - `send()` succeeding,
//! - the deadline timer emitting a timeout reply,
//! - the connection dropping.
//!
//! The handle can be moved to another thread and answered later.

use crate::engine::Core;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Outcome of [`Response::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendResult {
    /// Response frame handed to the transport.
    Ok,
    /// The deadline fired first; a timeout reply was sent instead.
    Timeout,
    /// Already sent.
    Duplicate,
    /// No status assigned yet; nothing changed, send again once set.
    Incomplete,
    /// Not connected, or the connection this request came from is gone.
    Disconnected,
}

impl SendResult {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for SendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Timeout => "timeout",
            Self::Duplicate => "duplicate",
            Self::Incomplete => "incomplete",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseState {
    /// Waiting for the listener.
    Pending,
    /// Sent by the listener.
    Sent,
    /// Resolved by the deadline timer.
    TimedOut,
    /// Resolved by a connection drop.
    Dropped,
}

#[derive(Debug)]
pub(crate) struct ResponseData {
    pub status: Option<u16>,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub state: ResponseState,
}

impl ResponseData {
    /// `send()` result for an already resolved response.
    pub fn resolved_result(&self) -> Option<SendResult> {
        match self.state {
            ResponseState::Pending => None,
            ResponseState::Sent => Some(SendResult::Duplicate),
            ResponseState::TimedOut => Some(SendResult::Timeout),
            ResponseState::Dropped => Some(SendResult::Disconnected),
        }
    }
}

/// Shared state behind a [`Response`] handle, also referenced by the
/// pending table.
#[derive(Debug)]
pub(crate) struct ResponseSlot {
    pub id: u64,
    pub epoch: u64,
    pub data: Mutex<ResponseData>,
}

impl ResponseSlot {
    pub fn new(id: u64, epoch: u64) -> Self {
        Self {
            id,
            epoch,
            data: Mutex::new(ResponseData {
                status: None,
                headers: HashMap::new(),
                body: String::new(),
                state: ResponseState::Pending,
            }),
        }
    }

    /// Move a pending slot to `state`. Returns false if already resolved.
    pub fn resolve(&self, state: ResponseState) -> bool {
        let mut data = self.data.lock();
        if data.state == ResponseState::Pending {
            data.state = state;
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> ResponseState {
        self.data.lock().state
    }
}

/// Reply handle for one request.
#[derive(Clone)]
pub struct Response {
    slot: Arc<ResponseSlot>,
    core: Weak<Core>,
}

impl Response {
    pub(crate) fn new(slot: Arc<ResponseSlot>, core: Weak<Core>) -> Self {
        Self { slot, core }
    }

    /// ID of the request this answers.
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Assigned status, if any.
    pub fn status(&self) -> Option<u16> {
        self.slot.data.lock().status
    }

    /// Set the HTTP status. Ignored once resolved.
    pub fn set_status(&self, status: u16) {
        self.update(|data| data.status = Some(status));
    }

    /// Copy of the headers set so far.
    pub fn headers(&self) -> HashMap<String, String> {
        self.slot.data.lock().headers.clone()
    }

    /// Set a header. Ignored once resolved.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.update(|data| {
            data.headers.insert(name, value);
        });
    }

    /// Copy of the body set so far.
    pub fn body(&self) -> String {
        self.slot.data.lock().body.clone()
    }

    /// Set the body. Ignored once resolved.
    pub fn set_body(&self, body: impl Into<String>) {
        let body = body.into();
        self.update(|data| data.body = body);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ResponseState {
        self.slot.state()
    }

    /// Send the response to the requesting service.
    ///
    /// Only the first successful call sends; see [`SendResult`] for the
    /// other outcomes. Callable from any thread.
    pub fn send(&self) -> SendResult {
        match self.core.upgrade() {
            Some(core) => core.send_response(&self.slot),
            None => {
                let data = self.slot.data.lock();
                data.resolved_result().unwrap_or(SendResult::Disconnected)
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut ResponseData)) {
        let mut data = self.slot.data.lock();
        if data.state == ResponseState::Pending {
            f(&mut *data);
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.slot.data.lock();
        f.debug_struct("Response")
            .field("id", &self.slot.id)
            .field("status", &data.status)
            .field("state", &data.state)
            .finish()
    }
}
