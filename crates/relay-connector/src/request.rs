// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Incoming relay request.

use std::collections::HashMap;

/// HTTP-like request pushed by a remote service through the relay.
///
/// Content is a verbatim copy of what the originating service sent. The
/// transport builds it and hands it to the connector; listeners only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: u64,
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(id: u64, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    /// Builder: add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Builder: set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Request ID, unique within one connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// HTTP method (GET, POST, ...).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Full path including the listener prefix and any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path without query string or fragment, used for routing.
    pub fn route_path(&self) -> &str {
        match self.path.find(['?', '#']) {
            Some(end) => &self.path[..end],
            None => &self.path,
        }
    }

    /// Header lookup (exact name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Body/content.
    pub fn body(&self) -> &str {
        &self.body
    }
}
