// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the relay connector.
//!
//! Request handling reports failures through return codes
//! ([`SendResult`](crate::SendResult), `bool` from registration). The types
//! here cover the ambient surface: client construction, event delivery after
//! shutdown, and input validation.

use thiserror::Error;

/// Errors raised by the [`Client`](crate::Client) and its transport handle.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connector has been shut down")]
    Shutdown,
}

/// Why a listener path was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path must start with '/': {0}")]
    NotAbsolute(String),

    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("path must not end with '/': {0}")]
    TrailingSlash(String),

    #[error("path contains a relative segment: {0}")]
    RelativeSegment(String),

    #[error("path contains invalid character {ch:?}: {path}")]
    InvalidCharacter { path: String, ch: char },
}

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("path already registered: {0}")]
    PathTaken(String),
}

/// Malformed correlation vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CvError {
    #[error("correlation vector is empty")]
    Empty,

    #[error("correlation vector base is invalid: {0}")]
    InvalidBase(String),

    #[error("correlation vector element is invalid: {0}")]
    InvalidElement(String),

    #[error("correlation vector exceeds {max} characters")]
    TooLong { max: usize },
}
