// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Listener registry.
//!
//! Maps URL path prefixes to listeners. Entries hold a [`Weak`] reference:
//! the registry never keeps a listener alive, and entries whose listener was
//! dropped are pruned on the next mutation and skipped on lookup.
//!
//! Lookup is a prefix match over `/`-separated segments, longest prefix
//! wins: `/foo` owns `/foo/bar` but not `/foobar`, and `/` owns everything.

use crate::error::{PathError, RegistrationError};
use crate::listener::Listener;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};

/// Identity of a listener object (its allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerId(usize);

impl ListenerId {
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener).cast::<()>() as usize)
    }
}

#[derive(Debug)]
struct Registration {
    listener: Weak<dyn Listener>,
    id: ListenerId,
}

impl Registration {
    fn upgrade(&self) -> Option<Arc<dyn Listener>> {
        self.listener.upgrade()
    }

    fn is_alive(&self) -> bool {
        self.listener.strong_count() > 0
    }
}

/// Check that `path` is acceptable as a registration key.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute(path.to_string()));
    }
    if let Some(ch) = path
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '?' || *c == '#')
    {
        return Err(PathError::InvalidCharacter {
            path: path.to_string(),
            ch,
        });
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(PathError::TrailingSlash(path.to_string()));
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return Err(PathError::EmptySegment(path.to_string())),
            "." | ".." => return Err(PathError::RelativeSegment(path.to_string())),
            _ => {}
        }
    }
    Ok(())
}

/// Path-keyed registrations.
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    entries: BTreeMap<String, Registration>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration. The exact path must be free.
    pub fn register(
        &mut self,
        path: &str,
        listener: Weak<dyn Listener>,
        id: ListenerId,
    ) -> Result<(), RegistrationError> {
        validate_path(path)?;
        self.prune();

        if self.entries.contains_key(path) {
            return Err(RegistrationError::PathTaken(path.to_string()));
        }
        self.entries
            .insert(path.to_string(), Registration { listener, id });
        Ok(())
    }

    /// Remove every registration held by `id`. Returns how many were removed.
    pub fn unregister(&mut self, id: ListenerId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, reg| reg.id != id);
        let removed = before - self.entries.len();
        self.prune();
        removed
    }

    /// Find the live listener owning `route_path`.
    ///
    /// Returns the matched registration path with the listener. Dead entries
    /// are skipped so a shorter live prefix can take over.
    pub fn resolve(&self, route_path: &str) -> Option<(String, Arc<dyn Listener>)> {
        let mut candidate = route_path;
        loop {
            if let Some(listener) = self.entries.get(candidate).and_then(Registration::upgrade) {
                return Some((candidate.to_string(), listener));
            }
            if candidate == "/" {
                return None;
            }
            candidate = match candidate.rfind('/') {
                Some(0) | None => "/",
                Some(idx) => &candidate[..idx],
            };
        }
    }

    /// True if `path` is still held by `id`.
    pub fn is_registered(&self, path: &str, id: ListenerId) -> bool {
        self.entries.get(path).is_some_and(|reg| reg.id == id)
    }

    /// Live registrations as `(path, listener)`, ordered by path.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn Listener>)> {
        self.entries
            .iter()
            .filter_map(|(path, reg)| reg.upgrade().map(|l| (path.clone(), l)))
            .collect()
    }

    /// Live listeners, each listed once regardless of registration count.
    pub fn distinct_listeners(&self) -> Vec<Arc<dyn Listener>> {
        let mut seen = HashSet::new();
        self.entries
            .values()
            .filter(|reg| seen.insert(reg.id))
            .filter_map(Registration::upgrade)
            .collect()
    }

    /// Drop entries whose listener is gone.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, reg| {
            let alive = reg.is_alive();
            if !alive {
                log::debug!("[relay] pruning dropped listener at {}", path);
            }
            alive
        });
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
