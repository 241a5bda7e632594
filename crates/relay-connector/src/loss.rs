// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message loss notification.
//!
//! The relay reports dropped messages by flow tag. Each occurrence is
//! forwarded once to every distinct listener; recovery is left to the
//! application.

use crate::engine::Core;
use std::collections::BTreeSet;

/// Flow tags of one loss occurrence, deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LossBatch {
    tags: BTreeSet<String>,
}

impl LossBatch {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Core {
    pub(crate) fn handle_message_loss(&self, flow_tags: Vec<String>) {
        self.stats.record_loss();
        let batch = LossBatch::new(flow_tags);
        let tags = batch.tags();

        let listeners = self.registry.read().distinct_listeners();
        log::info!(
            "[loss] relay dropped messages for {} flow tag(s), notifying {} listener(s)",
            batch.len(),
            listeners.len()
        );
        for listener in listeners {
            self.notify("on_message_loss", || listener.on_message_loss(&tags));
        }
    }
}
