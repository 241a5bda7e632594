// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event worker thread.
//!
//! Transport events are queued on a bounded channel and applied one at a
//! time, in order, on a dedicated thread. All listener callbacks, including
//! the catch-up `on_connected` of a late registration, therefore run
//! serialized on this thread.

use crate::connection::CatchUp;
use crate::engine::Core;
use crate::transport::TransportEvent;
use crossbeam::channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Messages consumed by the worker.
pub(crate) enum WorkerCommand {
    /// Apply a transport event.
    Event(TransportEvent),
    /// Deliver a late registration's `on_connected`, then reply.
    CatchUp(CatchUp),
    /// Reply once everything queued before has been applied.
    Flush(Sender<()>),
    /// Exit the loop.
    Shutdown,
}

/// Spawn the worker thread.
pub(crate) fn spawn_worker(
    core: Arc<Core>,
    rx: Receiver<WorkerCommand>,
    name: String,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run(&core, &rx))
}

fn run(core: &Arc<Core>, rx: &Receiver<WorkerCommand>) {
    log::debug!("[relay] worker started");

    // Exits on Shutdown or once every sender is gone
    while let Ok(command) = rx.recv() {
        match command {
            WorkerCommand::Event(event) => {
                if catch_unwind(AssertUnwindSafe(|| core.handle_event(event))).is_err() {
                    log::error!("[relay] event handler panicked, continuing");
                }
            }
            WorkerCommand::CatchUp(catch_up) => {
                core.deliver_catch_up(&catch_up.path, &catch_up.listener, catch_up.epoch);
                let _ = catch_up.done.send(());
            }
            WorkerCommand::Flush(done) => {
                let _ = done.send(());
            }
            WorkerCommand::Shutdown => break,
        }
    }

    log::debug!("[relay] worker stopped");
}
