// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Response deadline timer.
//!
//! A background thread sleeps until the earliest pending deadline, then asks
//! the core to expire everything that is due. New requests wake it up so a
//! shorter deadline is never overslept.
//!
//! The thread only holds a [`Weak`] reference to the core and never keeps it
//! alive while waiting.

use crate::engine::Core;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::JoinHandle;
use std::time::Instant;

/// Messages understood by the timer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerCommand {
    /// A deadline was added; recompute the next wake-up.
    Wake,
    /// Exit the thread.
    Stop,
}

/// Timer thread handle. Stops and joins the thread on drop.
#[derive(Debug)]
pub(crate) struct TimerHandle {
    tx: Sender<TimerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Spawn the timer thread.
    ///
    /// `tx` and `rx` are the two ends of the channel also used by the core
    /// to send [`TimerCommand::Wake`].
    pub fn spawn(
        core: Weak<Core>,
        tx: Sender<TimerCommand>,
        rx: Receiver<TimerCommand>,
        name: String,
    ) -> std::io::Result<Self> {
        let thread = std::thread::Builder::new()
            .name(name)
            .spawn(move || run(&core, &rx))?;

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    /// Signal the thread to exit and wait for it.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(TimerCommand::Stop);
            if thread.join().is_err() {
                log::error!("[timer] deadline thread panicked");
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(core: &Weak<Core>, rx: &Receiver<TimerCommand>) {
    log::debug!("[timer] deadline thread started");

    loop {
        let next_deadline = match core.upgrade() {
            Some(core) => core.next_deadline(),
            None => break,
        };

        let command = match next_deadline {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            },
        };

        if command == Some(TimerCommand::Stop) {
            break;
        }

        match core.upgrade() {
            Some(core) => core.expire_due(Instant::now()),
            None => break,
        }
    }

    log::debug!("[timer] deadline thread stopped");
}
