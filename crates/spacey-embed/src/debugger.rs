// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source delivery from a remote debugger
//!
//! When the host is started in wait-for-source mode, the program to run is
//! not on disk: a debugger client pushes it over the debug connection. The
//! [`DebuggerSourceGate`] blocks the host thread until that payload arrives or
//! the connection drops. Nothing else runs on the thread in the meantime.
//!
//! The debug channel is not reentrant, so at most one session may wait at a
//! time. A second request while one is waiting fails with
//! [`BridgeError::AlreadyWaiting`] before the wire is touched.

use crate::error::{BridgeError, Result};
use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Transport the gate waits on.
pub trait DebuggerWire: Send + Sync {
    /// Ask the debuggee to stop whatever it is currently running.
    fn stop(&self);

    /// Block until the client sends source or the connection drops.
    ///
    /// On delivery `on_source` is called with the resource name and source
    /// bytes before [`WireStatus::Received`] is returned.
    fn wait_for_client_source(&self, on_source: &mut dyn FnMut(&[u8], &[u8])) -> WireStatus;
}

/// How a wait on the wire ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStatus {
    /// A source payload was handed to the callback
    Received,
    /// The client disconnected
    Closed,
}

/// Lifecycle of one wait-for-source request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No request made yet
    #[default]
    Idle,
    /// Blocked on the wire
    Waiting,
    /// Source was delivered
    Resolved,
    /// The connection dropped
    Closed,
}

/// Source pushed by a debugger client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerSource {
    /// Name the client gave the source
    pub resource_name: String,
    /// Source bytes as received
    pub source: Vec<u8>,
}

/// One wait-for-source request.
///
/// Holds the `Waiting` slot for its lifetime. A session dropped without
/// being resolved ends up `Closed`, so a panicking wire cannot wedge the gate.
pub struct DebuggerSession<'g> {
    slot: &'g Mutex<SessionState>,
    finished: bool,
}

impl<'g> DebuggerSession<'g> {
    /// Move the slot to `Waiting`, unless another session already holds it.
    pub fn begin(slot: &'g Mutex<SessionState>) -> Result<Self> {
        let mut state = slot.lock();
        if *state == SessionState::Waiting {
            return Err(BridgeError::AlreadyWaiting);
        }
        *state = SessionState::Waiting;
        Ok(Self {
            slot,
            finished: false,
        })
    }

    /// Current state of the slot
    pub fn state(&self) -> SessionState {
        *self.slot.lock()
    }

    /// Waiting -> Resolved
    pub fn resolve(mut self) {
        self.finish(SessionState::Resolved);
    }

    /// Waiting -> Closed
    pub fn close(mut self) {
        self.finish(SessionState::Closed);
    }

    fn finish(&mut self, state: SessionState) {
        *self.slot.lock() = state;
        self.finished = true;
    }
}

impl Drop for DebuggerSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.slot.lock() = SessionState::Closed;
        }
    }
}

/// Blocking hand-off point between a debugger client and the compiler
pub struct DebuggerSourceGate {
    wire: Box<dyn DebuggerWire>,
    state: Mutex<SessionState>,
}

impl DebuggerSourceGate {
    /// Create a gate waiting on `wire`
    pub fn new(wire: impl DebuggerWire + 'static) -> Self {
        Self {
            wire: Box::new(wire),
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// State of the most recent session
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Signal the debuggee to stop without waiting for anything.
    pub fn stop_debuggee(&self) {
        self.wire.stop();
    }

    /// Block until a client delivers source.
    ///
    /// Returns exactly once per call. A dropped connection is terminal for
    /// this request; the caller decides whether to ask again.
    pub fn wait_for_source(&self) -> Result<DebuggerSource> {
        let session = DebuggerSession::begin(&self.state)?;

        self.wire.stop();
        tracing::debug!("waiting for debugger client source");

        let mut received = None;
        let status = self.wire.wait_for_client_source(&mut |name, source| {
            received = Some(DebuggerSource {
                resource_name: String::from_utf8_lossy(name).into_owned(),
                source: source.to_vec(),
            });
        });

        match (status, received) {
            (WireStatus::Received, Some(source)) => {
                session.resolve();
                tracing::debug!(
                    resource = %source.resource_name,
                    len = source.source.len(),
                    "received debugger source"
                );
                Ok(source)
            }
            _ => {
                session.close();
                tracing::warn!("debugger connection closed while waiting for source");
                Err(BridgeError::ConnectionClosed)
            }
        }
    }
}

struct SourcePayload {
    resource_name: Vec<u8>,
    source: Vec<u8>,
}

/// Create an in-process debugger connection.
///
/// The [`ChannelWire`] goes to the gate; [`DebuggerClient`] handles go to
/// whatever thread talks to the actual debugger. Dropping every client
/// closes the connection.
pub fn channel() -> (ChannelWire, DebuggerClient) {
    let (tx, rx) = unbounded();
    let stops = Arc::new(AtomicUsize::new(0));
    (
        ChannelWire {
            payloads: rx,
            stops: Arc::clone(&stops),
        },
        DebuggerClient { payloads: tx, stops },
    )
}

/// Receiving end of [`channel`]
pub struct ChannelWire {
    payloads: Receiver<SourcePayload>,
    stops: Arc<AtomicUsize>,
}

impl DebuggerWire for ChannelWire {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn wait_for_client_source(&self, on_source: &mut dyn FnMut(&[u8], &[u8])) -> WireStatus {
        match self.payloads.recv() {
            Ok(payload) => {
                on_source(&payload.resource_name, &payload.source);
                WireStatus::Received
            }
            Err(_) => WireStatus::Closed,
        }
    }
}

/// Sending end of [`channel`]
#[derive(Clone)]
pub struct DebuggerClient {
    payloads: Sender<SourcePayload>,
    stops: Arc<AtomicUsize>,
}

impl DebuggerClient {
    /// Push source to the waiting host
    pub fn send_source(&self, resource_name: &str, source: impl Into<Vec<u8>>) -> Result<()> {
        self.payloads
            .send(SourcePayload {
                resource_name: resource_name.as_bytes().to_vec(),
                source: source.into(),
            })
            .map_err(|_| BridgeError::ConnectionClosed)
    }

    /// Number of stop signals the host has issued
    pub fn stop_requests(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}
