// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The narrow interface this layer needs from the enclosing transport
//! (key exchange, binary packet protocol, MAC, compression, session-id,
//! framed send/recv), plus the single-shot completion latch the blocking
//! client facade waits on.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::Error;
use crate::key::KeyParser;
use crate::policy::ServerPolicy;

/// Which side of the exchange this handler plays. Immutable after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Client,
    Server,
}

/// What the auth core needs from the transport it rides on top of.
///
/// Implementations are owned by the transport, not by the auth layer: the
/// auth layer only ever reaches one through a [`std::sync::Weak`] handle,
/// so it can never prolong the transport's lifetime (§3, invariant on
/// `transport`).
pub trait Transport: Send + Sync {
    /// Enqueue a fully built auth-layer message. The transport is
    /// responsible for serializing concurrent callers (its send mutex).
    fn send(&self, msg: &[u8]);

    /// Send `SSH_MSG_DISCONNECT` with the given reason and close the
    /// connection. No further messages may be sent afterwards.
    fn disconnect(&self, reason: crate::msg::DisconnectReason, description: &str);

    /// The session identifier fixed by the first key exchange.
    fn session_id(&self) -> Vec<u8>;

    /// Whether the underlying connection is still up.
    fn is_active(&self) -> bool;

    /// Any exception captured by the reader thread when the connection died,
    /// or a non-fatal `BadAuthenticationType`/`PartialAuthentication` saved
    /// by the state machine itself.
    fn pending_error(&self) -> Option<Error>;

    /// Record an exception for the blocking facade to retrieve later.
    fn set_saved_exception(&self, err: Error);

    /// Called exactly once, the moment authentication succeeds, to unblock
    /// the connection layer waiting to run `ssh-connection`.
    fn auth_trigger(&self);

    /// Server-side: look up a key parser for the given wire algorithm name.
    fn key_info(&self, alg_name: &str) -> Option<KeyParser>;

    /// Server-side: the pluggable authentication policy.
    fn server_policy(&self) -> Option<Arc<dyn ServerPolicy>>;

    /// `true` if this transport runs the server half of the protocol.
    fn server_mode(&self) -> bool;
}

/// A single-shot wait primitive shared between a blocking caller and the
/// transport's reader thread.
///
/// Modeled as a latch with a wait-with-timeout rather than a raw condition
/// variable: the caller polls in short slices so it can notice transport
/// death even when no message ever arrives to wake it (§9).
pub struct AuthEvent {
    state: Mutex<bool>,
    cond: Condvar,
}

impl AuthEvent {
    pub fn new() -> Arc<Self> {
        Arc::new(AuthEvent {
            state: Mutex::new(false),
            cond: Condvar::new(),
        })
    }

    /// Set the latch. Idempotent: setting an already-set event is a no-op
    /// beyond waking any waiters.
    pub fn set(&self) {
        let mut state = self.state.lock().unwrap();
        *state = true;
        self.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap()
    }

    /// Block for up to `timeout`, returning whether the latch is set
    /// by the time this call returns.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap();
        if *state {
            return true;
        }
        let (state, _) = self.cond.wait_timeout(state, timeout).unwrap();
        *state
    }
}
