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

//! The auth state machine (C5): the heart of this crate. Tracks the
//! current attempt, drives outgoing request construction, dispatches
//! incoming messages, enforces the invariants in `SPEC_FULL.md` §3, and
//! signals completion to a blocking caller.

mod client;
mod server;

use std::sync::{Arc, Mutex, Weak};

use cryptovec::CryptoVec;

use crate::codec::Encode;
use crate::config::Config;
use crate::error::Error;
use crate::key::PrivateKey;
use crate::msg;
use crate::transport::{AuthEvent, Mode, Transport};

bitflags::bitflags! {
    /// The authentication methods this layer implements, as a name-list
    /// bitflag set (RFC 4252 only advertises method *names*; the set form
    /// mirrors how the wider transport crate manages its own, larger
    /// method set).
    pub struct MethodSet: u32 {
        const NONE                 = 0b0001;
        const PASSWORD             = 0b0010;
        const PUBLICKEY            = 0b0100;
        const KEYBOARD_INTERACTIVE = 0b1000;
    }
}

impl MethodSet {
    pub fn from_name(name: &str) -> Option<MethodSet> {
        Method::from_str(name).map(MethodSet::from)
    }

    /// Render as the wire name-list, in a stable order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(MethodSet::PUBLICKEY) {
            names.push(Method::PublicKey.as_str());
        }
        if self.contains(MethodSet::PASSWORD) {
            names.push(Method::Password.as_str());
        }
        if self.contains(MethodSet::KEYBOARD_INTERACTIVE) {
            names.push(Method::KeyboardInteractive.as_str());
        }
        if self.contains(MethodSet::NONE) {
            names.push(Method::None.as_str());
        }
        names
    }

    pub fn from_name_list(names: &[String]) -> MethodSet {
        names
            .iter()
            .filter_map(|n| MethodSet::from_name(n))
            .fold(MethodSet::empty(), |acc, m| acc | m)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        match method {
            Method::None => MethodSet::NONE,
            Method::Password => MethodSet::PASSWORD,
            Method::PublicKey => MethodSet::PUBLICKEY,
            Method::KeyboardInteractive => MethodSet::KEYBOARD_INTERACTIVE,
        }
    }
}

/// One of the four authentication methods this layer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    None,
    Password,
    PublicKey,
    KeyboardInteractive,
}

impl Method {
    pub const NONE: &'static str = "none";
    pub const PASSWORD: &'static str = "password";
    pub const PUBLICKEY: &'static str = "publickey";
    pub const KEYBOARD_INTERACTIVE: &'static str = "keyboard-interactive";

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::None => Self::NONE,
            Method::Password => Self::PASSWORD,
            Method::PublicKey => Self::PUBLICKEY,
            Method::KeyboardInteractive => Self::KEYBOARD_INTERACTIVE,
        }
    }

    pub fn from_str(name: &str) -> Option<Method> {
        match name {
            Self::NONE => Some(Method::None),
            Self::PASSWORD => Some(Method::Password),
            Self::PUBLICKEY => Some(Method::PublicKey),
            Self::KEYBOARD_INTERACTIVE => Some(Method::KeyboardInteractive),
            _ => None,
        }
    }
}

/// A keyboard-interactive handler: given the challenge's title,
/// instructions and prompts, produce one response per prompt. Runs on
/// whichever thread calls `dispatch` (the transport's reader thread).
pub type InteractiveHandler =
    Box<dyn FnMut(&str, &str, &[(String, bool)]) -> Vec<String> + Send>;

/// Per-attempt state. Guarded by a single mutex: the caller thread writes
/// it while arming an attempt (under the transport's send lock, per §5),
/// the reader thread writes it while dispatching responses, and each
/// reads fields the other wrote, synchronized through this lock rather
/// than through the happens-before edge of `auth_event` alone (Rust, unlike
/// the reference implementation, has no GIL to lean on).
#[derive(Default)]
struct State {
    authenticated: bool,
    auth_method: Option<Method>,
    username: Option<String>,
    password: Option<String>,
    private_key: Option<Arc<dyn PrivateKey>>,
    interactive_handler: Option<InteractiveHandler>,
    submethods: String,
    auth_event: Option<Arc<AuthEvent>>,

    // Server-side only.
    auth_fail_count: u32,
    auth_username: Option<String>,
}

/// The auth core. One instance per transport; see `SPEC_FULL.md` §3 for
/// the full field-by-field contract.
pub struct AuthHandler {
    mode: Mode,
    transport: Weak<dyn Transport>,
    config: Config,
    state: Mutex<State>,
}

impl AuthHandler {
    /// `config` is only consulted in server mode; pass `Config::default()`
    /// for a client-mode handler.
    pub fn new(mode: Mode, transport: &Arc<dyn Transport>, config: Config) -> Self {
        AuthHandler {
            mode,
            transport: Arc::downgrade(transport),
            config,
            state: Mutex::new(State::default()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().unwrap().authenticated
    }

    /// The bound username: the caller-supplied one on the client, the
    /// first-accepted one on the server.
    pub fn username(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        match self.mode {
            Mode::Client => state.username.clone(),
            Mode::Server => state.auth_username.clone(),
        }
    }

    /// Unblocks a waiting caller without sending anything on the wire
    /// (SSH has no "cancel" message). Idempotent.
    pub fn abort(&self) {
        let state = self.state.lock().unwrap();
        if let Some(event) = state.auth_event.as_ref() {
            event.set();
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, Error> {
        self.transport.upgrade().ok_or(Error::TransportDead)
    }

    pub(super) fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatch one inbound packet, `buf[0]` being the message code.
    /// Mirrors the reference's per-message-code handler table: the
    /// actual routing lives in `auth::client`/`auth::server`, split by
    /// mode, as the wider transport splits `client/encrypted.rs` from
    /// `server/encrypted.rs`.
    pub fn dispatch(&self, buf: &[u8]) -> Result<(), Error> {
        let (&code, payload) = buf.split_first().ok_or(Error::MalformedPacket)?;
        match self.mode {
            Mode::Client => self.client_dispatch(code, payload),
            Mode::Server => self.server_dispatch(code, payload),
        }
    }
}

/// The canonical blob signed (client) or verified (server) for publickey
/// authentication (§4.4):
/// `string session_id || byte USERAUTH_REQUEST || string username ||
///  string "ssh-connection" || string "publickey" || boolean true ||
///  string alg_name || string pubkey_blob`.
pub(crate) fn signature_blob(
    session_id: &[u8],
    username: &str,
    alg_name: &str,
    public_blob: &[u8],
) -> CryptoVec {
    let mut buf = CryptoVec::new();
    buf.extend_ssh_string(session_id);
    buf.push(msg::USERAUTH_REQUEST);
    buf.extend_ssh_string(username.as_bytes());
    buf.extend_ssh_string(b"ssh-connection");
    buf.extend_ssh_string(Method::PublicKey.as_str().as_bytes());
    buf.push_bool(true);
    buf.extend_ssh_string(alg_name.as_bytes());
    buf.extend_ssh_string(public_blob);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_set_names_is_stable_and_round_trips() {
        let set = MethodSet::PUBLICKEY | MethodSet::PASSWORD;
        let names = set.names();
        assert_eq!(names, vec!["publickey", "password"]);
        assert_eq!(MethodSet::from_name_list(
            &names.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        ), set);
    }

    #[test]
    fn signature_blob_is_canonical() {
        let a = signature_blob(b"session", "alice", "ssh-ed25519", b"blob");
        let b = signature_blob(b"session", "alice", "ssh-ed25519", b"blob");
        assert_eq!(&a[..], &b[..]);
    }
}
