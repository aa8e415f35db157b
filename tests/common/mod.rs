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

//! Test doubles shared by the integration suites: a `Transport` that
//! records what was sent instead of touching a socket, and a `PrivateKey`/
//! `PublicKey` pair whose "signature" is just the blob itself, since real
//! signing math is out of this crate's scope.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ssh_userauth::{DisconnectReason, Error, KeyParser, PrivateKey, PublicKey, ServerPolicy, Transport};

enum SavedError {
    BadAuthenticationType(Vec<String>),
    PartialAuthentication(Vec<String>),
    AuthenticationFailed,
    TransportDead,
}

impl SavedError {
    fn to_error(&self) -> Error {
        match self {
            SavedError::BadAuthenticationType(v) => Error::BadAuthenticationType(v.clone()),
            SavedError::PartialAuthentication(v) => Error::PartialAuthentication(v.clone()),
            SavedError::AuthenticationFailed => Error::AuthenticationFailed,
            SavedError::TransportDead => Error::TransportDead,
        }
    }
}

pub struct MockTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    active: Mutex<bool>,
    saved: Mutex<Option<SavedError>>,
    session_id: Vec<u8>,
    pub auth_trigger_count: Mutex<u32>,
    policy: Option<Arc<dyn ServerPolicy>>,
    key_parsers: Mutex<HashMap<String, KeyParser>>,
    server_mode: bool,
    pub disconnects: Mutex<Vec<(DisconnectReason, String)>>,
}

impl MockTransport {
    pub fn client(session_id: &[u8]) -> Self {
        MockTransport {
            sent: Mutex::new(Vec::new()),
            active: Mutex::new(true),
            saved: Mutex::new(None),
            session_id: session_id.to_vec(),
            auth_trigger_count: Mutex::new(0),
            policy: None,
            key_parsers: Mutex::new(HashMap::new()),
            server_mode: false,
            disconnects: Mutex::new(Vec::new()),
        }
    }

    pub fn server(session_id: &[u8], policy: Arc<dyn ServerPolicy>) -> Self {
        MockTransport {
            sent: Mutex::new(Vec::new()),
            active: Mutex::new(true),
            saved: Mutex::new(None),
            session_id: session_id.to_vec(),
            auth_trigger_count: Mutex::new(0),
            policy: Some(policy),
            key_parsers: Mutex::new(HashMap::new()),
            server_mode: true,
            disconnects: Mutex::new(Vec::new()),
        }
    }

    pub fn register_key(&self, alg: &str, parser: KeyParser) {
        self.key_parsers.lock().unwrap().insert(alg.to_string(), parser);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> Vec<u8> {
        self.sent.lock().unwrap().last().cloned().expect("nothing sent")
    }

    pub fn kill(&self) {
        *self.active.lock().unwrap() = false;
    }
}

impl Transport for MockTransport {
    fn send(&self, msg: &[u8]) {
        self.sent.lock().unwrap().push(msg.to_vec());
    }

    fn disconnect(&self, reason: DisconnectReason, description: &str) {
        *self.active.lock().unwrap() = false;
        self.disconnects
            .lock()
            .unwrap()
            .push((reason, description.to_string()));
    }

    fn session_id(&self) -> Vec<u8> {
        self.session_id.clone()
    }

    fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }

    fn pending_error(&self) -> Option<Error> {
        self.saved.lock().unwrap().as_ref().map(SavedError::to_error)
    }

    fn set_saved_exception(&self, err: Error) {
        let saved = match err {
            Error::BadAuthenticationType(v) => SavedError::BadAuthenticationType(v),
            Error::PartialAuthentication(v) => SavedError::PartialAuthentication(v),
            Error::AuthenticationFailed => SavedError::AuthenticationFailed,
            Error::TransportDead => SavedError::TransportDead,
            _ => return,
        };
        *self.saved.lock().unwrap() = Some(saved);
    }

    fn auth_trigger(&self) {
        *self.auth_trigger_count.lock().unwrap() += 1;
    }

    fn key_info(&self, alg_name: &str) -> Option<KeyParser> {
        self.key_parsers.lock().unwrap().get(alg_name).cloned()
    }

    fn server_policy(&self) -> Option<Arc<dyn ServerPolicy>> {
        self.policy.clone()
    }

    fn server_mode(&self) -> bool {
        self.server_mode
    }
}

/// A key whose "signature" is just the signed blob itself. Good enough to
/// exercise the plumbing around signing/verification without pulling in
/// actual cryptography, which this crate treats as opaque.
pub struct FakeKey {
    pub algorithm: String,
    pub blob: Vec<u8>,
}

impl PublicKey for FakeKey {
    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn public_blob(&self) -> Vec<u8> {
        self.blob.clone()
    }

    fn verify(&self, session_blob: &[u8], signature: &[u8]) -> bool {
        signature == session_blob
    }
}

impl PrivateKey for FakeKey {
    fn public_key(&self) -> Arc<dyn PublicKey> {
        Arc::new(FakeKey {
            algorithm: self.algorithm.clone(),
            blob: self.blob.clone(),
        })
    }

    fn sign(&self, session_blob: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(session_blob.to_vec())
    }
}
