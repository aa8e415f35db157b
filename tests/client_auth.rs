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

//! Client-side end-to-end scenarios (spec scenarios 1-3): arm an attempt,
//! feed back the frames a server would send, check the facade's verdict.

mod common;

use std::sync::Arc;
use std::thread;

use cryptovec::CryptoVec;

use ssh_userauth::codec::Encode;
use ssh_userauth::{AuthClient, AuthHandler, Config, Error, Mode};

use common::MockTransport;

#[test]
fn password_success_unblocks_facade_and_fires_auth_trigger() {
    let transport: Arc<dyn ssh_userauth::Transport> = Arc::new(MockTransport::client(b"sess-1"));
    let handler = Arc::new(AuthHandler::new(Mode::Client, &transport, Config::default()));
    let client = AuthClient::new(handler.clone(), transport.clone());

    let worker = thread::spawn(move || client.auth_password("alice", "hunter2"));

    // Give the worker thread a moment to arm the attempt and send SERVICE_REQUEST.
    thread::sleep(std::time::Duration::from_millis(20));

    let mut accept = CryptoVec::new();
    accept.push(ssh_userauth::msg::SERVICE_ACCEPT);
    accept.extend_ssh_string(b"ssh-userauth");
    handler.dispatch(&accept).unwrap();

    let mut success = CryptoVec::new();
    success.push(ssh_userauth::msg::USERAUTH_SUCCESS);
    handler.dispatch(&success).unwrap();

    let allowed = worker.join().unwrap().unwrap();
    assert!(allowed.is_empty());
    assert!(handler.is_authenticated());
}

#[test]
fn partial_failure_surfaces_remaining_methods() {
    let transport: Arc<dyn ssh_userauth::Transport> = Arc::new(MockTransport::client(b"sess-2"));
    let handler = AuthHandler::new(Mode::Client, &transport, Config::default());

    let event = handler.arm_publickey(
        "bob",
        Arc::new(common::FakeKey {
            algorithm: "ssh-ed25519".into(),
            blob: b"pub-blob".to_vec(),
        }),
    ).unwrap();

    let mut accept = CryptoVec::new();
    accept.push(ssh_userauth::msg::SERVICE_ACCEPT);
    accept.extend_ssh_string(b"ssh-userauth");
    handler.dispatch(&accept).unwrap();

    let mut failure = CryptoVec::new();
    failure.push(ssh_userauth::msg::USERAUTH_FAILURE);
    failure.extend_name_list(["password"]);
    failure.push_bool(true);
    handler.dispatch(&failure).unwrap();

    assert!(event.is_set());
    assert!(!handler.is_authenticated());
    match transport.pending_error() {
        Some(Error::PartialAuthentication(allowed)) => assert_eq!(allowed, vec!["password"]),
        other => panic!("expected PartialAuthentication, got {:?}", other),
    }
}

#[test]
fn rejected_method_not_in_allowed_list_is_a_bad_authentication_type() {
    let transport: Arc<dyn ssh_userauth::Transport> = Arc::new(MockTransport::client(b"sess-3"));
    let handler = AuthHandler::new(Mode::Client, &transport, Config::default());

    let event = handler.arm_password("bob", "x").unwrap();

    let mut accept = CryptoVec::new();
    accept.push(ssh_userauth::msg::SERVICE_ACCEPT);
    accept.extend_ssh_string(b"ssh-userauth");
    handler.dispatch(&accept).unwrap();

    let mut failure = CryptoVec::new();
    failure.push(ssh_userauth::msg::USERAUTH_FAILURE);
    failure.extend_name_list(["publickey"]);
    failure.push_bool(false);
    handler.dispatch(&failure).unwrap();

    assert!(event.is_set());
    match transport.pending_error() {
        Some(Error::BadAuthenticationType(allowed)) => assert_eq!(allowed, vec!["publickey"]),
        other => panic!("expected BadAuthenticationType, got {:?}", other),
    }
}

#[test]
fn dead_transport_unblocks_the_facade_with_authentication_failed() {
    let transport = Arc::new(MockTransport::client(b"sess-4"));
    let transport_dyn: Arc<dyn ssh_userauth::Transport> = transport.clone();
    let handler = Arc::new(AuthHandler::new(Mode::Client, &transport_dyn, Config::default()));
    let client = AuthClient::new(handler, transport_dyn.clone());

    transport.kill();
    let result = client.auth_none("nobody");
    assert!(matches!(result, Err(Error::AuthenticationFailed)));
}
