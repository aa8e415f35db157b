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

//! Server-side transitions of the auth state machine (§4.4, server states).

use std::sync::Arc;

use cryptovec::CryptoVec;
use log::{debug, info, warn};

use crate::codec::{Encode, Reader};
use crate::error::Error;
use crate::msg::{self, DisconnectReason};
use crate::policy::{AuthResult, InteractiveOutcome};
use crate::transport::Transport;

use super::{signature_blob, AuthHandler, Method};

impl AuthHandler {
    pub(super) fn server_dispatch(&self, code: u8, payload: &[u8]) -> Result<(), Error> {
        match code {
            msg::SERVICE_REQUEST => self.server_service_request(payload),
            msg::USERAUTH_REQUEST => self.server_userauth_request(payload),
            msg::USERAUTH_INFO_RESPONSE => self.server_userauth_info_response(payload),
            _ => Err(Error::ProtocolViolation(
                "unexpected message code for a server-mode auth handler",
            )),
        }
    }

    /// Disconnect the transport and fail the current dispatch with the
    /// same reason, so the reader thread unwinds rather than keeps going.
    fn disconnect(
        &self,
        transport: &Arc<dyn Transport>,
        reason: DisconnectReason,
        description: &'static str,
    ) -> Error {
        transport.disconnect(reason, description);
        Error::Disconnect { reason, description }
    }

    /// Transition 1: accept the service, piggybacking the banner (if
    /// configured) on the same flush.
    fn server_service_request(&self, payload: &[u8]) -> Result<(), Error> {
        let transport = self.transport()?;
        let mut r = Reader::new(payload);
        let service = r.read_string()?;
        if service != b"ssh-userauth" {
            return Err(self.disconnect(
                &transport,
                DisconnectReason::ServiceNotAvailable,
                "unsupported service requested",
            ));
        }

        let mut accept = CryptoVec::new();
        accept.push(msg::SERVICE_ACCEPT);
        accept.extend_ssh_string(b"ssh-userauth");
        transport.send(&accept);
        debug!("accepted ssh-userauth service request");

        if let Some(banner) = self.config().auth_banner.as_ref() {
            let mut packet = CryptoVec::new();
            packet.push(msg::USERAUTH_BANNER);
            packet.extend_ssh_string(banner.as_bytes());
            packet.extend_ssh_string(b"");
            transport.send(&packet);
        }
        Ok(())
    }

    /// Transition 2: the main `USERAUTH_REQUEST` dispatch.
    fn server_userauth_request(&self, payload: &[u8]) -> Result<(), Error> {
        let transport = self.transport()?;
        let mut r = Reader::new(payload);
        let username = r.read_utf8()?;
        let service = r.read_string()?;
        let method_name = r.read_utf8()?;

        if service != b"ssh-connection" {
            return Err(self.disconnect(
                &transport,
                DisconnectReason::ServiceNotAvailable,
                "userauth requested for an unknown service",
            ));
        }

        {
            let mut state = self.state.lock().unwrap();
            let previously_bound = state.auth_username.clone();
            match previously_bound {
                Some(bound) if bound != username => {
                    return Err(self.disconnect(
                        &transport,
                        DisconnectReason::NoMoreAuthMethodsAvailable,
                        "username changed mid-authentication",
                    ));
                }
                Some(_) => {}
                None => state.auth_username = Some(username.clone()),
            }
            if state.authenticated {
                debug!("ignoring USERAUTH_REQUEST after authentication already granted");
                return Ok(());
            }
        }

        let policy = transport.server_policy();
        let method = Method::from_str(&method_name);

        let result = match method {
            Some(Method::None) => {
                self.state.lock().unwrap().auth_method = Some(Method::None);
                policy
                    .as_ref()
                    .map(|p| p.check_auth_none(&username))
                    .unwrap_or(AuthResult::Failed)
            }
            Some(Method::Password) => {
                self.state.lock().unwrap().auth_method = Some(Method::Password);
                let change_req = r.read_bool()?;
                let password_bytes = r.read_string()?;
                // §9: accept non-UTF-8 password bytes rather than rejecting them.
                let password = String::from_utf8(password_bytes.to_vec())
                    .unwrap_or_else(|_| String::from_utf8_lossy(password_bytes).into_owned());
                if change_req {
                    let _new_password = r.read_string()?;
                    AuthResult::Failed
                } else {
                    policy
                        .as_ref()
                        .map(|p| p.check_auth_password(&username, &password))
                        .unwrap_or(AuthResult::Failed)
                }
            }
            Some(Method::PublicKey) => {
                self.state.lock().unwrap().auth_method = Some(Method::PublicKey);
                let sig_attached = r.read_bool()?;
                let alg_name = r.read_utf8()?;
                let pubkey_blob = r.read_string()?.to_vec();

                let parser = transport.key_info(&alg_name).ok_or_else(|| {
                    self.disconnect(
                        &transport,
                        DisconnectReason::NoMoreAuthMethodsAvailable,
                        "unknown public key algorithm",
                    )
                })?;
                let public_key = parser(&pubkey_blob)?;

                let check = policy
                    .as_ref()
                    .map(|p| p.check_auth_publickey(&username, public_key.as_ref()))
                    .unwrap_or(AuthResult::Failed);

                if check == AuthResult::Failed {
                    AuthResult::Failed
                } else if !sig_attached {
                    let mut packet = CryptoVec::new();
                    packet.push(msg::USERAUTH_PK_OK);
                    packet.extend_ssh_string(alg_name.as_bytes());
                    packet.extend_ssh_string(&pubkey_blob);
                    transport.send(&packet);
                    debug!("publickey probe for {:?} accepted, awaiting signature", username);
                    return Ok(());
                } else {
                    let signature = r.read_string()?;
                    let session_id = transport.session_id();
                    let blob = signature_blob(&session_id, &username, &alg_name, &pubkey_blob);
                    if public_key.verify(&blob, signature) {
                        check
                    } else {
                        warn!("publickey signature verification failed for {:?}", username);
                        AuthResult::Failed
                    }
                }
            }
            Some(Method::KeyboardInteractive) => {
                self.state.lock().unwrap().auth_method = Some(Method::KeyboardInteractive);
                let _lang = r.read_string()?;
                let submethods = r.read_utf8()?;
                let outcome = policy
                    .as_ref()
                    .map(|p| p.check_auth_interactive(&username, &submethods))
                    .unwrap_or_else(|| AuthResult::Failed.into());
                match outcome {
                    InteractiveOutcome::Query(query) => {
                        self.send_interactive_query(&transport, &query)?;
                        return Ok(());
                    }
                    InteractiveOutcome::Result(result) => result,
                }
            }
            None => {
                debug!("unknown auth method {:?}, routing to check_auth_none", method_name);
                policy
                    .as_ref()
                    .map(|p| p.check_auth_none(&username))
                    .unwrap_or(AuthResult::Failed)
            }
        };

        self.send_auth_result(&transport, &username, result)
    }

    /// Transition 3: `USERAUTH_INFO_RESPONSE`, server-only.
    fn server_userauth_info_response(&self, payload: &[u8]) -> Result<(), Error> {
        let transport = self.transport()?;
        {
            let state = self.state.lock().unwrap();
            if state.authenticated {
                debug!("ignoring USERAUTH_INFO_RESPONSE after authentication already granted");
                return Ok(());
            }
            if state.auth_method != Some(Method::KeyboardInteractive) {
                return Err(Error::ProtocolViolation(
                    "INFO_RESPONSE received outside of keyboard-interactive",
                ));
            }
        }

        let mut r = Reader::new(payload);
        let n = r.read_u32()?;
        // n is attacker-controlled; don't let it drive an upfront allocation
        // before the bytes backing it are validated.
        let mut responses = Vec::with_capacity(n.min(r.remaining().len() as u32) as usize);
        for _ in 0..n {
            responses.push(r.read_utf8()?);
        }

        let policy = transport.server_policy();
        let outcome = policy
            .as_ref()
            .map(|p| p.check_auth_interactive_response(&responses))
            .unwrap_or_else(|| AuthResult::Failed.into());

        match outcome {
            InteractiveOutcome::Query(query) => self.send_interactive_query(&transport, &query),
            InteractiveOutcome::Result(result) => {
                let username = self
                    .state
                    .lock()
                    .unwrap()
                    .auth_username
                    .clone()
                    .ok_or(Error::ProtocolViolation("INFO_RESPONSE with no bound username"))?;
                self.send_auth_result(&transport, &username, result)
            }
        }
    }

    fn send_interactive_query(
        &self,
        transport: &Arc<dyn Transport>,
        query: &crate::policy::InteractiveQuery,
    ) -> Result<(), Error> {
        let mut packet = CryptoVec::new();
        packet.push(msg::USERAUTH_INFO_REQUEST);
        packet.extend_ssh_string(query.name.as_bytes());
        packet.extend_ssh_string(query.instructions.as_bytes());
        packet.extend_ssh_string(b""); // lang, deprecated
        packet.push_u32_be(query.prompts.len() as u32);
        for (text, echo) in &query.prompts {
            packet.extend_ssh_string(text.as_bytes());
            packet.push_bool(*echo);
        }
        transport.send(&packet);
        Ok(())
    }

    /// §4.4 "Server result emission".
    fn send_auth_result(
        &self,
        transport: &Arc<dyn Transport>,
        username: &str,
        result: AuthResult,
    ) -> Result<(), Error> {
        if result == AuthResult::Successful {
            let mut packet = CryptoVec::new();
            packet.push(msg::USERAUTH_SUCCESS);
            transport.send(&packet);
            self.state.lock().unwrap().authenticated = true;
            transport.auth_trigger();
            info!("user {:?} authenticated", username);
            return Ok(());
        }

        let partial = result == AuthResult::PartiallySuccessful;
        let allowed = transport
            .server_policy()
            .map(|p| p.get_allowed_auths(username).names())
            .unwrap_or_default();
        let allowed: Vec<String> = allowed.into_iter().map(str::to_string).collect();

        let mut packet = CryptoVec::new();
        packet.push(msg::USERAUTH_FAILURE);
        packet.extend_name_list(allowed.iter().map(String::as_str));
        packet.push_bool(partial);
        transport.send(&packet);

        if !partial {
            let attempts = {
                let mut state = self.state.lock().unwrap();
                state.auth_fail_count += 1;
                state.auth_fail_count
            };
            if attempts >= self.config().max_auth_attempts {
                return Err(self.disconnect(
                    transport,
                    DisconnectReason::NoMoreAuthMethodsAvailable,
                    "too many authentication failures",
                ));
            }
        }
        Ok(())
    }
}
