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

//! Client-side transitions of the auth state machine (§4.4, client states),
//! mirroring how the wider transport splits the encrypted-state dispatch
//! for each role into its own file.

use std::sync::Arc;

use cryptovec::CryptoVec;
use log::{debug, info};

use crate::codec::{Encode, Reader};
use crate::error::Error;
use crate::key::PrivateKey;
use crate::msg;
use crate::transport::AuthEvent;

use super::{signature_blob, AuthHandler, InteractiveHandler, Method};

impl AuthHandler {
    /// Arm a `none` attempt and send `SERVICE_REQUEST`. Does not wait;
    /// pass the returned event to `wait_for_response`.
    pub fn arm_none(&self, username: &str) -> Result<Arc<AuthEvent>, Error> {
        let event = AuthEvent::new();
        {
            let mut state = self.state.lock().unwrap();
            state.auth_event = Some(event.clone());
            state.auth_method = Some(Method::None);
            state.username = Some(username.to_string());
        }
        self.request_auth()?;
        Ok(event)
    }

    pub fn arm_password(&self, username: &str, password: &str) -> Result<Arc<AuthEvent>, Error> {
        let event = AuthEvent::new();
        {
            let mut state = self.state.lock().unwrap();
            state.auth_event = Some(event.clone());
            state.auth_method = Some(Method::Password);
            state.username = Some(username.to_string());
            state.password = Some(password.to_string());
        }
        self.request_auth()?;
        Ok(event)
    }

    pub fn arm_publickey(
        &self,
        username: &str,
        key: Arc<dyn PrivateKey>,
    ) -> Result<Arc<AuthEvent>, Error> {
        let event = AuthEvent::new();
        {
            let mut state = self.state.lock().unwrap();
            state.auth_event = Some(event.clone());
            state.auth_method = Some(Method::PublicKey);
            state.username = Some(username.to_string());
            state.private_key = Some(key);
        }
        self.request_auth()?;
        Ok(event)
    }

    pub fn arm_interactive(
        &self,
        username: &str,
        submethods: &str,
        handler: InteractiveHandler,
    ) -> Result<Arc<AuthEvent>, Error> {
        let event = AuthEvent::new();
        {
            let mut state = self.state.lock().unwrap();
            state.auth_event = Some(event.clone());
            state.auth_method = Some(Method::KeyboardInteractive);
            state.username = Some(username.to_string());
            state.interactive_handler = Some(handler);
            state.submethods = submethods.to_string();
        }
        self.request_auth()?;
        Ok(event)
    }

    /// Transition 1 (§4.4): `SSH_MSG_SERVICE_REQUEST("ssh-userauth")`.
    fn request_auth(&self) -> Result<(), Error> {
        let transport = self.transport()?;
        let mut packet = CryptoVec::new();
        packet.push(msg::SERVICE_REQUEST);
        packet.extend_ssh_string(b"ssh-userauth");
        transport.send(&packet);
        Ok(())
    }

    pub(super) fn client_dispatch(&self, code: u8, payload: &[u8]) -> Result<(), Error> {
        match code {
            msg::SERVICE_ACCEPT => self.client_service_accept(payload),
            msg::USERAUTH_SUCCESS => self.client_userauth_success(),
            msg::USERAUTH_FAILURE => self.client_userauth_failure(payload),
            msg::USERAUTH_BANNER => self.client_userauth_banner(payload),
            msg::USERAUTH_INFO_REQUEST => self.client_userauth_info_request(payload),
            _ => Err(Error::ProtocolViolation(
                "unexpected message code for a client-mode auth handler",
            )),
        }
    }

    /// Transition 2: build and send the method-specific `USERAUTH_REQUEST`.
    fn client_service_accept(&self, payload: &[u8]) -> Result<(), Error> {
        let mut r = Reader::new(payload);
        let service = r.read_string()?;
        if service != b"ssh-userauth" {
            debug!(
                "service request for {:?} accepted (?)",
                String::from_utf8_lossy(service)
            );
            return Ok(());
        }
        debug!("userauth is OK");

        let transport = self.transport()?;
        let state = self.state.lock().unwrap();
        let username = state
            .username
            .clone()
            .ok_or(Error::ProtocolViolation("SERVICE_ACCEPT with no armed attempt"))?;
        let method = state
            .auth_method
            .ok_or(Error::ProtocolViolation("SERVICE_ACCEPT with no armed attempt"))?;

        let mut packet = CryptoVec::new();
        packet.push(msg::USERAUTH_REQUEST);
        packet.extend_ssh_string(username.as_bytes());
        packet.extend_ssh_string(b"ssh-connection");
        packet.extend_ssh_string(method.as_str().as_bytes());

        match method {
            Method::None => {}
            Method::Password => {
                let password = state.password.clone().unwrap_or_default();
                packet.push_bool(false);
                packet.extend_ssh_string(password.as_bytes());
            }
            Method::PublicKey => {
                let key = state.private_key.clone().ok_or(Error::ProtocolViolation(
                    "publickey attempt armed with no key",
                ))?;
                let public = key.public_key();
                packet.push_bool(true);
                packet.extend_ssh_string(public.algorithm().as_bytes());
                packet.extend_ssh_string(&public.public_blob());

                let session_id = transport.session_id();
                let blob = signature_blob(
                    &session_id,
                    &username,
                    public.algorithm(),
                    &public.public_blob(),
                );
                let signature = key.sign(&blob)?;
                packet.extend_ssh_string(&signature);
            }
            Method::KeyboardInteractive => {
                packet.extend_ssh_string(b""); // lang, deprecated
                packet.extend_ssh_string(state.submethods.as_bytes());
            }
        }
        drop(state);
        transport.send(&packet);
        Ok(())
    }

    /// Transition 3: grant, fire the auth trigger, wake the caller.
    fn client_userauth_success(&self) -> Result<(), Error> {
        let transport = self.transport()?;
        let mut state = self.state.lock().unwrap();
        info!("authentication ({:?}) successful", state.auth_method);
        state.authenticated = true;
        let event = state.auth_event.clone();
        drop(state);
        transport.auth_trigger();
        if let Some(event) = event {
            event.set();
        }
        Ok(())
    }

    /// Transition 4: reject, classifying the rejection per §4.4/§7.
    fn client_userauth_failure(&self, payload: &[u8]) -> Result<(), Error> {
        let mut r = Reader::new(payload);
        let allowed = r.read_name_list()?;
        let partial = r.read_bool()?;

        let transport = self.transport()?;
        let mut state = self.state.lock().unwrap();
        let attempted = state.auth_method.map(|m| m.as_str());
        if partial {
            info!("authentication continues, allowed: {:?}", allowed);
            transport.set_saved_exception(Error::PartialAuthentication(allowed));
        } else if !attempted
            .map(|m| allowed.iter().any(|a| a.as_str() == m))
            .unwrap_or(false)
        {
            debug!("authentication type not permitted, allowed: {:?}", allowed);
            transport.set_saved_exception(Error::BadAuthenticationType(allowed));
        } else {
            info!("authentication ({:?}) failed", attempted);
        }
        state.authenticated = false;
        state.username = None;
        let event = state.auth_event.clone();
        drop(state);
        if let Some(event) = event {
            event.set();
        }
        Ok(())
    }

    /// Transition 5: banners never change state.
    fn client_userauth_banner(&self, payload: &[u8]) -> Result<(), Error> {
        let mut r = Reader::new(payload);
        let banner = r.read_string()?;
        let _lang = r.read_string()?;
        info!("auth banner: {}", String::from_utf8_lossy(banner));
        Ok(())
    }

    /// Transition 6: keyboard-interactive challenge/response round-trip.
    fn client_userauth_info_request(&self, payload: &[u8]) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.auth_method != Some(Method::KeyboardInteractive) {
            return Err(Error::ProtocolViolation(
                "INFO_REQUEST received outside of keyboard-interactive",
            ));
        }

        let mut r = Reader::new(payload);
        let _title = r.read_utf8()?;
        let _instructions = r.read_utf8()?;
        let _lang = r.read_string()?;
        let num_prompts = r.read_u32()?;
        // num_prompts is attacker-controlled; don't let it drive an upfront
        // allocation before the bytes backing it are validated.
        let mut prompts = Vec::with_capacity(num_prompts.min(r.remaining().len() as u32) as usize);
        for _ in 0..num_prompts {
            let text = r.read_utf8()?;
            let echo = r.read_bool()?;
            prompts.push((text, echo));
        }

        let responses = {
            let handler = state.interactive_handler.as_mut().ok_or(
                Error::ProtocolViolation("keyboard-interactive armed with no handler"),
            )?;
            handler(&_title, &_instructions, &prompts)
        };
        drop(state);

        let transport = self.transport()?;
        let mut packet = CryptoVec::new();
        packet.push(msg::USERAUTH_INFO_RESPONSE);
        packet.push_u32_be(responses.len() as u32);
        for response in &responses {
            packet.extend_ssh_string(response.as_bytes());
        }
        transport.send(&packet);
        Ok(())
    }
}
