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

//! The blocking client-side facade (C6): turns the auth core's event-based
//! completion signal into an ordinary synchronous call for an application
//! thread to make.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthHandler, InteractiveHandler};
use crate::error::Error;
use crate::key::PrivateKey;
use crate::transport::{AuthEvent, Transport};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A client-mode [`AuthHandler`] plus the transport it rides on, wrapped in
/// the four synchronous entry points an application calls to authenticate.
pub struct AuthClient {
    handler: Arc<AuthHandler>,
    transport: Arc<dyn Transport>,
}

impl AuthClient {
    pub fn new(handler: Arc<AuthHandler>, transport: Arc<dyn Transport>) -> Self {
        AuthClient { handler, transport }
    }

    pub fn auth_none(&self, username: &str) -> Result<Vec<String>, Error> {
        let event = self.handler.arm_none(username)?;
        self.wait_for_response(&event)
    }

    pub fn auth_password(&self, username: &str, password: &str) -> Result<Vec<String>, Error> {
        let event = self.handler.arm_password(username, password)?;
        self.wait_for_response(&event)
    }

    pub fn auth_publickey(
        &self,
        username: &str,
        key: Arc<dyn PrivateKey>,
    ) -> Result<Vec<String>, Error> {
        let event = self.handler.arm_publickey(username, key)?;
        self.wait_for_response(&event)
    }

    pub fn auth_interactive(
        &self,
        username: &str,
        submethods: &str,
        handler: InteractiveHandler,
    ) -> Result<Vec<String>, Error> {
        let event = self.handler.arm_interactive(username, submethods, handler)?;
        self.wait_for_response(&event)
    }

    /// Block until `event` fires, polling in short slices (§4.5, §9) so a
    /// dead transport that never sends a terminal message is still noticed.
    fn wait_for_response(&self, event: &Arc<AuthEvent>) -> Result<Vec<String>, Error> {
        loop {
            if event.wait_timeout(POLL_INTERVAL) {
                break;
            }
            if !self.transport.is_active() {
                return Err(self
                    .transport
                    .pending_error()
                    .unwrap_or(Error::AuthenticationFailed));
            }
        }

        if self.handler.is_authenticated() {
            return Ok(Vec::new());
        }

        match self.transport.pending_error() {
            Some(Error::PartialAuthentication(allowed)) => Ok(allowed),
            Some(err) => Err(err),
            None => Err(Error::AuthenticationFailed),
        }
    }

    /// Wake a caller blocked in `wait_for_response` without sending
    /// anything on the wire.
    pub fn abort(&self) {
        self.handler.abort();
    }
}
