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

//! The pluggable policy a server plugs into the auth core: everything it
//! needs to decide whether a user should be let in.

use crate::auth::MethodSet;
use crate::key::PublicKey;

/// The outcome of a single authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// Grant access.
    Successful,
    /// This step succeeded, but at least one more method is required.
    PartiallySuccessful,
    /// Reject.
    Failed,
}

/// A challenge-response round for `keyboard-interactive` authentication.
#[derive(Debug, Clone)]
pub struct InteractiveQuery {
    pub name: String,
    pub instructions: String,
    /// `(prompt text, echo characters back to the user)`.
    pub prompts: Vec<(String, bool)>,
}

impl InteractiveQuery {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        prompts: Vec<(String, bool)>,
    ) -> Self {
        InteractiveQuery {
            name: name.into(),
            instructions: instructions.into(),
            prompts,
        }
    }
}

/// What `check_auth_interactive`/`check_auth_interactive_response` can
/// return: either a verdict, or a further challenge to pose to the client.
#[derive(Debug, Clone)]
pub enum InteractiveOutcome {
    Result(AuthResult),
    Query(InteractiveQuery),
}

impl From<AuthResult> for InteractiveOutcome {
    fn from(result: AuthResult) -> Self {
        InteractiveOutcome::Result(result)
    }
}

/// Server-side authentication policy. Each accepted connection is handed
/// one of these; the auth core calls into it on the reader thread, so a
/// slow or blocking implementation stalls that connection's reader (§5).
///
/// Every method defaults to a flat rejection, mirroring how the wider
/// transport's own connection-layer handler trait defaults every optional
/// callback: implementors only override what they actually support.
pub trait ServerPolicy: Send + Sync {
    /// The methods currently worth advertising to `username`, used to
    /// build the allowed-methods list on `USERAUTH_FAILURE`.
    fn get_allowed_auths(&self, username: &str) -> MethodSet {
        let _ = username;
        MethodSet::all()
    }

    #[allow(unused_variables)]
    fn check_auth_none(&self, username: &str) -> AuthResult {
        AuthResult::Failed
    }

    #[allow(unused_variables)]
    fn check_auth_password(&self, username: &str, password: &str) -> AuthResult {
        AuthResult::Failed
    }

    #[allow(unused_variables)]
    fn check_auth_publickey(&self, username: &str, key: &dyn PublicKey) -> AuthResult {
        AuthResult::Failed
    }

    #[allow(unused_variables)]
    fn check_auth_interactive(&self, username: &str, submethods: &str) -> InteractiveOutcome {
        InteractiveOutcome::Result(AuthResult::Failed)
    }

    #[allow(unused_variables)]
    fn check_auth_interactive_response(&self, responses: &[String]) -> InteractiveOutcome {
        InteractiveOutcome::Result(AuthResult::Failed)
    }
}
