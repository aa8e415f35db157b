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

//! Server-side configuration knobs, trimmed from the wider transport's own
//! `server::Config` down to the fields this layer's scope actually uses.

use crate::auth::MethodSet;

/// Configuration for a server-mode [`crate::auth::AuthHandler`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Text sent as `USERAUTH_BANNER` right after `SERVICE_ACCEPT`. `None`
    /// means no banner is sent.
    pub auth_banner: Option<String>,

    /// Non-partial failures tolerated before the server disconnects with
    /// `NO_MORE_AUTH_METHODS_AVAILABLE`.
    pub max_auth_attempts: u32,

    /// Methods advertised by the default `get_allowed_auths`, for
    /// applications that want to derive their policy's advertised set from
    /// the same configuration rather than hard-coding it.
    pub methods: MethodSet,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auth_banner: None,
            max_auth_attempts: 10,
            methods: MethodSet::all(),
        }
    }
}
