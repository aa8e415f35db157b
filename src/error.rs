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

use crate::msg::DisconnectReason;

/// Everything that can go wrong in the userauth layer, client or server side.
///
/// Callers match on this single type rather than on a tree of per-module
/// errors, in keeping with how the rest of the transport reports faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A length-prefixed field claimed more bytes than remained in the packet.
    #[error("malformed packet")]
    MalformedPacket,

    /// A message arrived in a state where it is illegal, e.g. an
    /// `INFO_REQUEST` while the in-flight method isn't `keyboard-interactive`.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The method just attempted isn't in the server's allowed set.
    #[error("bad authentication type, allowed methods: {0:?}")]
    BadAuthenticationType(Vec<String>),

    /// The attempt succeeded but the server wants more methods.
    #[error("partial authentication, allowed methods: {0:?}")]
    PartialAuthentication(Vec<String>),

    /// Generic rejection of the attempted method.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The transport closed before any terminal message arrived.
    #[error("transport is no longer active")]
    TransportDead,

    /// The core wants the transport to send `SSH_MSG_DISCONNECT` and close.
    #[error("disconnecting ({reason:?}): {description}")]
    Disconnect {
        reason: DisconnectReason,
        description: &'static str,
    },
}

impl Error {
    /// The list of still-allowed methods, if this variant carries one.
    pub fn allowed_types(&self) -> Option<&[String]> {
        match self {
            Error::BadAuthenticationType(v) | Error::PartialAuthentication(v) => Some(v),
            _ => None,
        }
    }
}
