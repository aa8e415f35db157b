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

//! The user authentication layer of an SSH-2 transport (RFC 4252, plus the
//! `keyboard-interactive` extension of RFC 4256): client and server state
//! machines that drive a session from "transport ready" to "user
//! authenticated, ready for ssh-connection service".
//!
//! This crate does not speak to a network socket, parse `known_hosts`, or
//! implement any cryptography. It consumes a narrow [`transport::Transport`]
//! binding supplied by the surrounding transport implementation, and an
//! opaque [`key::PublicKey`]/[`key::PrivateKey`] capability supplied by the
//! surrounding crypto implementation.
//!
//! The state machine itself lives in [`auth::AuthHandler`]; [`client::AuthClient`]
//! wraps it in a blocking facade for a client application, and
//! [`policy::ServerPolicy`] is the callback surface a server implements.

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod msg;
pub mod policy;
pub mod transport;

pub use auth::{AuthHandler, InteractiveHandler, Method, MethodSet};
pub use client::AuthClient;
pub use config::Config;
pub use error::Error;
pub use key::{KeyParser, PrivateKey, PublicKey};
pub use msg::DisconnectReason;
pub use policy::{AuthResult, InteractiveOutcome, InteractiveQuery, ServerPolicy};
pub use transport::{AuthEvent, Mode, Transport};
