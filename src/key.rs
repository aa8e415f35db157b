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

//! The key capability this layer needs from the (out-of-scope) crypto
//! layer: enough to name a key, hand its public blob to the wire, and
//! sign or verify the canonical publickey signature blob. Parsing,
//! storage and the actual RSA/DSA/ECDSA/Ed25519 math live elsewhere.

use std::sync::Arc;

use crate::error::Error;

/// A public key, as presented on the wire during `publickey` authentication.
pub trait PublicKey: Send + Sync {
    /// The wire algorithm name, e.g. `"ssh-ed25519"`.
    fn algorithm(&self) -> &str;

    /// The public key blob, in the encoding the algorithm defines.
    fn public_blob(&self) -> Vec<u8>;

    /// Verify `signature` over `session_blob` (the canonical blob built by
    /// [`crate::auth::signature_blob`]).
    fn verify(&self, session_blob: &[u8], signature: &[u8]) -> bool;
}

/// A private key capable of producing signatures for `publickey` auth.
pub trait PrivateKey: Send + Sync {
    /// The public half of this key, as it goes on the wire.
    fn public_key(&self) -> Arc<dyn PublicKey>;

    /// Sign the canonical blob built by [`crate::auth::signature_blob`].
    fn sign(&self, session_blob: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Server-side: given the raw public key blob from a `USERAUTH_REQUEST`,
/// parse it into a capability. Registered in the transport, keyed by the
/// wire algorithm name that accompanies the blob.
pub type KeyParser = Arc<dyn Fn(&[u8]) -> Result<Arc<dyn PublicKey>, Error> + Send + Sync>;
