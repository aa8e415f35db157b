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

//! SSH wire primitives (RFC 4251 §5): `byte`, `boolean`, `uint32`, `string`,
//! `name-list` and `mpint`. Self-contained rather than pulled from the
//! wider transport's key/crypto crate, since that crate is out of scope here.

use byteorder::{BigEndian, ByteOrder};
use cryptovec::CryptoVec;

use crate::error::Error;

/// Encoder side: push wire primitives onto an outgoing packet buffer.
pub trait Encode {
    fn push_bool(&mut self, value: bool);
    fn push_u32_be(&mut self, value: u32);
    fn extend_ssh_string(&mut self, bytes: &[u8]);
    fn extend_name_list<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I);
    fn extend_mpint(&mut self, magnitude: &[u8]);
}

impl Encode for CryptoVec {
    fn push_bool(&mut self, value: bool) {
        self.push(if value { 1 } else { 0 });
    }

    fn push_u32_be(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.extend(&buf);
    }

    fn extend_ssh_string(&mut self, bytes: &[u8]) {
        self.push_u32_be(bytes.len() as u32);
        self.extend(bytes);
    }

    fn extend_name_list<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) {
        let joined = names.into_iter().collect::<Vec<_>>().join(",");
        self.extend_ssh_string(joined.as_bytes());
    }

    fn extend_mpint(&mut self, magnitude: &[u8]) {
        let mut start = 0;
        while start < magnitude.len() && magnitude[start] == 0 {
            start += 1;
        }
        let trimmed = &magnitude[start..];
        if trimmed.is_empty() {
            self.push_u32_be(0);
        } else if trimmed[0] & 0x80 != 0 {
            self.push_u32_be(trimmed.len() as u32 + 1);
            self.push(0);
            self.extend(trimmed);
        } else {
            self.push_u32_be(trimmed.len() as u32);
            self.extend(trimmed);
        }
    }
}

/// Decoder side: a cursor over a received, already-decrypted packet payload.
///
/// Every read is bounds-checked; a length prefix that would run past the
/// end of the buffer yields `Error::MalformedPacket` instead of panicking.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn read_byte(&mut self) -> Result<u8, Error> {
        let b = *self.buf.get(self.pos).ok_or(Error::MalformedPacket)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let end = self.pos.checked_add(4).ok_or(Error::MalformedPacket)?;
        let bytes = self.buf.get(self.pos..end).ok_or(Error::MalformedPacket)?;
        self.pos = end;
        Ok(BigEndian::read_u32(bytes))
    }

    /// Raw `string`: length-prefixed bytes, UTF-8 decoding left to the caller.
    pub fn read_string(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u32()? as usize;
        let end = self.pos.checked_add(len).ok_or(Error::MalformedPacket)?;
        let bytes = self.buf.get(self.pos..end).ok_or(Error::MalformedPacket)?;
        self.pos = end;
        Ok(bytes)
    }

    /// `string` that must be valid UTF-8 (usernames, method names, ...).
    pub fn read_utf8(&mut self) -> Result<String, Error> {
        let bytes = self.read_string()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedPacket)
    }

    pub fn read_name_list(&mut self) -> Result<Vec<String>, Error> {
        let bytes = self.read_string()?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let text = std::str::from_utf8(bytes).map_err(|_| Error::MalformedPacket)?;
        Ok(text.split(',').map(|s| s.to_string()).collect())
    }

    /// `mpint`: two's-complement magnitude, handed back raw. Sign handling
    /// and bignum arithmetic belong to the (out-of-scope) key/crypto layer.
    pub fn read_mpint(&mut self) -> Result<&'a [u8], Error> {
        self.read_string()
    }
}
