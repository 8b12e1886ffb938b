// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::hash::Hasher;

use byteorder::ByteOrder;
use byteorder::LE;

/// Initial `v0`, i.e. `k0 ^ 0x736f6d6570736575` for the fixed key `k0 = 0xdeadbeaf`.
const INIT_V0: u64 = 8317987320269560794;
/// Initial `v1`, i.e. `k1 ^ 0x646f72616e646f6d` for the fixed key `k1 = 0xfaebdaed`.
const INIT_V1: u64 = 7237128889637516672;
/// Initial `v2`, i.e. `k0 ^ 0x6c7967656e657261`.
const INIT_V2: u64 = 7816392314733513934;
/// Initial `v3`, i.e. `k1 ^ 0x7465646279746573`.
const INIT_V3: u64 = 8387220255325274014;

const FINALIZATION: u64 = 0xff;
const COMPRESSION_ROUNDS: usize = 2;
const FINALIZATION_ROUNDS: usize = 4;

/// SipHash-2-4 keyed with the fixed key every filter in this crate is built on.
///
/// The key is not configurable: two filters agree on probe positions only if they hash with the
/// same key, and stored filters have been populated with this one.
///
/// Input may be fed over several [`write`](Hasher::write) calls; the digest only depends on the
/// concatenated bytes.
#[derive(Debug, Clone)]
pub struct SipHasher24 {
    v0: u64,
    v1: u64,
    v2: u64,
    v3: u64,
    total: u64,
    tail: [u8; 8],
    tail_len: usize,
}

impl SipHasher24 {
    /// Creates a hasher in the fixed initial state.
    pub fn new() -> Self {
        SipHasher24 {
            v0: INIT_V0,
            v1: INIT_V1,
            v2: INIT_V2,
            v3: INIT_V3,
            total: 0,
            tail: [0; 8],
            tail_len: 0,
        }
    }

    #[inline]
    fn absorb(&mut self, m: u64) {
        self.v3 ^= m;
        for _ in 0..COMPRESSION_ROUNDS {
            self.round();
        }
        self.v0 ^= m;
        self.total += 8;
    }

    #[inline]
    fn round(&mut self) {
        self.v0 = self.v0.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(13);
        self.v1 ^= self.v0;
        self.v0 = self.v0.rotate_left(32);
        self.v2 = self.v2.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(16);
        self.v3 ^= self.v2;
        self.v0 = self.v0.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(21);
        self.v3 ^= self.v0;
        self.v2 = self.v2.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(17);
        self.v1 ^= self.v2;
        self.v2 = self.v2.rotate_left(32);
    }
}

impl Default for SipHasher24 {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for SipHasher24 {
    fn finish(&self) -> u64 {
        let mut state = self.clone();

        // tail: remaining bytes little endian, message length in the top byte
        let len = self.total + self.tail_len as u64;
        let mut buf = [0u8; 8];
        buf[..self.tail_len].copy_from_slice(&self.tail[..self.tail_len]);
        let t = LE::read_u64(&buf) | (len << 56);

        state.v3 ^= t;
        for _ in 0..COMPRESSION_ROUNDS {
            state.round();
        }
        state.v0 ^= t;

        state.v2 ^= FINALIZATION;
        for _ in 0..FINALIZATION_ROUNDS {
            state.round();
        }

        state.v0 ^ state.v1 ^ state.v2 ^ state.v3
    }

    fn write(&mut self, mut bytes: &[u8]) {
        if self.tail_len + bytes.len() < 8 {
            self.tail[self.tail_len..self.tail_len + bytes.len()].copy_from_slice(bytes);
            self.tail_len += bytes.len();
            return;
        }

        if self.tail_len != 0 {
            let wanted = 8 - self.tail_len;
            self.tail[self.tail_len..].copy_from_slice(&bytes[..wanted]);
            let m = LE::read_u64(&self.tail);
            self.absorb(m);
            bytes = &bytes[wanted..];
            self.tail_len = 0;
        }

        let mut blocks = bytes.chunks_exact(8);
        for block in &mut blocks {
            self.absorb(LE::read_u64(block));
        }

        let rem = blocks.remainder();
        self.tail[..rem.len()].copy_from_slice(rem);
        self.tail_len = rem.len();
    }
}

/// Hashes `bytes` in one pass with [`SipHasher24`].
pub fn sip_hash_24(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher24::new();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const K0: u64 = 0xdeadbeaf;
    const K1: u64 = 0xfaebdaed;

    #[test]
    fn test_initial_state_matches_key() {
        assert_eq!(INIT_V0, K0 ^ 0x736f6d6570736575);
        assert_eq!(INIT_V1, K1 ^ 0x646f72616e646f6d);
        assert_eq!(INIT_V2, K0 ^ 0x6c7967656e657261);
        assert_eq!(INIT_V3, K1 ^ 0x7465646279746573);
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(sip_hash_24(b""), 0x7d9e47f57dc578b5);
        assert_eq!(sip_hash_24(b"fish"), 0x778ec0f41608f216);
        assert_eq!(sip_hash_24(b"Fish"), 0x1ef620005d701ced);
        assert_eq!(sip_hash_24(b"foo"), 0x61cd0cd36aaf787f);
        // 11 bytes: one block and a 3 byte tail
        assert_eq!(sip_hash_24(b"hello world"), 0x362f72a7941d133a);
        let key = "The quick brown fox jumps over the lazy dog";
        assert_eq!(sip_hash_24(key.as_bytes()), 0xee86075dca557313);
    }

    #[test]
    #[allow(deprecated)]
    fn test_agrees_with_std_siphash() {
        let inputs: [&[u8]; 6] = [
            b"",
            b"a",
            b"1234567",
            b"12345678",
            b"123456789",
            b"The quick brown fox jumps over the lazy dog",
        ];
        for input in inputs {
            let mut reference = std::hash::SipHasher::new_with_keys(K0, K1);
            reference.write(input);
            assert_eq!(sip_hash_24(input), reference.finish(), "input {input:?}");
        }
    }

    #[test]
    fn test_split_writes() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let expected = sip_hash_24(data);
        for split in [1, 3, 7, 8, 9, 16, 40] {
            let mut hasher = SipHasher24::new();
            hasher.write(&data[..split]);
            hasher.write(&data[split..]);
            assert_eq!(hasher.finish(), expected, "split at {split}");
        }

        let mut hasher = SipHasher24::new();
        for b in data {
            hasher.write(std::slice::from_ref(b));
        }
        assert_eq!(hasher.finish(), expected);
    }

    #[test]
    fn test_finish_does_not_consume() {
        let mut hasher = SipHasher24::new();
        hasher.write(b"fish");
        assert_eq!(hasher.finish(), hasher.finish());
    }
}
