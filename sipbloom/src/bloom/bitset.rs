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

/// Bit position within a byte, least significant bit first.
const BIT_MASKS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// Fixed-size, byte-addressed bit array.
///
/// Bit `index` lives in byte `index >> 3` at position `index % 8`. Callers mask indices into
/// range; an index past the end panics on the slice access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PackedBitset {
    bytes: Box<[u8]>,
}

impl PackedBitset {
    /// Allocates a zeroed bitset of `num_bits` bits; `num_bits` is a multiple of 64.
    ///
    /// Returns `None` if the bytes cannot be addressed or allocated.
    pub(super) fn try_with_num_bits(num_bits: u64) -> Option<Self> {
        debug_assert_eq!(num_bits % 64, 0);
        let num_bytes = usize::try_from(num_bits >> 3).ok()?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(num_bytes).ok()?;
        bytes.resize(num_bytes, 0);
        Some(PackedBitset {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Wraps bytes previously obtained from [`as_bytes`](Self::as_bytes).
    pub(super) fn from_bytes(bytes: Vec<u8>) -> Self {
        PackedBitset {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Sets the bit at `index`, returning `true` if it was previously unset.
    #[inline]
    pub(super) fn set(&mut self, index: u64) -> bool {
        let byte = &mut self.bytes[(index >> 3) as usize];
        let mask = BIT_MASKS[(index % 8) as usize];
        let was_unset = *byte & mask == 0;
        *byte |= mask;
        was_unset
    }

    #[inline]
    pub(super) fn is_set(&self, index: u64) -> bool {
        (self.bytes[(index >> 3) as usize] >> (index % 8)) & 1 == 1
    }

    pub(super) fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub(super) fn count_ones(&self) -> u64 {
        self.bytes.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    pub(super) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// ORs `other` into `self`; both must have the same length.
    pub(super) fn union_with(&mut self, other: &PackedBitset) {
        for (byte, other_byte) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *byte |= *other_byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PackedBitset;

    #[test]
    fn test_set_and_is_set() {
        let mut bits = PackedBitset::try_with_num_bits(512).unwrap();
        assert!(!bits.is_set(0));
        assert!(bits.set(0));
        assert!(bits.is_set(0));
        assert!(!bits.set(0)); // already set

        assert!(bits.set(511));
        assert!(bits.is_set(511));
        assert!(!bits.is_set(510));
        assert_eq!(bits.count_ones(), 2);
    }

    #[test]
    fn test_lsb_first_byte_layout() {
        let mut bits = PackedBitset::try_with_num_bits(512).unwrap();
        bits.set(0);
        bits.set(9);
        bits.set(15);
        bits.set(17);
        let bytes = bits.as_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[0], 0b0000_0001);
        assert_eq!(bytes[1], 0b1000_0010);
        assert_eq!(bytes[2], 0b0000_0010);
        assert!(bytes[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear() {
        let mut bits = PackedBitset::try_with_num_bits(1024).unwrap();
        for i in (0..1024).step_by(3) {
            bits.set(i);
        }
        assert_eq!(bits.count_ones(), 342);
        bits.clear();
        assert_eq!(bits.count_ones(), 0);
        assert_eq!(bits, PackedBitset::try_with_num_bits(1024).unwrap());
    }

    #[test]
    fn test_union_with() {
        let mut left = PackedBitset::try_with_num_bits(512).unwrap();
        let mut right = PackedBitset::try_with_num_bits(512).unwrap();
        left.set(1);
        right.set(1);
        right.set(300);
        left.union_with(&right);
        assert!(left.is_set(1));
        assert!(left.is_set(300));
        assert_eq!(left.count_ones(), 2);
    }

    #[test]
    fn test_unobtainable_size_is_refused() {
        assert!(PackedBitset::try_with_num_bits(1 << 63).is_none());
        assert_eq!(PackedBitset::try_with_num_bits(0).unwrap().as_bytes().len(), 0);
    }
}
