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

use super::bitset::PackedBitset;
use super::builder::MAX_NUM_BITS;
use super::builder::MAX_NUM_PROBES;
use super::builder::MIN_NUM_BITS;
use super::builder::MIN_NUM_PROBES;
use super::BloomFilterBuilder;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;
use crate::hash::sip_hash_24;

// Serialization constants
const PREAMBLE_LONGS: u8 = 4;
const SERIAL_VERSION: u8 = 1;
const FORMAT_ID: u8 = 0x5B;
const EMPTY_FLAG_MASK: u8 = 1 << 2;

/// A Bloom filter for probabilistic set membership testing.
///
/// Provides fast membership queries with:
/// - No false negatives (added entries always return `true`)
/// - Tunable false positive rate
/// - Constant space usage
///
/// Every entry is hashed once with SipHash-2-4; the digest is split into a high and a low part
/// and probe `i` lands on bit `(high + i * low) & (bit_count - 1)`.
///
/// The filter is not internally synchronized. [`add`](Self::add) and [`clear`](Self::clear)
/// take `&mut self`, so sharing a filter between writer threads needs a lock around it.
///
/// Use [`BloomFilterBuilder`] or [`BloomFilter::new`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Total number of bits (m), a power of two
    pub(super) bit_count: u64,
    /// log2(bit_count)
    pub(super) bit_count_exponent: u32,
    /// 64 - bit_count_exponent
    pub(super) hash_split_shift: u32,
    /// Number of bits touched per entry (k)
    pub(super) probes_per_entry: u64,
    /// Count of bits set to 1 (for statistics)
    pub(super) num_bits_set: u64,
    pub(super) bits: PackedBitset,
}

impl BloomFilter {
    /// Creates a filter from a pair of numbers whose meaning depends on the second one.
    ///
    /// If `rate_or_probes` is below 1 the pair is read as `(expected_entries,
    /// false_positive_rate)` and sized like [`BloomFilterBuilder::with_accuracy`]. Otherwise it
    /// is read as `(num_bits, num_probes)`, both truncated to integers, like
    /// [`BloomFilterBuilder::with_size`]. Prefer the builder, which cannot confuse the two.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if the
    /// parameters cannot describe a filter.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilter;
    /// let by_accuracy = BloomFilter::new(65536.0, 0.01).unwrap();
    /// assert_eq!(by_accuracy.bit_count(), 1 << 20);
    /// assert_eq!(by_accuracy.probes_per_entry(), 7);
    ///
    /// let by_size = BloomFilter::new(65536.0, 3.0).unwrap();
    /// assert_eq!(by_size.bit_count(), 65536);
    /// assert_eq!(by_size.probes_per_entry(), 3);
    /// ```
    pub fn new(entries_or_bits: f64, rate_or_probes: f64) -> Result<Self, Error> {
        let builder = if rate_or_probes < 1.0 {
            BloomFilterBuilder::accuracy(entries_or_bits, rate_or_probes)?
        } else {
            if !(entries_or_bits.is_finite() && entries_or_bits >= 0.0) {
                return Err(
                    Error::invalid_configuration("bit count must be a non-negative number")
                        .with_context("num_bits", entries_or_bits),
                );
            }
            if !rate_or_probes.is_finite() {
                return Err(
                    Error::invalid_configuration("probes per entry must be a finite number")
                        .with_context("num_probes", rate_or_probes),
                );
            }
            BloomFilterBuilder::with_size(entries_or_bits as u64, rate_or_probes as u64)?
        };
        builder.build()
    }

    /// Adds an entry to the filter.
    ///
    /// After this, `has(entry)` returns `true` until the filter is cleared.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let mut filter = BloomFilterBuilder::with_accuracy(100, 0.01).unwrap().build().unwrap();
    /// filter.add("apple");
    /// filter.add(b"\x00\x01");
    /// assert!(filter.has("apple"));
    /// ```
    pub fn add(&mut self, entry: impl AsRef<[u8]>) {
        let (low, high) = self.split_hash(entry.as_ref());
        self.set_bits(low, high);
    }

    /// Tests whether an entry is possibly in the set.
    ///
    /// Returns:
    /// - `true`: Entry was **possibly** added (or false positive)
    /// - `false`: Entry was **definitely not** added
    ///
    /// Byte sequences are compared exactly, so `"fish"` and `"Fish"` are different entries.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(65536.0, 0.01).unwrap();
    /// filter.add("fish");
    ///
    /// assert!(filter.has("fish"));
    /// assert!(!filter.has("Fish"));
    /// ```
    pub fn has(&self, entry: impl AsRef<[u8]>) -> bool {
        let (low, high) = self.split_hash(entry.as_ref());
        self.check_bits(low, high)
    }

    /// Tests and adds an entry with a single hash computation.
    ///
    /// Returns whether the entry was possibly present before this call.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let mut filter = BloomFilterBuilder::with_accuracy(100, 0.01).unwrap().build().unwrap();
    /// assert!(!filter.has_and_add("apple"));
    /// assert!(filter.has_and_add("apple"));
    /// ```
    pub fn has_and_add(&mut self, entry: impl AsRef<[u8]>) -> bool {
        let (low, high) = self.split_hash(entry.as_ref());
        let was_present = self.check_bits(low, high);
        self.set_bits(low, high);
        was_present
    }

    /// Resets every bit while keeping the sizing parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let mut filter = BloomFilterBuilder::with_accuracy(100, 0.01).unwrap().build().unwrap();
    /// filter.add("apple");
    ///
    /// filter.clear();
    /// assert!(filter.is_empty());
    /// assert!(!filter.has("apple"));
    /// ```
    pub fn clear(&mut self) {
        self.bits.clear();
        self.num_bits_set = 0;
    }

    /// Merges another filter into this one via bitwise OR.
    ///
    /// Afterwards this filter reports every entry that either filter reported.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if the
    /// filters are not [compatible](Self::is_compatible); `self` is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let builder = BloomFilterBuilder::with_accuracy(100, 0.01).unwrap();
    /// let mut f1 = builder.clone().build().unwrap();
    /// let mut f2 = builder.build().unwrap();
    ///
    /// f1.add("a");
    /// f2.add("b");
    ///
    /// f1.union(&f2).unwrap();
    /// assert!(f1.has("a"));
    /// assert!(f1.has("b"));
    /// ```
    pub fn union(&mut self, other: &BloomFilter) -> Result<(), Error> {
        if !self.is_compatible(other) {
            return Err(
                Error::invalid_configuration("cannot union filters with different sizing")
                    .with_context("bit_count", self.bit_count)
                    .with_context("other_bit_count", other.bit_count)
                    .with_context("probes_per_entry", self.probes_per_entry)
                    .with_context("other_probes_per_entry", other.probes_per_entry),
            );
        }

        self.bits.union_with(&other.bits);
        self.num_bits_set = self.bits.count_ones();
        Ok(())
    }

    /// Checks if two filters probe the same positions for every entry.
    ///
    /// Filters are compatible if they have the same bit count and probes per entry.
    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.bit_count == other.bit_count && self.probes_per_entry == other.probes_per_entry
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.num_bits_set == 0
    }

    /// Returns the total number of bits in the filter.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Returns log2 of [`bit_count`](Self::bit_count).
    pub fn bit_count_exponent(&self) -> u32 {
        self.bit_count_exponent
    }

    /// Returns the shift that splits a digest into its high and low parts.
    pub fn hash_split_shift(&self) -> u32 {
        self.hash_split_shift
    }

    /// Returns the number of bits touched per entry.
    pub fn probes_per_entry(&self) -> u64 {
        self.probes_per_entry
    }

    /// Returns the number of bits set to 1.
    pub fn bits_used(&self) -> u64 {
        self.num_bits_set
    }

    /// Returns the fraction of bits set.
    ///
    /// Values above 0.5 mean the filter holds more entries than it was sized for.
    pub fn load_factor(&self) -> f64 {
        self.num_bits_set as f64 / self.bit_count as f64
    }

    /// Estimates the current false positive probability as `load_factor ^ probes_per_entry`.
    pub fn estimated_fpp(&self) -> f64 {
        self.load_factor().powf(self.probes_per_entry as f64)
    }

    /// Returns the packed bit storage, bit `i` in byte `i >> 3` at position `i % 8`.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_bytes()
    }

    /// Serializes the filter to a byte vector.
    ///
    /// The layout is a 32 byte little-endian preamble holding the sizing fields, followed by the
    /// packed bit storage unless the filter is empty. Two filters built the same way and fed the
    /// same entries serialize to identical bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(1000.0, 0.01).unwrap();
    /// filter.add("test");
    ///
    /// let bytes = filter.serialize();
    /// let restored = BloomFilter::deserialize(&bytes).unwrap();
    /// assert!(restored.has("test"));
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let is_empty = self.is_empty();
        let capacity = 8 * PREAMBLE_LONGS as usize
            + if is_empty {
                0
            } else {
                self.bits.as_bytes().len()
            };
        let mut bytes = SketchBytes::with_capacity(capacity);

        // Preamble
        bytes.write_u8(PREAMBLE_LONGS); // Byte 0
        bytes.write_u8(SERIAL_VERSION); // Byte 1
        bytes.write_u8(FORMAT_ID); // Byte 2
        bytes.write_u8(if is_empty { EMPTY_FLAG_MASK } else { 0 }); // Byte 3: flags
        bytes.write_u32_le(0); // Bytes 4-7: unused

        bytes.write_u64_le(self.bit_count);
        bytes.write_u32_le(self.bit_count_exponent);
        bytes.write_u32_le(self.hash_split_shift);
        bytes.write_u64_le(self.probes_per_entry);

        if !is_empty {
            bytes.write(self.bits.as_bytes());
        }

        bytes.into_bytes()
    }

    /// Deserializes a filter from bytes produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidData`](crate::error::ErrorKind::InvalidData) if:
    /// - The data is truncated
    /// - The format id or serial version doesn't match
    /// - The sizing fields contradict each other
    /// - The empty flag disagrees with the bit storage, or bytes follow it
    /// - The bit array cannot be allocated
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilter;
    /// let original = BloomFilter::new(100.0, 0.01).unwrap();
    /// let bytes = original.serialize();
    ///
    /// let restored = BloomFilter::deserialize(&bytes).unwrap();
    /// assert_eq!(original, restored);
    /// ```
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);

        let preamble_longs = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("preamble_longs"))?;
        let serial_version = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("serial_version"))?;
        let format_id = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("format_id"))?;
        let flags = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("flags"))?;

        if format_id != FORMAT_ID {
            return Err(Error::invalid_format(FORMAT_ID, format_id));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        if preamble_longs != PREAMBLE_LONGS {
            return Err(Error::invalid_preamble_longs(
                PREAMBLE_LONGS,
                preamble_longs,
            ));
        }

        let is_empty = (flags & EMPTY_FLAG_MASK) != 0;

        let _unused = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("unused_header"))?;
        let bit_count = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("bit_count"))?;
        let bit_count_exponent = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("bit_count_exponent"))?;
        let hash_split_shift = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("hash_split_shift"))?;
        let probes_per_entry = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("probes_per_entry"))?;

        if !bit_count.is_power_of_two() || !(MIN_NUM_BITS..=MAX_NUM_BITS).contains(&bit_count) {
            return Err(Error::deserial(format!(
                "bit count must be a power of two between {MIN_NUM_BITS} and {MAX_NUM_BITS}"
            ))
            .with_context("bit_count", bit_count));
        }
        if bit_count_exponent != bit_count.trailing_zeros() {
            return Err(Error::deserial("bit count exponent does not match bit count")
                .with_context("bit_count", bit_count)
                .with_context("bit_count_exponent", bit_count_exponent));
        }
        if hash_split_shift != 64 - bit_count_exponent {
            return Err(Error::deserial("hash split shift does not match bit count")
                .with_context("bit_count_exponent", bit_count_exponent)
                .with_context("hash_split_shift", hash_split_shift));
        }
        if !(MIN_NUM_PROBES..=MAX_NUM_PROBES).contains(&probes_per_entry) {
            return Err(Error::deserial(format!(
                "probes per entry must be between {MIN_NUM_PROBES} and {MAX_NUM_PROBES}"
            ))
            .with_context("probes_per_entry", probes_per_entry));
        }

        let num_bytes = bit_count >> 3;
        let bits = if is_empty {
            if cursor.remaining() != 0 {
                return Err(Error::deserial("empty filter carries bit storage")
                    .with_context("trailing_bytes", cursor.remaining()));
            }
            PackedBitset::try_with_num_bits(bit_count).ok_or_else(|| {
                Error::deserial("cannot allocate the bit array")
                    .with_context("bit_count", bit_count)
            })?
        } else {
            if (cursor.remaining() as u64) < num_bytes {
                return Err(Error::insufficient_data(format!(
                    "bit storage: expected {num_bytes} bytes, got {}",
                    cursor.remaining()
                )));
            }
            if cursor.remaining() as u64 > num_bytes {
                return Err(Error::deserial("bytes trailing the bit storage")
                    .with_context("trailing_bytes", cursor.remaining() as u64 - num_bytes));
            }
            // bounded by the input length checked above
            let mut storage = vec![0u8; num_bytes as usize];
            cursor
                .read_exact(&mut storage)
                .map_err(|_| Error::insufficient_data("bit storage"))?;
            PackedBitset::from_bytes(storage)
        };
        let num_bits_set = bits.count_ones();
        if !is_empty && num_bits_set == 0 {
            return Err(Error::deserial("non-empty filter has no bits set"));
        }

        Ok(BloomFilter {
            bit_count,
            bit_count_exponent,
            hash_split_shift,
            probes_per_entry,
            num_bits_set,
            bits,
        })
    }

    /// Hashes an entry once and splits the digest into `(low, high)`.
    ///
    /// - high = digest >> shift
    /// - low = (digest << shift) >> shift
    ///
    /// Shifting rather than masking with a modulo is part of the stored layout.
    fn split_hash(&self, entry: &[u8]) -> (u64, u64) {
        let digest = sip_hash_24(entry);
        let shift = self.hash_split_shift;
        let high = digest >> shift;
        let low = (digest << shift) >> shift;
        (low, high)
    }

    /// Checks if all probed bits are set, stopping at the first unset one.
    fn check_bits(&self, low: u64, high: u64) -> bool {
        (0..self.probes_per_entry).all(|i| self.bits.is_set(self.probe_index(low, high, i)))
    }

    fn set_bits(&mut self, low: u64, high: u64) {
        for i in 0..self.probes_per_entry {
            let bit_index = self.probe_index(low, high, i);
            if self.bits.set(bit_index) {
                self.num_bits_set += 1;
            }
        }
    }

    /// Computes probe `i` (0-based): `(high + i * low) & (bit_count - 1)`.
    #[inline]
    fn probe_index(&self, low: u64, high: u64, i: u64) -> u64 {
        high.wrapping_add(i.wrapping_mul(low)) & (self.bit_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::BloomFilter;
    use super::EMPTY_FLAG_MASK;
    use super::MAX_NUM_BITS;
    use crate::bloom::BloomFilterBuilder;
    use crate::error::ErrorKind;

    fn probes(filter: &BloomFilter, entry: &[u8]) -> Vec<u64> {
        let (low, high) = filter.split_hash(entry);
        (0..filter.probes_per_entry)
            .map(|i| filter.probe_index(low, high, i))
            .collect()
    }

    #[test]
    fn test_split_hash_reference() {
        let filter = BloomFilter::new(65536.0, 0.01).unwrap();
        assert_eq!(filter.split_hash(b"fish"), (586_262, 489_708));
        assert_eq!(filter.split_hash(b"Fish"), (7405, 126_818));
    }

    #[test]
    fn test_probe_sequence_reference() {
        let filter = BloomFilter::new(65536.0, 0.01).unwrap();
        assert_eq!(
            probes(&filter, b"fish"),
            vec![489_708, 27394, 613_656, 151_342, 737_604, 275_290, 861_552]
        );
        assert_eq!(
            probes(&filter, b"Fish"),
            vec![126_818, 134_223, 141_628, 149_033, 156_438, 163_843, 171_248]
        );
        assert_eq!(
            probes(&filter, b""),
            vec![514_532, 873_113, 183_118, 541_699, 900_280, 210_285, 568_866]
        );
    }

    #[test]
    fn test_probe_sequence_is_deterministic() {
        let filter = BloomFilter::new(4096.0, 0.001).unwrap();
        let other = BloomFilter::new(4096.0, 0.001).unwrap();
        for entry in ["", "a", "fish", "a much longer entry spanning several blocks"] {
            assert_eq!(
                probes(&filter, entry.as_bytes()),
                probes(&other, entry.as_bytes())
            );
        }
    }

    #[test]
    fn test_fish_scenario() {
        let mut filter = BloomFilter::new(65536.0, 0.01).unwrap();
        filter.add("fish");
        assert!(filter.has("fish"));
        assert!(!filter.has("Fish"));
        assert_eq!(filter.bits_used(), 7);
    }

    #[test]
    fn test_has_and_add() {
        let mut filter = BloomFilterBuilder::with_accuracy(100, 0.01).unwrap().build().unwrap();
        assert!(!filter.has_and_add(42_u64.to_le_bytes()));
        assert!(filter.has_and_add(42_u64.to_le_bytes()));
    }

    #[test]
    fn test_new_dispatch() {
        // below 1: expected entries and false positive rate
        let filter = BloomFilter::new(100.0, 0.001).unwrap();
        assert_eq!(filter.bit_count(), 2048);
        assert_eq!(filter.probes_per_entry(), 10);

        // 1 and above: bits and probes
        let filter = BloomFilter::new(100.0, 1.0).unwrap();
        assert_eq!(filter.bit_count(), 512);
        assert_eq!(filter.probes_per_entry(), 1);

        let filter = BloomFilter::new(70_000.5, 4.9).unwrap();
        assert_eq!(filter.bit_count(), 131_072);
        assert_eq!(filter.probes_per_entry(), 4);
    }

    #[test]
    fn test_new_invalid() {
        let errors = [
            BloomFilter::new(0.0, 0.01).unwrap_err(),
            BloomFilter::new(-1.0, 0.01).unwrap_err(),
            BloomFilter::new(100.0, 0.0).unwrap_err(),
            BloomFilter::new(100.0, -0.5).unwrap_err(),
            BloomFilter::new(100.0, f64::NAN).unwrap_err(),
            BloomFilter::new(-1.0, 3.0).unwrap_err(),
            BloomFilter::new(f64::NAN, 3.0).unwrap_err(),
            BloomFilter::new(1024.0, f64::INFINITY).unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration, "{err}");
        }
    }

    #[test]
    fn test_union_incompatible() {
        let mut f1 = BloomFilter::new(1024.0, 3.0).unwrap();
        let f2 = BloomFilter::new(2048.0, 3.0).unwrap();
        let f3 = BloomFilter::new(1024.0, 4.0).unwrap();
        f1.add("a");

        assert!(!f1.is_compatible(&f2));
        assert!(!f1.is_compatible(&f3));
        let err = f1.union(&f2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert!(f1.union(&f3).is_err());
        assert_eq!(f1.bits_used(), 3);
    }

    #[test]
    fn test_statistics() {
        let mut filter = BloomFilter::new(1024.0, 5.0).unwrap();
        assert_eq!(filter.bits_used(), 0);
        assert_eq!(filter.load_factor(), 0.0);
        assert_eq!(filter.estimated_fpp(), 0.0);

        filter.add("test");
        assert!(filter.bits_used() > 0 && filter.bits_used() <= 5);
        assert!(filter.load_factor() > 0.0);
        assert!(filter.estimated_fpp() > 0.0);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_sizing() {
        let mut filter = BloomFilter::new(1024.0, 3.0).unwrap();
        filter.add("x");
        let bytes = filter.serialize();

        // bit count not a power of two
        let mut corrupted = bytes.clone();
        corrupted[8] = 1;
        let err = BloomFilter::deserialize(&corrupted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // exponent disagrees with bit count
        let mut corrupted = bytes.clone();
        corrupted[16] = 11;
        assert!(BloomFilter::deserialize(&corrupted).is_err());

        // shift disagrees with exponent
        let mut corrupted = bytes.clone();
        corrupted[20] = 10;
        assert!(BloomFilter::deserialize(&corrupted).is_err());

        // zero probes
        let mut corrupted = bytes.clone();
        corrupted[24] = 0;
        assert!(BloomFilter::deserialize(&corrupted).is_err());

        // bit storage cut short
        let err = BloomFilter::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // bytes after the bit storage
        let mut corrupted = bytes.clone();
        corrupted.push(0);
        let err = BloomFilter::deserialize(&corrupted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // empty flag on a dump that carries bit storage
        let mut corrupted = bytes.clone();
        corrupted[3] |= EMPTY_FLAG_MASK;
        let err = BloomFilter::deserialize(&corrupted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.message(), "empty filter carries bit storage");

        // non-empty flag on all-zero bit storage
        let mut corrupted = bytes.clone();
        corrupted[32..].fill(0);
        let err = BloomFilter::deserialize(&corrupted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.message(), "non-empty filter has no bits set");
    }

    #[test]
    fn test_deserialize_refuses_unobtainable_empty_filter() {
        let filter = BloomFilter::new(1024.0, 3.0).unwrap();
        let mut bytes = filter.serialize();
        assert_eq!(bytes.len(), 32);

        // a well-formed header for the largest allowed filter, with no storage to read
        bytes[8..16].copy_from_slice(&MAX_NUM_BITS.to_le_bytes());
        bytes[16..20].copy_from_slice(&63u32.to_le_bytes());
        bytes[20..24].copy_from_slice(&1u32.to_le_bytes());
        let err = BloomFilter::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.message(), "cannot allocate the bit array");
    }

    #[test]
    fn test_new_refuses_unobtainable_bit_array() {
        let err = BloomFilter::new(MAX_NUM_BITS as f64, 3.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }
}
