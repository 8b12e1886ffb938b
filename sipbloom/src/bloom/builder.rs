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

use tracing::debug;

use super::bitset::PackedBitset;
use super::BloomFilter;
use crate::error::Error;

/// Smallest bit array a filter is given; below it the hash split leaves too few high bits.
pub const MIN_NUM_BITS: u64 = 512;
/// Largest bit array a filter may be given; the hash split needs at least one low bit.
pub const MAX_NUM_BITS: u64 = 1 << 63;
/// Fewest bits a single entry may touch.
pub const MIN_NUM_PROBES: u64 = 1;
/// Most bits a single entry may touch.
pub const MAX_NUM_PROBES: u64 = i16::MAX as u64;

/// ln(2) as written into the sizing formula of existing filters. Using
/// [`std::f64::consts::LN_2`] instead can shift a rounding boundary and change the layout.
const LN_2: f64 = 0.69314718056;

/// Builder for creating [`BloomFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_accuracy()`](Self::with_accuracy): Specify expected entries and false positive rate
///   (recommended)
/// - [`with_size()`](Self::with_size): Specify bit count and probes per entry (manual)
///
/// Either way the bit count is raised to at least [`MIN_NUM_BITS`] and rounded up to a power of
/// two, since probe indices wrap with a bit mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilterBuilder {
    bit_count: u64,
    bit_count_exponent: u32,
    probes_per_entry: u64,
}

impl BloomFilterBuilder {
    /// Creates a builder sized for `expected_entries` at the given false positive rate.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if
    /// `expected_entries` is 0, `false_positive_rate` is not strictly between 0 and 1, or the
    /// resulting bit array would exceed [`MAX_NUM_BITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let builder = BloomFilterBuilder::with_accuracy(65536, 0.01).unwrap();
    /// assert_eq!(builder.bit_count(), 1 << 20);
    /// assert_eq!(builder.probes_per_entry(), 7);
    /// ```
    pub fn with_accuracy(expected_entries: u64, false_positive_rate: f64) -> Result<Self, Error> {
        Self::accuracy(expected_entries as f64, false_positive_rate)
    }

    /// Creates a builder with a caller-chosen bit count and number of probes per entry.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if
    /// `num_bits` exceeds [`MAX_NUM_BITS`] or `num_probes` is outside
    /// [`MIN_NUM_PROBES`]..=[`MAX_NUM_PROBES`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// let builder = BloomFilterBuilder::with_size(10_000, 7).unwrap();
    /// assert_eq!(builder.bit_count(), 16384);
    /// ```
    pub fn with_size(num_bits: u64, num_probes: u64) -> Result<Self, Error> {
        if !(MIN_NUM_PROBES..=MAX_NUM_PROBES).contains(&num_probes) {
            return Err(Error::invalid_configuration(format!(
                "probes per entry must be between {MIN_NUM_PROBES} and {MAX_NUM_PROBES}"
            ))
            .with_context("num_probes", num_probes));
        }

        let (bit_count, bit_count_exponent) = Self::round_num_bits(num_bits)?;
        Ok(BloomFilterBuilder {
            bit_count,
            bit_count_exponent,
            probes_per_entry: num_probes,
        })
    }

    /// Sizing for the `(expected_entries, false_positive_rate)` pair, accepting fractional
    /// entry counts as [`BloomFilter::new`] does.
    pub(super) fn accuracy(expected_entries: f64, false_positive_rate: f64) -> Result<Self, Error> {
        if !(expected_entries.is_finite() && expected_entries > 0.0) {
            return Err(
                Error::invalid_configuration("expected entries must be greater than 0")
                    .with_context("expected_entries", expected_entries),
            );
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(Error::invalid_configuration(
                "false positive rate must be between 0.0 and 1.0 (exclusive)",
            )
            .with_context("false_positive_rate", false_positive_rate));
        }

        let raw_bits = Self::raw_num_bits(expected_entries, false_positive_rate);
        let num_probes = (LN_2 * raw_bits / expected_entries).ceil();
        if num_probes > MAX_NUM_PROBES as f64 {
            return Err(Error::invalid_configuration(format!(
                "probes per entry must not exceed {MAX_NUM_PROBES}"
            ))
            .with_context("false_positive_rate", false_positive_rate));
        }

        // the raw bit count is truncated, not rounded, before the power of two step
        let (bit_count, bit_count_exponent) = Self::round_num_bits(raw_bits as u64)
            .map_err(|err| err.with_context("expected_entries", expected_entries))?;
        Ok(BloomFilterBuilder {
            bit_count,
            bit_count_exponent,
            probes_per_entry: (num_probes as u64).max(MIN_NUM_PROBES),
        })
    }

    /// Builds the Bloom filter with every bit cleared.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if the
    /// bit array cannot be allocated.
    pub fn build(self) -> Result<BloomFilter, Error> {
        let bits = PackedBitset::try_with_num_bits(self.bit_count).ok_or_else(|| {
            Error::invalid_configuration("cannot allocate the bit array")
                .with_context("bit_count", self.bit_count)
        })?;

        debug!(
            bit_count = self.bit_count,
            bit_count_exponent = self.bit_count_exponent,
            probes_per_entry = self.probes_per_entry,
            "sized bloom filter"
        );

        Ok(BloomFilter {
            bit_count: self.bit_count,
            bit_count_exponent: self.bit_count_exponent,
            hash_split_shift: 64 - self.bit_count_exponent,
            probes_per_entry: self.probes_per_entry,
            num_bits_set: 0,
            bits,
        })
    }

    /// Returns the number of bits the filter will have.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Returns log2 of [`bit_count`](Self::bit_count).
    pub fn bit_count_exponent(&self) -> u32 {
        self.bit_count_exponent
    }

    /// Returns the number of bits touched per entry.
    pub fn probes_per_entry(&self) -> u64 {
        self.probes_per_entry
    }

    /// Suggests the number of bits for the given entries and false positive rate, before any
    /// rounding to a power of two.
    ///
    /// Formula: `m = -n * ln(p) / (ln(2)^2)`, truncated
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// assert_eq!(BloomFilterBuilder::suggest_num_bits(1000, 0.01), 9585);
    /// ```
    pub fn suggest_num_bits(expected_entries: u64, false_positive_rate: f64) -> u64 {
        Self::raw_num_bits(expected_entries as f64, false_positive_rate) as u64
    }

    /// Suggests the number of probes per entry for the given entries and false positive rate.
    ///
    /// Formula: `k = ceil(ln(2) * m / n)` with the unrounded `m`
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// assert_eq!(BloomFilterBuilder::suggest_num_probes(1000, 0.01), 7);
    /// ```
    pub fn suggest_num_probes(expected_entries: u64, false_positive_rate: f64) -> u64 {
        let n = expected_entries as f64;
        let m = Self::raw_num_bits(n, false_positive_rate);
        (LN_2 * m / n).ceil() as u64
    }

    /// Rounds `num_bits` up to a power of two of at least [`MIN_NUM_BITS`], returning the
    /// rounded count and its exponent.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration`](crate::error::ErrorKind::InvalidConfiguration) if the
    /// rounded count exceeds [`MAX_NUM_BITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use sipbloom::bloom::BloomFilterBuilder;
    /// assert_eq!(BloomFilterBuilder::round_num_bits(0).unwrap(), (512, 9));
    /// assert_eq!(BloomFilterBuilder::round_num_bits(628_166).unwrap(), (1 << 20, 20));
    /// ```
    pub fn round_num_bits(num_bits: u64) -> Result<(u64, u32), Error> {
        if num_bits > MAX_NUM_BITS {
            return Err(Error::invalid_configuration(format!(
                "bit count must not exceed {MAX_NUM_BITS}"
            ))
            .with_context("num_bits", num_bits));
        }

        let bit_count = num_bits.max(MIN_NUM_BITS).next_power_of_two();
        Ok((bit_count, bit_count.trailing_zeros()))
    }

    fn raw_num_bits(expected_entries: f64, false_positive_rate: f64) -> f64 {
        -expected_entries * false_positive_rate.ln() / (LN_2 * LN_2)
    }
}
