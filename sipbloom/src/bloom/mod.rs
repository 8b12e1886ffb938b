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

//! Bloom filter for probabilistic set membership testing.
//!
//! A Bloom filter is a space-efficient probabilistic data structure used to test whether
//! an entry is a member of a set. False positive matches are possible, but false negatives
//! are not. In other words, a query returns either "possibly in set" or "definitely not in set".
//!
//! # Properties
//!
//! - **No false negatives**: If an entry was added, `has()` will always return `true`
//! - **Possible false positives**: `has()` may return `true` for entries never added
//! - **Fixed size**: The bit array never grows; entries cannot be removed one by one
//! - **Reproducible**: The same sizing and the same entries always give the same bits
//!
//! # Usage
//!
//! ```rust
//! use sipbloom::bloom::BloomFilterBuilder;
//!
//! // Create a filter sized for 1000 entries with a 1% false positive rate
//! let mut filter = BloomFilterBuilder::with_accuracy(1000, 0.01)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! filter.add("apple");
//! filter.add(b"banana");
//!
//! assert!(filter.has("apple")); // true - definitely added
//! assert!(!filter.has("grape")); // false - never added (probably)
//!
//! println!("Capacity: {} bits", filter.bit_count());
//! println!("Bits used: {}", filter.bits_used());
//! println!("Est. FPP: {:.4}%", filter.estimated_fpp() * 100.0);
//! ```
//!
//! # Creating Filters
//!
//! ## By Accuracy (Recommended)
//!
//! ```rust
//! # use sipbloom::bloom::BloomFilterBuilder;
//! # use sipbloom::bloom::ONE_IN_THOUSAND;
//! let filter = BloomFilterBuilder::with_accuracy(10_000, ONE_IN_THOUSAND)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(filter.bit_count(), 1 << 18);
//! ```
//!
//! ## By Size (Manual)
//!
//! The bit count is rounded up to a power of two of at least 512:
//!
//! ```rust
//! # use sipbloom::bloom::BloomFilterBuilder;
//! let filter = BloomFilterBuilder::with_size(95_851, 7).unwrap().build().unwrap();
//! assert_eq!(filter.bit_count(), 131_072);
//! ```
//!
//! ## From Lines Of Text
//!
//! [`BloomFilter::from_reader`] and [`BloomFilter::from_file`] count the lines of a source,
//! size the filter for them and add every trimmed, lowercased line.
//!
//! # Sharing Between Threads
//!
//! The filter has no internal locking. Wrap it in a lock to add from several threads:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::RwLock;
//! # use sipbloom::bloom::BloomFilter;
//!
//! let filter = Arc::new(RwLock::new(BloomFilter::new(1000.0, 0.01).unwrap()));
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let filter = Arc::clone(&filter);
//!         std::thread::spawn(move || filter.write().unwrap().add(format!("entry-{t}")))
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert!(filter.read().unwrap().has("entry-3"));
//! ```
//!
//! # Implementation Details
//!
//! - Uses SipHash-2-4 with a fixed key for hashing
//! - Implements enhanced double hashing: one digest is split into a high and a low part
//! - Bits packed into bytes, least significant bit first
//!
//! # References
//!
//! - Bloom, Burton H. (1970). "Space/time trade-offs in hash coding with allowable errors"
//! - Kirsch and Mitzenmacher (2008). "Less Hashing, Same Performance: Building a Better Bloom
//!   Filter"
//! - Aumasson and Bernstein (2012). "SipHash: a fast short-input PRF"

mod bitset;
mod builder;
mod loader;
mod sketch;

pub use self::builder::BloomFilterBuilder;
pub use self::builder::MAX_NUM_BITS;
pub use self::builder::MAX_NUM_PROBES;
pub use self::builder::MIN_NUM_BITS;
pub use self::builder::MIN_NUM_PROBES;
pub use self::loader::count_lines;
pub use self::sketch::BloomFilter;

/// One false positive in a hundred lookups.
pub const ONE_IN_HUNDRED: f64 = 0.01;
/// One false positive in a thousand lookups.
pub const ONE_IN_THOUSAND: f64 = 0.001;
/// One false positive in ten thousand lookups.
pub const ONE_IN_TEN_THOUSAND: f64 = 0.0001;
/// One false positive in a hundred thousand lookups.
pub const ONE_IN_HUNDRED_THOUSAND: f64 = 0.00001;
/// One false positive in a million lookups.
pub const ONE_IN_MILLION: f64 = 0.000001;
