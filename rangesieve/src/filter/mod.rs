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

//! Approximate range-membership filter over sorted byte-string keys.
//!
//! A [`RangeFilter`] is a compact, serializable index that answers point
//! membership and range-nonempty queries with **no false negatives** and a
//! tunable false-positive rate, while also supporting ordered iteration,
//! predecessor/successor seeks and range-cardinality estimation. It is built
//! once from sorted keys and immutable afterwards, which makes it safe to
//! share across threads for read-only queries.
//!
//! # Properties
//!
//! - **No false negatives**: every inserted key reports present, every range
//!   containing an inserted key reports non-empty.
//! - **Possible false positives**: rate is tuned by the suffix
//!   configuration; see [`SuffixKind`].
//! - **Ordered access**: [`RangeFilter::first`], [`RangeFilter::seek`] and
//!   the cursor's `next`/`prev` walk the stored keys in byte-lex order.
//!
//! # Usage
//!
//! ```rust
//! use rangesieve::filter::Config;
//! use rangesieve::filter::RangeFilter;
//!
//! let keys: Vec<&[u8]> = vec![b"apple", b"applet", b"apricot"];
//! let filter = RangeFilter::from_sorted(keys, &Config::default()).unwrap();
//!
//! assert!(filter.lookup(b"applet"));
//! assert!(!filter.lookup(b"durian"));
//! assert!(filter.lookup_range(b"appia", true, b"appz", true));
//!
//! let mut iter = filter.first();
//! assert_eq!(iter.key(), b"apple");
//! assert!(iter.next());
//! assert_eq!(iter.key(), b"applet");
//! ```
//!
//! # Incremental construction
//!
//! ```rust
//! use rangesieve::filter::Config;
//! use rangesieve::filter::RangeFilter;
//!
//! let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
//! assert!(filter.insert(b"apple"));
//! assert!(filter.insert(b"banana"));
//! assert!(!filter.insert(b"aardvark")); // out of order, rejected
//! filter.finalize();
//! assert!(filter.lookup(b"apple"));
//! ```

mod config;
mod iter;
mod sieve;

pub use self::config::Config;
pub use self::iter::Iter;
pub use self::sieve::RangeFilter;

pub use crate::suffix::KeyCompare;
pub use crate::suffix::SuffixKind;
