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

use super::Config;
use super::Iter;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::codec::RANGE_FILTER_FAMILY_ID;
use crate::codec::SERIAL_VERSION;
use crate::error::Error;
use crate::suffix::KeyCompare;
use crate::trie::builder::TrieBuilder;
use crate::trie::dense::DenseLookup;
use crate::trie::dense::DenseTrie;
use crate::trie::sparse::SparseTrie;

/// An approximate range-membership filter over an ordered set of byte-string
/// keys.
///
/// See the [module documentation](super) for an overview and examples. Use
/// [`from_sorted`](Self::from_sorted) for batch construction or
/// [`incremental`](Self::incremental) plus [`insert`](Self::insert) and
/// [`finalize`](Self::finalize) for streaming construction. Queries on a
/// filter still in incremental mode conservatively report "not found".
#[derive(Debug)]
pub struct RangeFilter {
    state: State,
}

#[derive(Debug)]
enum State {
    Building(TrieBuilder),
    Finalized {
        dense: DenseTrie,
        sparse: SparseTrie,
    },
}

impl RangeFilter {
    /// Builds a filter from keys in strictly ascending byte-lex order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::InvalidArgument`] for an
    /// inconsistent `config` and
    /// [`crate::error::ErrorKind::OutOfOrderInsert`] when the input is not
    /// strictly ascending or contains an empty key.
    pub fn from_sorted<I, K>(keys: I, config: &Config) -> Result<Self, Error>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut filter = Self::incremental(config)?;
        for key in keys {
            if !filter.insert(key.as_ref()) {
                return Err(Error::new(
                    crate::error::ErrorKind::OutOfOrderInsert,
                    "keys must be non-empty and strictly ascending",
                ));
            }
        }
        filter.finalize();
        Ok(filter)
    }

    /// Creates an empty filter ready for incremental insertion.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::InvalidArgument`] for an
    /// inconsistent `config`.
    pub fn incremental(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(RangeFilter {
            state: State::Building(TrieBuilder::new(
                config.include_dense,
                config.sparse_dense_ratio,
                config.suffix_kind,
                config.hash_suffix_len,
                config.real_suffix_len,
            )),
        })
    }

    /// Inserts a key during incremental construction. Keys must arrive in
    /// strictly ascending order. Returns false, leaving the filter
    /// untouched, for an out-of-order, duplicate or empty key, or when the
    /// filter is already finalized.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        match &mut self.state {
            State::Building(builder) => builder.insert(key),
            State::Finalized { .. } => false,
        }
    }

    /// Finishes incremental construction and builds the query structures.
    /// A no-op when already finalized; finalizing an empty filter yields a
    /// valid filter that matches nothing.
    pub fn finalize(&mut self) {
        if let State::Building(builder) = &mut self.state {
            builder.finalize();
            let dense = DenseTrie::from_builder(builder);
            let sparse = SparseTrie::from_builder(builder);
            self.state = State::Finalized { dense, sparse };
        }
    }

    /// Whether any key has been inserted.
    pub fn has_keys(&self) -> bool {
        match &self.state {
            State::Building(builder) => builder.has_keys(),
            State::Finalized { sparse, .. } => sparse.height() > 0,
        }
    }

    fn tiers(&self) -> Option<(&DenseTrie, &SparseTrie)> {
        match &self.state {
            State::Building(_) => None,
            State::Finalized { dense, sparse } => Some((dense, sparse)),
        }
    }

    /// Tests whether `key` is possibly in the set.
    ///
    /// Returns `true` when the key was inserted (never a false negative) and
    /// possibly for other keys, at a rate governed by the suffix
    /// configuration. Always false before [`finalize`](Self::finalize).
    pub fn lookup(&self, key: &[u8]) -> bool {
        let Some((dense, sparse)) = self.tiers() else {
            return false;
        };
        if sparse.height() == 0 {
            return false;
        }
        if dense.height() == 0 {
            return sparse.lookup_key(key, 0);
        }
        match dense.lookup_key(key) {
            DenseLookup::Miss => false,
            DenseLookup::Hit => true,
            DenseLookup::Continue(node_num) => sparse.lookup_key(key, node_num),
        }
    }

    /// Tests whether any stored key falls in the given range, conservatively
    /// (no false negatives).
    pub fn lookup_range(
        &self,
        left_key: &[u8],
        left_inclusive: bool,
        right_key: &[u8],
        right_inclusive: bool,
    ) -> bool {
        let iter = self.seek(left_key, left_inclusive);
        if !iter.is_valid() {
            return false;
        }
        match iter.compare(right_key) {
            KeyCompare::CouldBePositive => true,
            KeyCompare::Greater => false,
            KeyCompare::Equal => right_inclusive,
            KeyCompare::Less => true,
        }
    }

    /// Positions a cursor at the smallest stored key satisfying
    /// `>= key` (inclusive) or `> key` (exclusive), conservatively: the
    /// cursor may park on a stored prefix whose suffix cannot rule `key`
    /// out, flagged via [`Iter::could_be_fp`]. Invalid when no stored key
    /// qualifies.
    pub fn seek(&self, key: &[u8], inclusive: bool) -> Iter<'_> {
        let Some((dense, sparse)) = self.tiers() else {
            return Iter::invalid();
        };
        if sparse.height() == 0 {
            return Iter::invalid();
        }
        let mut inner = super::iter::IterInner {
            dense: dense.iter(),
            sparse: sparse.iter(),
        };
        let mut could_be_fp = dense.move_to_key_greater_than(key, inclusive, &mut inner.dense);

        if inner.dense.is_valid() && !inner.dense.is_complete() {
            if !inner.dense.is_search_complete() {
                inner.pass_to_sparse();
                could_be_fp = sparse.move_to_key_greater_than(key, inclusive, &mut inner.sparse);
                if !inner.sparse.is_valid() {
                    inner.increment_dense_iter();
                }
            } else if !inner.dense.is_move_left_complete() {
                inner.pass_to_sparse();
                inner.sparse.move_to_leftmost_key();
            }
        }
        Iter {
            inner: Some(inner),
            could_be_fp,
        }
    }

    /// Positions a cursor at the largest stored key smaller than `key`,
    /// modulo the false-positive flag.
    pub fn seek_before(&self, key: &[u8]) -> Iter<'_> {
        let mut iter = self.seek(key, false);
        if !iter.is_valid() {
            return self.last();
        }
        if !iter.could_be_fp() {
            iter.prev();
            // The exclusive seek may have landed on the key itself when it
            // is stored; disambiguate by looking the key up.
            if self.lookup(key) {
                iter.prev();
            }
        }
        iter
    }

    /// Positions a cursor at the smallest stored key; invalid when empty.
    pub fn first(&self) -> Iter<'_> {
        let Some((dense, sparse)) = self.tiers() else {
            return Iter::invalid();
        };
        if sparse.height() == 0 {
            return Iter::invalid();
        }
        let mut inner = super::iter::IterInner {
            dense: dense.iter(),
            sparse: sparse.iter(),
        };
        if dense.height() > 0 {
            inner.dense.set_to_first_label_in_root();
            inner.dense.move_to_leftmost_key();
            if !inner.dense.is_move_left_complete() {
                inner.pass_to_sparse();
                inner.sparse.move_to_leftmost_key();
            }
        } else {
            inner.sparse.set_to_first_label_in_root();
            inner.sparse.move_to_leftmost_key();
        }
        Iter {
            inner: Some(inner),
            could_be_fp: false,
        }
    }

    /// Positions a cursor at the largest stored key; invalid when empty.
    pub fn last(&self) -> Iter<'_> {
        let Some((dense, sparse)) = self.tiers() else {
            return Iter::invalid();
        };
        if sparse.height() == 0 {
            return Iter::invalid();
        }
        let mut inner = super::iter::IterInner {
            dense: dense.iter(),
            sparse: sparse.iter(),
        };
        if dense.height() > 0 {
            inner.dense.set_to_last_label_in_root();
            inner.dense.move_to_rightmost_key();
            if !inner.dense.is_move_right_complete() {
                inner.pass_to_sparse();
                inner.sparse.move_to_rightmost_key();
            }
        } else {
            inner.sparse.set_to_last_label_in_root();
            inner.sparse.move_to_rightmost_key();
        }
        Iter {
            inner: Some(inner),
            could_be_fp: false,
        }
    }

    /// Estimates the number of stored keys in `[left_key, right_key]`.
    /// Accurate except at the boundaries: undercounts by at most two.
    pub fn approx_count(&self, left_key: &[u8], right_key: &[u8]) -> u64 {
        let iter_left = self.seek(left_key, true);
        if !iter_left.is_valid() {
            return 0;
        }
        let mut iter_right = self.seek(right_key, true);
        if !iter_right.is_valid() {
            iter_right = self.last();
        }
        self.approx_count_iters(&iter_left, &iter_right)
    }

    /// Estimates the number of stored keys between two positioned cursors,
    /// inclusive. Undercounts by at most two.
    pub fn approx_count_iters(&self, iter_left: &Iter<'_>, iter_right: &Iter<'_>) -> u64 {
        let Some((dense, sparse)) = self.tiers() else {
            return 0;
        };
        if !iter_left.is_valid() || !iter_right.is_valid() {
            return 0;
        }
        let (left, right) = match (&iter_left.inner, &iter_right.inner) {
            (Some(left), Some(right)) => (left, right),
            _ => return 0,
        };
        let (count, out_left, out_right) = dense.approx_count(&left.dense, &right.dense);
        count + sparse.approx_count(&left.sparse, &right.sparse, out_left, out_right)
    }

    /// Serialized length in bytes of [`serialize`](Self::serialize)'s
    /// output; 0 before finalize.
    pub fn serialized_size(&self) -> u64 {
        match self.tiers() {
            Some((dense, sparse)) => 8 + dense.serialized_size() + sparse.serialized_size(),
            None => 0,
        }
    }

    /// Serializes the filter to a byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::NotFinalized`] while the filter is
    /// still in incremental mode.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let Some((dense, sparse)) = self.tiers() else {
            return Err(Error::new(
                crate::error::ErrorKind::NotFinalized,
                "serialize requires a finalized filter",
            ));
        };
        let mut bytes = FilterBytes::with_capacity(self.serialized_size() as usize);
        bytes.write_u8(RANGE_FILTER_FAMILY_ID);
        bytes.write_u8(SERIAL_VERSION);
        bytes.pad_to_alignment();
        dense.serialize(&mut bytes);
        sparse.serialize(&mut bytes);
        debug_assert_eq!(bytes.len() as u64, self.serialized_size());
        Ok(bytes.into_bytes())
    }

    /// Reconstructs a filter from [`serialize`](Self::serialize)'s output.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::InvalidData`] for a truncated
    /// buffer, a wrong family byte or an unsupported serial version.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = FilterSlice::new(bytes);
        let family = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("family"))?;
        if family != RANGE_FILTER_FAMILY_ID {
            return Err(Error::invalid_family(RANGE_FILTER_FAMILY_ID, family));
        }
        let version = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("serial_version"))?;
        if version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(SERIAL_VERSION, version));
        }
        cursor
            .skip_padding()
            .map_err(|_| Error::insufficient_data("preamble padding"))?;
        let dense = DenseTrie::deserialize(&mut cursor)
            .map_err(|err| Error::deserial(format!("dense tier: {err}")))?;
        let sparse = SparseTrie::deserialize(&mut cursor)
            .map_err(|err| Error::deserial(format!("sparse tier: {err}")))?;
        Ok(RangeFilter {
            state: State::Finalized { dense, sparse },
        })
    }

    /// Approximate heap usage in bytes of the query structures.
    pub fn memory_usage(&self) -> u64 {
        match self.tiers() {
            Some((dense, sparse)) => 64 + dense.size_bytes() + sparse.size_bytes(),
            None => 0,
        }
    }

    /// Height of the trie (longest stored path in bytes); 0 when empty or
    /// not finalized.
    pub fn height(&self) -> u32 {
        match self.tiers() {
            Some((_, sparse)) => sparse.height(),
            None => 0,
        }
    }

    /// First trie level encoded sparsely; equals [`height`](Self::height)
    /// when the whole trie is dense.
    pub fn sparse_start_level(&self) -> u32 {
        match self.tiers() {
            Some((_, sparse)) => sparse.start_level(),
            None => 0,
        }
    }
}
