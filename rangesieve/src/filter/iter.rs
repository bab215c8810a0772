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

use crate::suffix::KeyCompare;
use crate::trie::dense::DenseIter;
use crate::trie::sparse::SparseIter;

/// Ordered cursor over the stored keys of a [`super::RangeFilter`].
///
/// A cursor composes one position per tier and crosses the dense/sparse
/// boundary transparently. It borrows the filter and is positioned by
/// [`super::RangeFilter::first`], [`super::RangeFilter::last`],
/// [`super::RangeFilter::seek`] or [`super::RangeFilter::seek_before`];
/// an exhausted or unpositioned cursor reports
/// [`is_valid`](Iter::is_valid) `false` and ignores further movement.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    pub(super) inner: Option<IterInner<'a>>,
    pub(super) could_be_fp: bool,
}

#[derive(Debug, Clone)]
pub(super) struct IterInner<'a> {
    pub(super) dense: DenseIter<'a>,
    pub(super) sparse: SparseIter<'a>,
}

impl<'a> Iter<'a> {
    pub(super) fn invalid() -> Self {
        Iter {
            inner: None,
            could_be_fp: false,
        }
    }

    /// Whether the cursor points at a stored key.
    pub fn is_valid(&self) -> bool {
        self.inner.as_ref().is_some_and(IterInner::is_valid)
    }

    /// Whether the current position may be a false positive: a hash suffix
    /// could not rule out a mismatch at the seek boundary.
    pub fn could_be_fp(&self) -> bool {
        self.could_be_fp
    }

    /// The stored key prefix under the cursor (suffix bits excluded).
    /// Empty when the cursor is invalid.
    pub fn key(&self) -> Vec<u8> {
        match &self.inner {
            Some(inner) if inner.is_valid() => inner.key(),
            _ => Vec::new(),
        }
    }

    /// The real suffix bits stored for the current key: `(bits, bit_len)`.
    /// `(0, 0)` unless the filter stores real suffixes.
    pub fn suffix(&self) -> (u64, u32) {
        match &self.inner {
            Some(inner) if inner.is_valid() => inner.suffix(),
            _ => (0, 0),
        }
    }

    /// The stored key prefix with the real suffix bits appended, plus the
    /// number of valid bits in the final byte (0 meaning all eight).
    pub fn key_with_suffix(&self) -> (Vec<u8>, u32) {
        let mut key = self.key();
        let (suffix, suffix_len) = self.suffix();
        let mut bit_len = 0;
        if suffix_len > 0 && suffix > 0 {
            bit_len = suffix_len % 8;
            let shifted = suffix << (64 - suffix_len);
            let mut taken = 0;
            while taken < suffix_len {
                key.push((shifted >> (56 - taken)) as u8);
                taken += 8;
            }
        }
        (key, bit_len)
    }

    /// Orders the cursor position against `key`.
    /// [`KeyCompare::CouldBePositive`] means the stored suffix cannot decide.
    pub fn compare(&self, key: &[u8]) -> KeyCompare {
        match &self.inner {
            Some(inner) if inner.is_valid() => inner.compare(key),
            _ => KeyCompare::CouldBePositive,
        }
    }

    /// Moves to the next stored key in ascending order. Returns whether the
    /// cursor is still valid afterwards.
    pub fn next(&mut self) -> bool {
        match &mut self.inner {
            Some(inner) if inner.is_valid() => inner.increment(),
            _ => false,
        }
    }

    /// Moves to the previous stored key. Returns whether the cursor is
    /// still valid afterwards.
    pub fn prev(&mut self) -> bool {
        match &mut self.inner {
            Some(inner) if inner.is_valid() => inner.decrement(),
            _ => false,
        }
    }
}

impl IterInner<'_> {
    pub(super) fn is_valid(&self) -> bool {
        if self.dense.trie_height() == 0 {
            return self.sparse.is_valid();
        }
        self.dense.is_valid() && (self.dense.is_complete() || self.sparse.is_valid())
    }

    pub(super) fn pass_to_sparse(&mut self) {
        self.sparse.set_start_node_num(self.dense.send_out_node_num());
    }

    fn key(&self) -> Vec<u8> {
        if self.dense.is_complete() {
            return self.dense.key().to_vec();
        }
        let mut key = self.dense.key().to_vec();
        key.extend_from_slice(self.sparse.key());
        key
    }

    fn suffix(&self) -> (u64, u32) {
        if self.dense.is_complete() {
            self.dense.suffix()
        } else {
            self.sparse.suffix()
        }
    }

    fn compare(&self, key: &[u8]) -> KeyCompare {
        if self.dense.trie_height() == 0 {
            return self.sparse.compare(key);
        }
        let dense_compare = self.dense.compare(key);
        if self.dense.is_complete() || dense_compare != KeyCompare::Equal {
            return dense_compare;
        }
        self.sparse.compare(key)
    }

    pub(super) fn increment_dense_iter(&mut self) -> bool {
        if !self.dense.is_valid() {
            return false;
        }
        self.dense.increment();
        if !self.dense.is_valid() {
            return false;
        }
        if self.dense.is_move_left_complete() {
            return true;
        }
        self.pass_to_sparse();
        self.sparse.move_to_leftmost_key();
        true
    }

    fn increment_sparse_iter(&mut self) -> bool {
        if !self.sparse.is_valid() {
            return false;
        }
        self.sparse.increment();
        self.sparse.is_valid()
    }

    fn increment(&mut self) -> bool {
        if self.increment_sparse_iter() {
            return true;
        }
        self.increment_dense_iter()
    }

    fn decrement_dense_iter(&mut self) -> bool {
        if !self.dense.is_valid() {
            return false;
        }
        self.dense.decrement();
        if !self.dense.is_valid() {
            return false;
        }
        if self.dense.is_move_right_complete() {
            return true;
        }
        self.pass_to_sparse();
        self.sparse.move_to_rightmost_key();
        true
    }

    fn decrement_sparse_iter(&mut self) -> bool {
        if !self.sparse.is_valid() {
            return false;
        }
        self.sparse.decrement();
        self.sparse.is_valid()
    }

    fn decrement(&mut self) -> bool {
        if self.decrement_sparse_iter() {
            return true;
        }
        self.decrement_dense_iter()
    }
}
