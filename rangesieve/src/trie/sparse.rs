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

//! Sparse (LOUDS-encoded) lower tier of the trie.
//!
//! Node `i` owns the label run between the `i`-th and `(i+1)`-th set bit of
//! the node-boundary vector. Node numbers continue the dense tier's global
//! numbering, so entry from a dense hand-off needs no translation beyond the
//! stored dense node and child counts.

use std::io;

use super::builder::TrieBuilder;
use super::MAX_POS;
use super::TERMINATOR_LABEL;
use crate::bitvec::Bitvector;
use crate::bitvec::RankVector;
use crate::bitvec::SelectVector;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::labels::LabelVector;
use crate::suffix::KeyCompare;
use crate::suffix::SuffixKind;
use crate::suffix::SuffixVector;

/// The sparse tier: levels `start_level..height` of the trie.
#[derive(Debug)]
pub(crate) struct SparseTrie {
    height: u32,
    start_level: u32,
    node_count_dense: u32,
    child_count_dense: u32,
    level_cuts: Vec<u32>,
    labels: LabelVector,
    child_indicator_bits: RankVector,
    louds_bits: SelectVector,
    suffixes: SuffixVector,
}

impl SparseTrie {
    pub fn from_builder(builder: &TrieBuilder) -> Self {
        let height = builder.tree_height() as u32;
        let start_level = builder.sparse_start_level();
        let node_count_dense: u32 = builder.node_counts()[..start_level as usize].iter().sum();
        let child_count_dense = if start_level == 0 || start_level >= height {
            0
        } else {
            node_count_dense + builder.node_counts()[start_level as usize] - 1
        };

        let start = start_level as usize;
        let end = height as usize;
        let labels_per_level = builder.labels_per_level();

        let mut level_cuts = Vec::with_capacity(end - start);
        let mut position_count = 0u32;
        for &labels in &labels_per_level[start..end] {
            position_count += labels;
            level_cuts.push(position_count.wrapping_sub(1));
        }

        let labels = LabelVector::from_levels(builder.labels(), start, end);
        let child_indicator_bits = RankVector::new(Bitvector::from_level_bits(
            builder.child_indicator_bits(),
            &labels_per_level,
            start,
            end,
        ));
        let louds_bits = SelectVector::new(Bitvector::from_level_bits(
            builder.louds_bits(),
            &labels_per_level,
            start,
            end,
        ));

        let suffixes = if builder.suffix_kind() == SuffixKind::None {
            SuffixVector::empty()
        } else {
            let slot_len = builder.hash_suffix_len() + builder.real_suffix_len();
            let suffix_bits_per_level: Vec<u32> = builder.suffix_counts()
                .iter()
                .map(|&count| count * slot_len)
                .collect();
            SuffixVector::from_level_bits(
                builder.suffix_kind(),
                builder.hash_suffix_len(),
                builder.real_suffix_len(),
                builder.suffix_bits(),
                &suffix_bits_per_level,
                start,
                end,
            )
        };

        SparseTrie {
            height,
            start_level,
            node_count_dense,
            child_count_dense,
            level_cuts,
            labels,
            child_indicator_bits,
            louds_bits,
            suffixes,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn start_level(&self) -> u32 {
        self.start_level
    }

    fn num_levels(&self) -> u32 {
        self.height - self.start_level
    }

    /// Continues a point lookup from the dense hand-off node.
    pub fn lookup_key(&self, key: &[u8], in_node_num: u32) -> bool {
        if self.labels.len() == 0 {
            return false;
        }
        let mut node_num = in_node_num;
        let mut pos = self.first_label_pos(node_num);
        let mut level = self.start_level;
        while (level as usize) < key.len() {
            let node_size = self.node_size(pos);
            match self.labels.search(key[level as usize], pos, node_size) {
                Some(found) => pos = found,
                None => return false,
            }
            if !self.child_indicator_bits.read_bit(pos) {
                return self.suffixes.check_equality(self.suffix_pos(pos), key, level + 1);
            }
            node_num = self.child_node_num(pos);
            pos = self.first_label_pos(node_num);
            level += 1;
        }
        // Out of key bytes: only a terminator label in front of this node
        // can match the key exactly.
        self.labels.read(pos) == TERMINATOR_LABEL
            && !self.child_indicator_bits.read_bit(pos)
            && self.suffixes.check_equality(self.suffix_pos(pos), key, level + 1)
    }

    /// Continues a greater-than seek from the iterator's start node. The
    /// return value is the could-be-false-positive flag.
    pub fn move_to_key_greater_than(
        &self,
        key: &[u8],
        inclusive: bool,
        iter: &mut SparseIter<'_>,
    ) -> bool {
        if self.labels.len() == 0 {
            iter.is_valid = false;
            return false;
        }
        let mut node_num = iter.start_node_num;
        let mut pos = self.first_label_pos(node_num);
        let mut level = self.start_level;
        while (level as usize) < key.len() {
            let node_size = self.node_size(pos);
            match self.labels.search(key[level as usize], pos, node_size) {
                Some(found) => pos = found,
                None => {
                    self.move_to_left_in_next_subtrie(pos, node_size, key[level as usize], iter);
                    return false;
                }
            }
            iter.append_with_label(key[level as usize], pos);
            if !self.child_indicator_bits.read_bit(pos) {
                return self.compare_suffix_greater_than(pos, key, level + 1, iter);
            }
            node_num = self.child_node_num(pos);
            pos = self.first_label_pos(node_num);
            level += 1;
        }

        if self.labels.read(pos) == TERMINATOR_LABEL
            && !self.child_indicator_bits.read_bit(pos)
            && !self.is_end_of_node(pos)
        {
            // The key's path is stored as a prefix-key; park on it.
            iter.append_with_label(TERMINATOR_LABEL, pos);
            iter.is_at_terminator = true;
            if inclusive {
                iter.is_valid = true;
            } else {
                iter.increment();
            }
            return false;
        }
        iter.move_to_leftmost_key();
        false
    }

    // The searched label was missing; everything at or under the next
    // greater label is the seek result.
    fn move_to_left_in_next_subtrie(
        &self,
        pos: u32,
        node_size: u32,
        label: u8,
        iter: &mut SparseIter<'_>,
    ) {
        match self.labels.search_greater_than(label, pos, node_size) {
            Some(found) => {
                iter.append(found);
                iter.move_to_leftmost_key();
            }
            None => {
                iter.append(pos + node_size - 1);
                iter.increment();
            }
        }
    }

    fn compare_suffix_greater_than(
        &self,
        pos: u32,
        key: &[u8],
        level: u32,
        iter: &mut SparseIter<'_>,
    ) -> bool {
        let compare = self.suffixes.compare(self.suffix_pos(pos), key, level);
        if compare == KeyCompare::Less {
            iter.increment();
            return false;
        }
        iter.is_valid = true;
        true
    }

    /// Counts terminals between the two iterator paths across the sparse
    /// levels. Boundary paths entering from the dense tier start at the
    /// hand-off node numbers computed by the dense counter.
    pub fn approx_count(
        &self,
        iter_left: &SparseIter<'_>,
        iter_right: &SparseIter<'_>,
        out_node_num_left: u32,
        out_node_num_right: u32,
    ) -> u64 {
        let n_levels = self.num_levels() as usize;
        if n_levels == 0 || self.labels.len() == 0 {
            return 0;
        }

        let mut left_list: Vec<u32> = iter_left.pos_in_trie[..iter_left.key_len as usize].to_vec();
        let ori_left_len = left_list.len() as u32;
        self.extend_pos_list(&mut left_list, out_node_num_left);
        let mut right_list: Vec<u32> =
            iter_right.pos_in_trie[..iter_right.key_len as usize].to_vec();
        self.extend_pos_list(&mut right_list, out_node_num_right);

        let mut count = 0u64;
        for i in 0..n_levels {
            let left_pos = left_list[i];
            if left_pos == MAX_POS {
                break;
            }
            let mut right_pos = right_list[i];
            if right_pos == MAX_POS {
                right_pos = self.level_cuts[i];
            }
            if left_pos >= right_pos {
                continue;
            }

            let mut num_leaves = i64::from(right_pos - left_pos)
                - (i64::from(self.child_indicator_bits.rank1(right_pos))
                    - i64::from(self.child_indicator_bits.rank1(left_pos)));
            // Count corrections at the boundary positions themselves.
            if self.child_indicator_bits.read_bit(right_pos) {
                num_leaves += 1;
            }
            if self.child_indicator_bits.read_bit(left_pos) {
                num_leaves -= 1;
            }
            // A left-extended path enters its node at the first label; a
            // terminator there is a key inside the range that the half-open
            // window above just skipped.
            if i as u32 >= ori_left_len
                && self.labels.read(left_pos) == TERMINATOR_LABEL
                && !self.child_indicator_bits.read_bit(left_pos)
            {
                num_leaves += 1;
            }
            if ori_left_len > 0 && i as u32 + 1 == ori_left_len {
                num_leaves -= 1;
            }
            count += num_leaves.max(0) as u64;
        }
        count
    }

    // Extends a boundary path down through the sparse levels, mirroring the
    // dense extension: a child edge continues into its child node, a
    // terminal falls over to the next subtree.
    fn extend_pos_list(&self, pos_list: &mut Vec<u32>, entry_node: u32) {
        let n_levels = self.num_levels() as usize;
        if pos_list.is_empty() {
            let pos = if entry_node == MAX_POS {
                MAX_POS
            } else {
                self.node_entry_pos(entry_node, 0)
            };
            pos_list.push(pos);
        }
        while pos_list.len() < n_levels {
            let last = *pos_list.last().expect("non-empty boundary path");
            if last == MAX_POS {
                pos_list.push(MAX_POS);
                continue;
            }
            let mut node = self.child_node_num(last);
            if !self.child_indicator_bits.read_bit(last) {
                node += 1;
            }
            let pos = self.node_entry_pos(node, pos_list.len());
            pos_list.push(pos);
        }
    }

    // First label position of a node when it exists at the given local
    // level, MAX_POS otherwise.
    fn node_entry_pos(&self, node_num: u32, local_level: usize) -> u32 {
        let local_node = node_num.wrapping_sub(self.node_count_dense);
        if local_node.wrapping_add(1) > self.louds_bits.num_ones() {
            return MAX_POS;
        }
        let pos = self.first_label_pos(node_num);
        if pos > self.level_cuts[local_level] {
            return MAX_POS;
        }
        pos
    }

    fn first_label_pos(&self, node_num: u32) -> u32 {
        self.louds_bits.select1(node_num + 1 - self.node_count_dense)
    }

    fn last_label_pos(&self, node_num: u32) -> u32 {
        let next_rank = node_num + 2 - self.node_count_dense;
        if next_rank > self.louds_bits.num_ones() {
            self.labels.len() - 1
        } else {
            self.louds_bits.select1(next_rank) - 1
        }
    }

    fn node_size(&self, pos: u32) -> u32 {
        debug_assert!(self.louds_bits.read_bit(pos));
        self.louds_bits.distance_to_next_set_bit(pos)
    }

    fn child_node_num(&self, pos: u32) -> u32 {
        self.child_indicator_bits.rank1(pos) + self.child_count_dense
    }

    fn suffix_pos(&self, pos: u32) -> u32 {
        pos - self.child_indicator_bits.rank1(pos)
    }

    fn is_end_of_node(&self, pos: u32) -> bool {
        pos == self.labels.len() - 1 || self.louds_bits.read_bit(pos + 1)
    }

    pub fn iter(&self) -> SparseIter<'_> {
        SparseIter::new(self)
    }

    pub fn size_bytes(&self) -> u64 {
        self.level_cuts.len() as u64 * 4
            + self.labels.size_bytes()
            + self.child_indicator_bits.size_bytes()
            + self.louds_bits.size_bytes()
            + self.suffixes.size_bytes()
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        crate::codec::aligned(16 + 4 * self.level_cuts.len() as u64)
            + self.labels.serialized_size()
            + self.child_indicator_bits.serialized_size()
            + self.louds_bits.serialized_size()
            + self.suffixes.serialized_size()
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u32_le(self.height);
        out.write_u32_le(self.start_level);
        out.write_u32_le(self.node_count_dense);
        out.write_u32_le(self.child_count_dense);
        for &cut in &self.level_cuts {
            out.write_u32_le(cut);
        }
        out.pad_to_alignment();
        self.labels.serialize(out);
        self.child_indicator_bits.serialize(out);
        self.louds_bits.serialize(out);
        self.suffixes.serialize(out);
        out.pad_to_alignment();
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let height = input.read_u32_le()?;
        let start_level = input.read_u32_le()?;
        let node_count_dense = input.read_u32_le()?;
        let child_count_dense = input.read_u32_le()?;
        let num_levels = height.saturating_sub(start_level) as usize;
        let mut level_cuts = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            level_cuts.push(input.read_u32_le()?);
        }
        input.skip_padding()?;
        let labels = LabelVector::deserialize(input)?;
        let child_indicator_bits = RankVector::deserialize(input)?;
        let louds_bits = SelectVector::deserialize(input)?;
        let suffixes = SuffixVector::deserialize(input)?;
        input.skip_padding()?;
        Ok(SparseTrie {
            height,
            start_level,
            node_count_dense,
            child_count_dense,
            level_cuts,
            labels,
            child_indicator_bits,
            louds_bits,
            suffixes,
        })
    }
}

/// Cursor over the sparse tier. One slot of path state per sparse level,
/// plus the dense hand-off node it entered through.
#[derive(Debug, Clone)]
pub(crate) struct SparseIter<'a> {
    trie: &'a SparseTrie,
    is_valid: bool,
    start_node_num: u32,
    key_len: u32,
    key: Vec<u8>,
    pos_in_trie: Vec<u32>,
    is_at_terminator: bool,
}

impl<'a> SparseIter<'a> {
    fn new(trie: &'a SparseTrie) -> Self {
        let depth = trie.num_levels() as usize;
        SparseIter {
            trie,
            is_valid: false,
            start_node_num: trie.node_count_dense,
            key_len: 0,
            key: vec![0; depth],
            pos_in_trie: vec![0; depth],
            is_at_terminator: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn set_start_node_num(&mut self, node_num: u32) {
        self.start_node_num = node_num;
    }

    /// Key bytes accumulated in the sparse tier, terminator excluded.
    pub fn key(&self) -> &[u8] {
        if !self.is_valid {
            return &[];
        }
        let mut len = self.key_len;
        if self.is_at_terminator {
            len -= 1;
        }
        &self.key[..len as usize]
    }

    /// Real suffix bits of the current terminal: `(bits, bit_len)`.
    pub fn suffix(&self) -> (u64, u32) {
        if self.is_valid
            && matches!(self.trie.suffixes.kind(), SuffixKind::Real | SuffixKind::Mixed)
        {
            let pos = self.pos_in_trie[self.key_len as usize - 1];
            let suffix_pos = self.trie.suffix_pos(pos);
            (self.trie.suffixes.read_real(suffix_pos), self.trie.suffixes.real_len())
        } else {
            (0, 0)
        }
    }

    pub fn compare(&self, key: &[u8]) -> KeyCompare {
        let start = self.trie.start_level as usize;
        if self.is_at_terminator && ((self.key_len - 1) as usize) < key.len().saturating_sub(start)
        {
            return KeyCompare::Less;
        }
        let iter_key = self.key();
        let key_sparse = &key[start.min(key.len())..];
        let key_trimmed = &key_sparse[..key_sparse.len().min(iter_key.len())];
        match iter_key.cmp(key_trimmed) {
            std::cmp::Ordering::Less => KeyCompare::Less,
            std::cmp::Ordering::Greater => KeyCompare::Greater,
            std::cmp::Ordering::Equal => {
                let pos = self.pos_in_trie[self.key_len as usize - 1];
                let suffix_pos = self.trie.suffix_pos(pos);
                self.trie
                    .suffixes
                    .compare(suffix_pos, key, self.trie.start_level + self.key_len)
            }
        }
    }

    fn append(&mut self, pos: u32) {
        self.append_with_label(self.trie.labels.read(pos), pos);
    }

    fn append_with_label(&mut self, label: u8, pos: u32) {
        self.key[self.key_len as usize] = label;
        self.pos_in_trie[self.key_len as usize] = pos;
        self.key_len += 1;
    }

    fn set(&mut self, level: u32, pos: u32) {
        self.key[level as usize] = self.trie.labels.read(pos);
        self.pos_in_trie[level as usize] = pos;
    }

    pub fn set_to_first_label_in_root(&mut self) {
        debug_assert_eq!(self.trie.start_level, 0);
        self.pos_in_trie[0] = 0;
        self.key[0] = self.trie.labels.read(0);
    }

    pub fn set_to_last_label_in_root(&mut self) {
        debug_assert_eq!(self.trie.start_level, 0);
        let pos = self.trie.last_label_pos(self.trie.node_count_dense);
        self.pos_in_trie[0] = pos;
        self.key[0] = self.trie.labels.read(pos);
    }

    pub fn move_to_leftmost_key(&mut self) {
        if self.trie.labels.len() == 0 {
            self.is_valid = false;
            return;
        }
        if self.key_len == 0 {
            let pos = self.trie.first_label_pos(self.start_node_num);
            self.append(pos);
        }
        let mut pos = self.pos_in_trie[self.key_len as usize - 1];
        loop {
            if !self.trie.child_indicator_bits.read_bit(pos) {
                if self.trie.labels.read(pos) == TERMINATOR_LABEL && !self.trie.is_end_of_node(pos)
                {
                    self.is_at_terminator = true;
                }
                self.is_valid = true;
                return;
            }
            let node_num = self.trie.child_node_num(pos);
            pos = self.trie.first_label_pos(node_num);
            self.append(pos);
        }
    }

    pub fn move_to_rightmost_key(&mut self) {
        if self.trie.labels.len() == 0 {
            self.is_valid = false;
            return;
        }
        if self.key_len == 0 {
            let pos = self.trie.last_label_pos(self.start_node_num);
            self.append(pos);
        }
        let mut pos = self.pos_in_trie[self.key_len as usize - 1];
        loop {
            if !self.trie.child_indicator_bits.read_bit(pos) {
                if self.trie.labels.read(pos) == TERMINATOR_LABEL && !self.trie.is_end_of_node(pos)
                {
                    self.is_at_terminator = true;
                }
                self.is_valid = true;
                return;
            }
            let node_num = self.trie.child_node_num(pos);
            pos = self.trie.last_label_pos(node_num);
            self.append(pos);
        }
    }

    /// Advances to the next terminal; invalidates when the subtree under the
    /// start node is exhausted.
    pub fn increment(&mut self) {
        if self.key_len == 0 {
            self.is_valid = false;
            return;
        }
        self.is_at_terminator = false;
        let mut pos = self.pos_in_trie[self.key_len as usize - 1] + 1;
        // A node boundary means this node is exhausted; pop a level.
        while pos >= self.trie.labels.len() || self.trie.louds_bits.read_bit(pos) {
            self.key_len -= 1;
            if self.key_len == 0 {
                self.is_valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len as usize - 1] + 1;
        }
        self.set(self.key_len - 1, pos);
        self.move_to_leftmost_key()
    }

    /// Steps back to the previous terminal.
    pub fn decrement(&mut self) {
        if self.key_len == 0 {
            self.is_valid = false;
            return;
        }
        self.is_at_terminator = false;
        let mut pos = self.pos_in_trie[self.key_len as usize - 1];
        if pos == 0 {
            self.is_valid = false;
            return;
        }
        // The first label of a node has no left sibling; pop a level.
        while self.trie.louds_bits.read_bit(pos) {
            self.key_len -= 1;
            if self.key_len == 0 {
                self.is_valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len as usize - 1];
            if pos == 0 {
                self.is_valid = false;
                return;
            }
        }
        self.set(self.key_len - 1, pos - 1);
        self.move_to_rightmost_key()
    }
}
