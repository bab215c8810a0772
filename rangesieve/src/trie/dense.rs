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

//! Dense (bitmap-encoded) upper tier of the trie.
//!
//! Each node occupies one 256-bit block in the label bitmap and one in the
//! child-indicator bitmap, plus a single prefix-key bit. Child node numbers
//! come from an inclusive rank over the child-indicator bitmap, which
//! numbers nodes consecutively in level order with the root as node 0.

use std::io;

use super::builder::TrieBuilder;
use super::MAX_POS;
use super::NODE_FANOUT;
use crate::bitvec::Bitvector;
use crate::bitvec::RankVector;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::suffix::KeyCompare;
use crate::suffix::SuffixKind;
use crate::suffix::SuffixVector;

/// Result of a dense-tier point lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DenseLookup {
    /// The key cannot be in the filter.
    Miss,
    /// The key matched a terminal (modulo its suffix check).
    Hit,
    /// The search survived every dense level; continue in the sparse tier
    /// from this node number.
    Continue(u32),
}

/// The dense tier: levels `0..height` of the trie as 256-bit blocks.
#[derive(Debug)]
pub(crate) struct DenseTrie {
    height: u32,
    level_cuts: Vec<u32>,
    label_bitmaps: RankVector,
    child_indicator_bitmaps: RankVector,
    prefixkey_indicator_bits: RankVector,
    suffixes: SuffixVector,
}

impl DenseTrie {
    pub fn from_builder(builder: &TrieBuilder) -> Self {
        let height = builder.sparse_start_level();
        let num_bits_per_level: Vec<u32> = (0..height as usize)
            .map(|level| builder.node_counts()[level] * NODE_FANOUT)
            .collect();

        let mut level_cuts = Vec::with_capacity(height as usize);
        let mut bit_count = 0u32;
        for &bits in &num_bits_per_level {
            bit_count += bits;
            level_cuts.push(bit_count.wrapping_sub(1));
        }

        let end = height as usize;
        let label_bitmaps = RankVector::new(Bitvector::from_level_bits(
            builder.bitmap_labels(),
            &num_bits_per_level,
            0,
            end,
        ));
        let child_indicator_bitmaps = RankVector::new(Bitvector::from_level_bits(
            builder.bitmap_child_indicators(),
            &num_bits_per_level,
            0,
            end,
        ));
        let prefixkey_indicator_bits = RankVector::new(Bitvector::from_level_bits(
            builder.prefixkey_indicator_bits(),
            &builder.node_counts()[..end],
            0,
            end,
        ));

        let suffixes = if builder.suffix_kind() == SuffixKind::None {
            SuffixVector::empty()
        } else {
            let slot_len = builder.hash_suffix_len() + builder.real_suffix_len();
            let suffix_bits_per_level: Vec<u32> = (0..end)
                .map(|level| builder.suffix_counts()[level] * slot_len)
                .collect();
            SuffixVector::from_level_bits(
                builder.suffix_kind(),
                builder.hash_suffix_len(),
                builder.real_suffix_len(),
                builder.suffix_bits(),
                &suffix_bits_per_level,
                0,
                end,
            )
        };

        DenseTrie {
            height,
            level_cuts,
            label_bitmaps,
            child_indicator_bitmaps,
            prefixkey_indicator_bits,
            suffixes,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Descends the dense levels byte by byte.
    pub fn lookup_key(&self, key: &[u8]) -> DenseLookup {
        let mut node_num = 0u32;
        for level in 0..self.height {
            let mut pos = node_num * NODE_FANOUT;
            if level as usize >= key.len() {
                // Out of search-key bytes; only a prefix-key can match.
                if self.prefixkey_indicator_bits.read_bit(node_num) {
                    let suffix_pos = self.suffix_pos(pos, true);
                    return if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                        DenseLookup::Hit
                    } else {
                        DenseLookup::Miss
                    };
                }
                return DenseLookup::Miss;
            }
            pos += u32::from(key[level as usize]);

            if !self.label_bitmaps.read_bit(pos) {
                return DenseLookup::Miss;
            }
            if !self.child_indicator_bitmaps.read_bit(pos) {
                let suffix_pos = self.suffix_pos(pos, false);
                return if self.suffixes.check_equality(suffix_pos, key, level + 1) {
                    DenseLookup::Hit
                } else {
                    DenseLookup::Miss
                };
            }
            node_num = self.child_node_num(pos);
        }
        DenseLookup::Continue(node_num)
    }

    /// Positions `iter` at the smallest stored prefix not less than `key`,
    /// conservatively: an exclusive seek may still park on a prefix whose
    /// suffix cannot rule the key out. The return value is the
    /// could-be-false-positive flag.
    pub fn move_to_key_greater_than(
        &self,
        key: &[u8],
        _inclusive: bool,
        iter: &mut DenseIter<'_>,
    ) -> bool {
        let mut node_num = 0u32;
        for level in 0..self.height {
            let pos = node_num * NODE_FANOUT;
            if level as usize >= key.len() {
                // Out of search-key bytes; everything below this node is
                // greater than the key.
                iter.append(self.label_bitmaps.next_set_bit(pos));
                iter.set_flags(true, true, true, true);
                if self.prefixkey_indicator_bits.read_bit(node_num) {
                    iter.is_at_prefix_key = true;
                } else {
                    iter.move_to_leftmost_key();
                }
                return true;
            }

            let pos = pos + u32::from(key[level as usize]);
            iter.append(pos);

            if !self.label_bitmaps.read_bit(pos) {
                iter.increment();
                return false;
            }
            if !self.child_indicator_bitmaps.read_bit(pos) {
                return self.compare_suffix_greater_than(pos, key, level + 1, iter);
            }
            node_num = self.child_node_num(pos);
        }

        // The search continues in the sparse tier.
        iter.send_out_node_num = node_num;
        iter.set_flags(true, false, true, true);
        true
    }

    fn compare_suffix_greater_than(
        &self,
        pos: u32,
        key: &[u8],
        level: u32,
        iter: &mut DenseIter<'_>,
    ) -> bool {
        let suffix_pos = self.suffix_pos(pos, false);
        let compare = self.suffixes.compare(suffix_pos, key, level);
        if compare == KeyCompare::Less {
            iter.increment();
            return false;
        }
        iter.set_flags(true, true, true, true);
        true
    }

    // Extends a boundary path down to the dense bottom: a child edge
    // continues into its child node, a terminal falls over to the next
    // subtree. Returns the node number where the path leaves the dense tier
    // (MAX_POS when it ran off the right edge).
    fn extend_pos_list(&self, pos_list: &mut Vec<u32>) -> u32 {
        let mut pos = *pos_list.last().expect("non-empty boundary path");
        for level in pos_list.len() as u32..self.height {
            let mut node_num = self.child_node_num(pos);
            if !self.child_indicator_bitmaps.read_bit(pos) {
                node_num += 1;
            }
            pos = node_num * NODE_FANOUT;
            if pos > self.level_cuts[level as usize] {
                pos = MAX_POS;
                pos_list.push(pos);
                break;
            }
            pos_list.push(pos);
        }
        if pos == MAX_POS {
            while (pos_list.len() as u32) < self.height {
                pos_list.push(MAX_POS);
            }
            MAX_POS
        } else {
            let mut out = self.child_node_num(pos);
            if !self.child_indicator_bitmaps.read_bit(pos) {
                out += 1;
            }
            out
        }
    }

    /// Counts terminals between the two iterator paths across the dense
    /// levels. Returns the count plus the node numbers where each boundary
    /// path crosses into the sparse tier.
    pub fn approx_count(&self, iter_left: &DenseIter<'_>, iter_right: &DenseIter<'_>) -> (u64, u32, u32) {
        if self.height == 0 {
            return (0, 0, 0);
        }

        let mut left_list: Vec<u32> = iter_left.pos_in_trie[..iter_left.key_len as usize].to_vec();
        let ori_left_len = left_list.len() as u32;
        let out_left = if left_list.is_empty() {
            0
        } else {
            self.extend_pos_list(&mut left_list)
        };

        let mut right_list: Vec<u32> = iter_right.pos_in_trie[..iter_right.key_len as usize].to_vec();
        let ori_right_len = right_list.len() as u32;
        let out_right = if right_list.is_empty() {
            0
        } else {
            self.extend_pos_list(&mut right_list)
        };

        if left_list.is_empty() || right_list.is_empty() {
            return (0, out_left, out_right);
        }

        let last_cut = self.level_cuts[self.height as usize - 1];
        let mut count = 0u64;
        for level in 0..self.height {
            let i = level as usize;
            let mut left_pos = left_list[i];
            if left_pos == MAX_POS {
                break;
            }
            if level + 1 == ori_left_len && iter_left.is_at_prefix_key {
                left_pos = (left_pos / NODE_FANOUT) * NODE_FANOUT;
            }
            let mut right_pos = right_list[i];
            if right_pos == MAX_POS {
                right_pos = self.level_cuts[i];
            }
            if level + 1 == ori_right_len && iter_right.is_at_prefix_key {
                right_pos = (right_pos / NODE_FANOUT) * NODE_FANOUT;
            }
            if left_pos >= right_pos {
                continue;
            }

            if level >= ori_left_len {
                left_pos = self.next_pos(left_pos);
            }
            if level >= ori_right_len && right_pos != last_cut {
                right_pos = self.next_pos(right_pos);
            }

            let has_prefix_key_left = self.prefixkey_indicator_bits.read_bit(left_pos / NODE_FANOUT);
            let has_prefix_key_right =
                self.prefixkey_indicator_bits.read_bit(right_pos / NODE_FANOUT);

            let mut rank_right_label = self.label_bitmaps.rank1(right_pos);
            if right_pos == last_cut {
                rank_right_label += 1;
            }
            let rank_left_label = self.label_bitmaps.rank1(left_pos);
            let rank_left_ind = self.child_indicator_bitmaps.rank1(left_pos);
            let rank_right_ind = self.child_indicator_bitmaps.rank1(right_pos);
            let rank_left_prefix = self.prefixkey_indicator_bits.rank1(left_pos / NODE_FANOUT);
            let rank_right_prefix = self.prefixkey_indicator_bits.rank1(right_pos / NODE_FANOUT);

            let mut num_leaves = i64::from(rank_right_label) - i64::from(rank_left_label)
                - (i64::from(rank_right_ind) - i64::from(rank_left_ind))
                + (i64::from(rank_right_prefix) - i64::from(rank_left_prefix));
            // Count corrections at the boundary positions themselves.
            if self.child_indicator_bitmaps.read_bit(right_pos) {
                num_leaves += 1;
            }
            if self.child_indicator_bitmaps.read_bit(left_pos) {
                num_leaves -= 1;
            }
            if level >= ori_right_len && has_prefix_key_right {
                num_leaves -= 1;
            }
            if level >= ori_left_len && has_prefix_key_left {
                num_leaves += 1;
            }
            if iter_left.is_search_complete && level + 1 == ori_left_len {
                num_leaves -= 1;
            }
            count += num_leaves.max(0) as u64;
        }
        (count, out_left, out_right)
    }

    fn child_node_num(&self, pos: u32) -> u32 {
        self.child_indicator_bitmaps.rank1(pos)
    }

    fn suffix_pos(&self, pos: u32, is_prefix_key: bool) -> u32 {
        let node_num = pos / NODE_FANOUT;
        let mut suffix_pos = self.label_bitmaps.rank1(pos) - self.child_indicator_bitmaps.rank1(pos)
            + self.prefixkey_indicator_bits.rank1(node_num)
            - 1;
        // A prefix-key slot sits before the node's label terminals; back off
        // the label terminal the rank just counted at this position.
        if is_prefix_key
            && self.label_bitmaps.read_bit(pos)
            && !self.child_indicator_bitmaps.read_bit(pos)
        {
            suffix_pos -= 1;
        }
        suffix_pos
    }

    fn next_pos(&self, pos: u32) -> u32 {
        pos + self.label_bitmaps.distance_to_next_set_bit(pos)
    }

    fn prev_pos(&self, pos: u32) -> Option<u32> {
        let distance = self.label_bitmaps.distance_to_prev_set_bit(pos);
        if distance > pos {
            return None;
        }
        Some(pos - distance)
    }

    pub fn iter(&self) -> DenseIter<'_> {
        DenseIter::new(self)
    }

    pub fn size_bytes(&self) -> u64 {
        self.level_cuts.len() as u64 * 4
            + self.label_bitmaps.size_bytes()
            + self.child_indicator_bitmaps.size_bytes()
            + self.prefixkey_indicator_bits.size_bytes()
            + self.suffixes.size_bytes()
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        crate::codec::aligned(4 + 4 * u64::from(self.height))
            + self.label_bitmaps.serialized_size()
            + self.child_indicator_bitmaps.serialized_size()
            + self.prefixkey_indicator_bits.serialized_size()
            + self.suffixes.serialized_size()
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u32_le(self.height);
        for &cut in &self.level_cuts {
            out.write_u32_le(cut);
        }
        out.pad_to_alignment();
        self.label_bitmaps.serialize(out);
        self.child_indicator_bitmaps.serialize(out);
        self.prefixkey_indicator_bits.serialize(out);
        self.suffixes.serialize(out);
        out.pad_to_alignment();
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let height = input.read_u32_le()?;
        let mut level_cuts = Vec::with_capacity(height as usize);
        for _ in 0..height {
            level_cuts.push(input.read_u32_le()?);
        }
        input.skip_padding()?;
        let label_bitmaps = RankVector::deserialize(input)?;
        let child_indicator_bitmaps = RankVector::deserialize(input)?;
        let prefixkey_indicator_bits = RankVector::deserialize(input)?;
        let suffixes = SuffixVector::deserialize(input)?;
        input.skip_padding()?;
        Ok(DenseTrie {
            height,
            level_cuts,
            label_bitmaps,
            child_indicator_bitmaps,
            prefixkey_indicator_bits,
            suffixes,
        })
    }
}

/// Cursor over the dense tier.
///
/// Valid means the cursor points at a stored terminal or at a full-height
/// dense prefix whose continuation lives in the sparse tier. The three
/// completeness flags tell the composed iterator which sparse continuation
/// to run.
#[derive(Debug, Clone)]
pub(crate) struct DenseIter<'a> {
    trie: &'a DenseTrie,
    is_valid: bool,
    is_search_complete: bool,
    is_move_left_complete: bool,
    is_move_right_complete: bool,
    send_out_node_num: u32,
    key_len: u32,
    key: Vec<u8>,
    pos_in_trie: Vec<u32>,
    is_at_prefix_key: bool,
}

impl<'a> DenseIter<'a> {
    fn new(trie: &'a DenseTrie) -> Self {
        DenseIter {
            trie,
            is_valid: false,
            is_search_complete: false,
            is_move_left_complete: false,
            is_move_right_complete: false,
            send_out_node_num: 0,
            key_len: 0,
            key: vec![0; trie.height as usize],
            pos_in_trie: vec![0; trie.height as usize],
            is_at_prefix_key: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn is_search_complete(&self) -> bool {
        self.is_search_complete
    }

    pub fn is_move_left_complete(&self) -> bool {
        self.is_move_left_complete
    }

    pub fn is_move_right_complete(&self) -> bool {
        self.is_move_right_complete
    }

    /// Whether the cursor needs no sparse continuation at all.
    pub fn is_complete(&self) -> bool {
        self.is_search_complete && self.is_move_left_complete && self.is_move_right_complete
    }

    pub fn send_out_node_num(&self) -> u32 {
        self.send_out_node_num
    }

    /// Key bytes accumulated in the dense tier, prefix-key slot excluded.
    pub fn key(&self) -> &[u8] {
        if !self.is_valid {
            return &[];
        }
        let mut len = self.key_len;
        if self.is_at_prefix_key {
            len -= 1;
        }
        &self.key[..len as usize]
    }

    /// Real suffix bits of the current terminal: `(bits, bit_len)`.
    pub fn suffix(&self) -> (u64, u32) {
        if self.is_complete()
            && matches!(self.trie.suffixes.kind(), SuffixKind::Real | SuffixKind::Mixed)
        {
            let pos = self.pos_in_trie[self.key_len as usize - 1];
            let suffix_pos = self.trie.suffix_pos(pos, self.is_at_prefix_key);
            (self.trie.suffixes.read_real(suffix_pos), self.trie.suffixes.real_len())
        } else {
            (0, 0)
        }
    }

    pub fn compare(&self, key: &[u8]) -> KeyCompare {
        if self.is_at_prefix_key && ((self.key_len - 1) as usize) < key.len() {
            return KeyCompare::Less;
        }
        let iter_key = self.key();
        let key_dense = &key[..key.len().min(iter_key.len())];
        match iter_key.cmp(key_dense) {
            std::cmp::Ordering::Less => KeyCompare::Less,
            std::cmp::Ordering::Greater => KeyCompare::Greater,
            std::cmp::Ordering::Equal => {
                if self.is_complete() {
                    let pos = self.pos_in_trie[self.key_len as usize - 1];
                    let suffix_pos = self.trie.suffix_pos(pos, self.is_at_prefix_key);
                    self.trie.suffixes.compare(suffix_pos, key, self.key_len)
                } else {
                    KeyCompare::Equal
                }
            }
        }
    }

    fn append(&mut self, pos: u32) {
        self.key[self.key_len as usize] = (pos % NODE_FANOUT) as u8;
        self.pos_in_trie[self.key_len as usize] = pos;
        self.key_len += 1;
    }

    fn set(&mut self, level: u32, pos: u32) {
        self.key[level as usize] = (pos % NODE_FANOUT) as u8;
        self.pos_in_trie[level as usize] = pos;
    }

    fn set_flags(
        &mut self,
        is_valid: bool,
        is_search_complete: bool,
        is_move_left_complete: bool,
        is_move_right_complete: bool,
    ) {
        self.is_valid = is_valid;
        self.is_search_complete = is_search_complete;
        self.is_move_left_complete = is_move_left_complete;
        self.is_move_right_complete = is_move_right_complete;
    }

    pub fn set_to_first_label_in_root(&mut self) {
        self.pos_in_trie[0] = self.trie.label_bitmaps.next_set_bit(0);
        self.key[0] = self.pos_in_trie[0] as u8;
        self.key_len += 1;
    }

    pub fn set_to_last_label_in_root(&mut self) {
        if let Some(pos) = self.trie.prev_pos(NODE_FANOUT) {
            self.pos_in_trie[0] = pos;
            self.key[0] = pos as u8;
            self.key_len += 1;
        } else {
            self.is_valid = false;
        }
    }

    pub fn move_to_leftmost_key(&mut self) {
        debug_assert!(self.key_len > 0);
        let mut level = self.key_len - 1;
        let mut pos = self.pos_in_trie[level as usize];
        if !self.trie.child_indicator_bitmaps.read_bit(pos) {
            return self.set_flags(true, true, true, true);
        }

        while level < self.trie.height - 1 {
            let node_num = self.trie.child_node_num(pos);
            if self.trie.prefixkey_indicator_bits.read_bit(node_num) {
                self.append(self.trie.label_bitmaps.next_set_bit(node_num * NODE_FANOUT));
                self.is_at_prefix_key = true;
                return self.set_flags(true, true, true, true);
            }

            pos = self.trie.label_bitmaps.next_set_bit(node_num * NODE_FANOUT);
            self.append(pos);

            if !self.trie.child_indicator_bitmaps.read_bit(pos) {
                return self.set_flags(true, true, true, true);
            }
            level += 1;
        }
        self.send_out_node_num = self.trie.child_node_num(pos);
        self.set_flags(true, true, false, true);
    }

    pub fn move_to_rightmost_key(&mut self) {
        debug_assert!(self.key_len > 0);
        let mut level = self.key_len - 1;
        let mut pos = self.pos_in_trie[level as usize];
        if !self.trie.child_indicator_bitmaps.read_bit(pos) {
            return self.set_flags(true, true, true, true);
        }

        while level < self.trie.height - 1 {
            let node_num = self.trie.child_node_num(pos);
            match self.trie.prev_pos((node_num + 1) * NODE_FANOUT) {
                Some(prev) => pos = prev,
                None => {
                    self.is_valid = false;
                    return;
                }
            }
            self.append(pos);

            if !self.trie.child_indicator_bitmaps.read_bit(pos) {
                return self.set_flags(true, true, true, true);
            }
            level += 1;
        }
        self.send_out_node_num = self.trie.child_node_num(pos);
        self.set_flags(true, true, true, false);
    }

    /// Advances to the next stored prefix; invalidates past the last one.
    pub fn increment(&mut self) {
        if self.key_len == 0 {
            self.is_valid = false;
            return;
        }
        if self.is_at_prefix_key {
            self.is_at_prefix_key = false;
            return self.move_to_leftmost_key();
        }
        let mut pos = self.pos_in_trie[self.key_len as usize - 1];
        let mut next_pos = self.trie.next_pos(pos);
        // Crossing a node boundary pops back up a level.
        while next_pos / NODE_FANOUT > pos / NODE_FANOUT {
            self.key_len -= 1;
            if self.key_len == 0 {
                self.is_valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len as usize - 1];
            next_pos = self.trie.next_pos(pos);
        }
        self.set(self.key_len - 1, next_pos);
        self.move_to_leftmost_key()
    }

    /// Steps back to the previous stored prefix, parking on a prefix-key
    /// before leaving its node upward.
    pub fn decrement(&mut self) {
        if self.key_len == 0 {
            self.is_valid = false;
            return;
        }
        if self.is_at_prefix_key {
            self.is_at_prefix_key = false;
            self.key_len -= 1;
            if self.key_len == 0 {
                self.is_valid = false;
                return;
            }
        }
        let mut pos = self.pos_in_trie[self.key_len as usize - 1];
        let mut prev = match self.trie.prev_pos(pos) {
            Some(prev) => prev,
            None => {
                self.is_valid = false;
                return;
            }
        };

        while prev / NODE_FANOUT < pos / NODE_FANOUT {
            let node_num = pos / NODE_FANOUT;
            if self.trie.prefixkey_indicator_bits.read_bit(node_num) {
                self.is_at_prefix_key = true;
                return self.set_flags(true, true, true, true);
            }

            self.key_len -= 1;
            if self.key_len == 0 {
                self.is_valid = false;
                return;
            }
            pos = self.pos_in_trie[self.key_len as usize - 1];
            prev = match self.trie.prev_pos(pos) {
                Some(p) => p,
                None => {
                    self.is_valid = false;
                    return;
                }
            };
        }
        self.set(self.key_len - 1, prev);
        self.move_to_rightmost_key()
    }

    pub(crate) fn trie_height(&self) -> u32 {
        self.trie.height
    }
}
