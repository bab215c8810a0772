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

use super::NODE_FANOUT;
use super::TERMINATOR_LABEL;
use crate::bitvec::WORD_BITS;
use crate::suffix::SuffixKind;
use crate::suffix::SuffixVector;

/// Incremental trie builder over sorted keys.
///
/// A key's bytes cannot be emitted until its successor is known, so each
/// insert materializes the *previous* key: its stored path extends one byte
/// past the point where it diverges from its neighbors, or ends in a
/// terminator label when it is a proper prefix of the successor; the rest of
/// the key goes to its suffix slot. `finalize` closes the trailing key,
/// picks the dense/sparse split and re-encodes the upper levels as 256-bit
/// blocks.
#[derive(Debug)]
pub(crate) struct TrieBuilder {
    include_dense: bool,
    sparse_dense_ratio: u32,
    suffix_kind: SuffixKind,
    hash_suffix_len: u32,
    real_suffix_len: u32,

    labels: Vec<Vec<u8>>,
    child_indicator_bits: Vec<Vec<u64>>,
    louds_bits: Vec<Vec<u64>>,
    suffix_bits: Vec<Vec<u64>>,
    suffix_counts: Vec<u32>,
    node_counts: Vec<u32>,
    is_last_item_terminator: Vec<bool>,

    last_key: Vec<u8>,
    has_last: bool,
    num_keys: u64,

    bitmap_labels: Vec<Vec<u64>>,
    bitmap_child_indicators: Vec<Vec<u64>>,
    prefixkey_indicator_bits: Vec<Vec<u64>>,
    sparse_start_level: u32,
    finalized: bool,
}

impl TrieBuilder {
    pub fn new(
        include_dense: bool,
        sparse_dense_ratio: u32,
        suffix_kind: SuffixKind,
        hash_suffix_len: u32,
        real_suffix_len: u32,
    ) -> Self {
        TrieBuilder {
            include_dense,
            sparse_dense_ratio,
            suffix_kind,
            hash_suffix_len,
            real_suffix_len,
            labels: Vec::new(),
            child_indicator_bits: Vec::new(),
            louds_bits: Vec::new(),
            suffix_bits: Vec::new(),
            suffix_counts: Vec::new(),
            node_counts: Vec::new(),
            is_last_item_terminator: Vec::new(),
            last_key: Vec::new(),
            has_last: false,
            num_keys: 0,
            bitmap_labels: Vec::new(),
            bitmap_child_indicators: Vec::new(),
            prefixkey_indicator_bits: Vec::new(),
            sparse_start_level: 0,
            finalized: false,
        }
    }

    /// Appends `key` to the trie. Keys must arrive in strictly ascending
    /// byte-lex order; an out-of-order, duplicate or empty key is rejected
    /// without touching builder state.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        if self.finalized || key.is_empty() {
            return false;
        }
        if self.has_last && key <= self.last_key.as_slice() {
            return false;
        }
        if self.has_last {
            let prev = std::mem::take(&mut self.last_key);
            self.process_key(&prev, key);
        }
        self.last_key = key.to_vec();
        self.has_last = true;
        self.num_keys += 1;
        true
    }

    /// Closes the trailing key, decides the dense cutoff and fills in the
    /// dense bitmaps. Idempotent; an empty builder finalizes to a trie that
    /// matches nothing.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        if self.has_last {
            let prev = std::mem::take(&mut self.last_key);
            self.process_key(&prev, &[]);
        }
        self.determine_cutoff_level();
        self.fill_in_dense_vectors();
        self.finalized = true;
    }

    pub fn has_keys(&self) -> bool {
        self.num_keys > 0
    }

    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn process_key(&mut self, key: &[u8], next: &[u8]) {
        let level = self.skip_common_prefix(key);
        let level = self.insert_key_bytes_until_unique(key, next, level);
        self.append_suffix(key, level as u32 - 1);
    }

    // Bytes shared with the trie tip only mark the tip's child edges.
    fn skip_common_prefix(&mut self, key: &[u8]) -> usize {
        let mut level = 0;
        while level < key.len() && self.is_char_common_prefix(key[level], level) {
            let item = self.labels[level].len() - 1;
            set_bit(&mut self.child_indicator_bits[level], item);
            level += 1;
        }
        level
    }

    fn is_char_common_prefix(&self, label: u8, level: usize) -> bool {
        level < self.tree_height()
            && !self.is_last_item_terminator[level]
            && self.labels[level].last() == Some(&label)
    }

    // Emits key bytes past the shared prefix until the stored path is one
    // byte longer than the common prefix with the successor. A key that the
    // successor extends gets a terminator label instead of a final byte.
    // Returns one past the trie level of the terminal.
    fn insert_key_bytes_until_unique(
        &mut self,
        key: &[u8],
        next: &[u8],
        start_level: usize,
    ) -> usize {
        let mut level = start_level;
        // After the common prefix, the first byte joins the previous key's
        // node.
        let is_start_of_node = self.level_is_empty(level);
        self.insert_key_byte(key[level], level, is_start_of_node, false);
        level += 1;
        if level > next.len() || key[..level] != next[..level] {
            return level;
        }
        // Every byte below opens a new node.
        while level < key.len() && level < next.len() && key[level] == next[level] {
            self.insert_key_byte(key[level], level, true, false);
            level += 1;
        }
        if level < key.len() {
            self.insert_key_byte(key[level], level, true, false);
        } else {
            self.insert_key_byte(TERMINATOR_LABEL, level, true, true);
        }
        level + 1
    }

    fn level_is_empty(&self, level: usize) -> bool {
        level >= self.labels.len() || self.labels[level].is_empty()
    }

    fn insert_key_byte(&mut self, label: u8, level: usize, is_start_of_node: bool, is_term: bool) {
        while self.labels.len() <= level {
            self.add_level();
        }
        // The byte is a child of the tip one level up.
        if level > 0 {
            let parent_item = self.labels[level - 1].len() - 1;
            set_bit(&mut self.child_indicator_bits[level - 1], parent_item);
        }
        self.labels[level].push(label);
        let item = self.labels[level].len() - 1;
        ensure_bit_capacity(&mut self.child_indicator_bits[level], item + 1);
        ensure_bit_capacity(&mut self.louds_bits[level], item + 1);
        if is_start_of_node {
            set_bit(&mut self.louds_bits[level], item);
            self.node_counts[level] += 1;
        }
        self.is_last_item_terminator[level] = is_term;
    }

    fn add_level(&mut self) {
        self.labels.push(Vec::new());
        self.child_indicator_bits.push(Vec::new());
        self.louds_bits.push(Vec::new());
        self.suffix_bits.push(Vec::new());
        self.suffix_counts.push(0);
        self.node_counts.push(0);
        self.is_last_item_terminator.push(false);
    }

    // Suffix slots are appended in terminal order: one per closed key, at
    // the level of its terminal label.
    fn append_suffix(&mut self, key: &[u8], terminal_level: u32) {
        let level = terminal_level as usize;
        debug_assert!(level < self.labels.len());
        let slot_len = self.hash_suffix_len + self.real_suffix_len;
        if self.suffix_kind != SuffixKind::None && slot_len > 0 {
            let value = SuffixVector::construct(
                self.suffix_kind,
                self.hash_suffix_len,
                self.real_suffix_len,
                key,
                terminal_level + 1,
            );
            let offset = self.suffix_counts[level] * slot_len;
            append_bits(&mut self.suffix_bits[level], offset, value, slot_len);
        }
        self.suffix_counts[level] += 1;
    }

    // Walk down while one 256-bit label block plus one child block per node
    // stays within the configured ratio of the level's sparse encoding
    // (8 bits per label plus the child and node-boundary bits).
    fn determine_cutoff_level(&mut self) {
        let mut cutoff = 0u32;
        if self.include_dense {
            while (cutoff as usize) < self.tree_height() {
                let level = cutoff as usize;
                let dense_bits = 2 * u64::from(NODE_FANOUT) * u64::from(self.node_counts[level]);
                let sparse_bits = 10 * self.labels[level].len() as u64;
                if dense_bits > u64::from(self.sparse_dense_ratio) * sparse_bits {
                    break;
                }
                cutoff += 1;
            }
        }
        self.sparse_start_level = cutoff;
    }

    fn fill_in_dense_vectors(&mut self) {
        for level in 0..self.sparse_start_level as usize {
            let nodes = self.node_counts[level] as usize;
            let block_words = (NODE_FANOUT / WORD_BITS) as usize;
            let mut bitmap_labels = vec![0u64; nodes * block_words];
            let mut bitmap_children = vec![0u64; nodes * block_words];
            let mut prefixkey_bits = vec![0u64; nodes.div_ceil(WORD_BITS as usize)];

            let mut node_num = 0usize;
            for pos in 0..self.labels[level].len() {
                if pos > 0 && read_bit(&self.louds_bits[level], pos) {
                    node_num += 1;
                }
                let label = self.labels[level][pos];
                let has_child = read_bit(&self.child_indicator_bits[level], pos);
                if label == TERMINATOR_LABEL && !has_child && read_bit(&self.louds_bits[level], pos)
                {
                    set_bit(&mut prefixkey_bits, node_num);
                } else {
                    let bit = node_num * NODE_FANOUT as usize + label as usize;
                    set_bit(&mut bitmap_labels, bit);
                    if has_child {
                        set_bit(&mut bitmap_children, bit);
                    }
                }
            }
            self.bitmap_labels.push(bitmap_labels);
            self.bitmap_child_indicators.push(bitmap_children);
            self.prefixkey_indicator_bits.push(prefixkey_bits);
        }
    }

    pub fn tree_height(&self) -> usize {
        self.labels.len()
    }

    pub fn sparse_start_level(&self) -> u32 {
        self.sparse_start_level
    }

    pub fn node_counts(&self) -> &[u32] {
        &self.node_counts
    }

    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    pub fn child_indicator_bits(&self) -> &[Vec<u64>] {
        &self.child_indicator_bits
    }

    pub fn louds_bits(&self) -> &[Vec<u64>] {
        &self.louds_bits
    }

    pub fn labels_per_level(&self) -> Vec<u32> {
        self.labels.iter().map(|l| l.len() as u32).collect()
    }

    pub fn bitmap_labels(&self) -> &[Vec<u64>] {
        &self.bitmap_labels
    }

    pub fn bitmap_child_indicators(&self) -> &[Vec<u64>] {
        &self.bitmap_child_indicators
    }

    pub fn prefixkey_indicator_bits(&self) -> &[Vec<u64>] {
        &self.prefixkey_indicator_bits
    }

    pub fn suffix_bits(&self) -> &[Vec<u64>] {
        &self.suffix_bits
    }

    pub fn suffix_counts(&self) -> &[u32] {
        &self.suffix_counts
    }

    pub fn suffix_kind(&self) -> SuffixKind {
        self.suffix_kind
    }

    pub fn hash_suffix_len(&self) -> u32 {
        self.hash_suffix_len
    }

    pub fn real_suffix_len(&self) -> u32 {
        self.real_suffix_len
    }
}

fn ensure_bit_capacity(words: &mut Vec<u64>, num_bits: usize) {
    while words.len() * (WORD_BITS as usize) < num_bits {
        words.push(0);
    }
}

fn set_bit(words: &mut [u64], idx: usize) {
    words[idx / WORD_BITS as usize] |= 1u64 << (idx % WORD_BITS as usize);
}

fn read_bit(words: &[u64], idx: usize) -> bool {
    (words[idx / WORD_BITS as usize] >> (idx % WORD_BITS as usize)) & 1 != 0
}

fn append_bits(words: &mut Vec<u64>, offset: u32, value: u64, len: u32) {
    let end = (offset + len) as usize;
    while words.len() * (WORD_BITS as usize) < end {
        words.push(0);
    }
    let word = (offset / WORD_BITS) as usize;
    let shift = offset % WORD_BITS;
    words[word] |= value << shift;
    if shift + len > WORD_BITS {
        words[word + 1] |= value >> (WORD_BITS - shift);
    }
}

#[cfg(test)]
mod tests {
    use super::TrieBuilder;
    use crate::suffix::SuffixKind;
    use crate::trie::TERMINATOR_LABEL;

    fn build(keys: &[&str]) -> TrieBuilder {
        let mut builder = TrieBuilder::new(false, 16, SuffixKind::None, 0, 0);
        for key in keys {
            assert!(builder.insert(key.as_bytes()), "insert {key}");
        }
        builder.finalize();
        builder
    }

    #[test]
    fn test_rejects_out_of_order_and_empty() {
        let mut builder = TrieBuilder::new(true, 16, SuffixKind::None, 0, 0);
        assert!(!builder.insert(b""));
        assert!(builder.insert(b"zebra"));
        assert!(!builder.insert(b"apple"));
        assert!(!builder.insert(b"zebra"));
        assert!(builder.insert(b"zoo"));
        assert_eq!(builder.num_keys(), 2);
    }

    #[test]
    fn test_paths_truncate_at_divergence() {
        // Keys diverging at their first byte store that byte only; the rest
        // of each key belongs to its suffix slot.
        let builder = build(&["apple", "banana"]);
        assert_eq!(builder.tree_height(), 1);
        assert_eq!(builder.labels()[0], b"ab".to_vec());
        assert_eq!(builder.suffix_counts(), &[2]);
    }

    #[test]
    fn test_level_vectors_for_prefix_chain() {
        let builder = build(&["a", "ab", "abc", "b", "bc"]);
        assert_eq!(builder.tree_height(), 3);
        assert_eq!(builder.labels()[0], b"ab".to_vec());
        assert_eq!(
            builder.labels()[1],
            vec![TERMINATOR_LABEL, b'b', TERMINATOR_LABEL, b'c']
        );
        assert_eq!(builder.labels()[2], vec![TERMINATOR_LABEL, b'c']);
        assert_eq!(builder.node_counts(), &[1, 2, 1]);
        // Both root labels have children; at level 1 only 'b' under "a" does.
        assert_eq!(builder.child_indicator_bits()[0][0], 0b11);
        assert_eq!(builder.child_indicator_bits()[1][0], 0b0010);
        assert_eq!(builder.louds_bits()[1][0], 0b0101);
        assert_eq!(builder.suffix_counts(), &[0, 3, 2]);
    }

    #[test]
    fn test_dense_bitmaps() {
        let mut builder = TrieBuilder::new(true, 64, SuffixKind::None, 0, 0);
        for key in ["a", "ab", "b"] {
            assert!(builder.insert(key.as_bytes()));
        }
        builder.finalize();
        assert_eq!(builder.sparse_start_level(), 2);
        // Root block: labels 'a' and 'b', child only under 'a'.
        let labels = &builder.bitmap_labels()[0];
        assert_ne!(labels[(b'a' / 64) as usize] & (1 << (b'a' % 64)), 0);
        assert_ne!(labels[(b'b' / 64) as usize] & (1 << (b'b' % 64)), 0);
        let children = &builder.bitmap_child_indicators()[0];
        assert_ne!(children[(b'a' / 64) as usize] & (1 << (b'a' % 64)), 0);
        assert_eq!(children[(b'b' / 64) as usize] & (1 << (b'b' % 64)), 0);
        // The node under "a" holds the prefix-key for "a" plus label 'b'.
        assert_eq!(builder.prefixkey_indicator_bits()[1], vec![1]);
        let level1 = &builder.bitmap_labels()[1];
        assert_ne!(level1[(b'b' / 64) as usize] & (1 << (b'b' % 64)), 0);
    }

    #[test]
    fn test_empty_finalize() {
        let mut builder = TrieBuilder::new(true, 16, SuffixKind::None, 0, 0);
        builder.finalize();
        assert!(!builder.has_keys());
        assert_eq!(builder.tree_height(), 0);
        assert_eq!(builder.sparse_start_level(), 0);
    }
}
