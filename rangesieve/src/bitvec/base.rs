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

use super::WORD_BITS;

/// A packed, immutable bit array.
///
/// Built by concatenating per-level bit runs produced by the trie builder.
/// Levels rarely end on a word boundary, so concatenation shifts each run
/// into place bit-exactly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bitvector {
    num_bits: u32,
    words: Vec<u64>,
}

impl Bitvector {
    /// Concatenates the bit runs of levels `start..end` into one packed
    /// array. `bits_per_level[l]` gives the number of valid bits in
    /// `levels[l]`; trailing bits of the last word of each run are ignored.
    pub fn from_level_bits(
        levels: &[Vec<u64>],
        bits_per_level: &[u32],
        start: usize,
        end: usize,
    ) -> Self {
        let total: u32 = bits_per_level[start..end].iter().sum();
        let mut vector = Bitvector {
            num_bits: 0,
            words: Vec::with_capacity(total.div_ceil(WORD_BITS) as usize),
        };
        for level in start..end {
            let mut remaining = bits_per_level[level];
            let mut word_idx = 0;
            while remaining > 0 {
                let take = remaining.min(WORD_BITS);
                vector.push_bits(levels[level][word_idx], take);
                word_idx += 1;
                remaining -= take;
            }
        }
        vector
    }

    /// Reassembles a bitvector from deserialized parts.
    pub fn from_parts(num_bits: u32, words: Vec<u64>) -> Self {
        Bitvector { num_bits, words }
    }

    fn push_bits(&mut self, word: u64, nbits: u32) {
        let word = if nbits == WORD_BITS {
            word
        } else {
            word & ((1u64 << nbits) - 1)
        };
        let offset = self.num_bits % WORD_BITS;
        if offset == 0 {
            self.words.push(word);
        } else {
            *self.words.last_mut().unwrap() |= word << offset;
            if offset + nbits > WORD_BITS {
                self.words.push(word >> (WORD_BITS - offset));
            }
        }
        self.num_bits += nbits;
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn num_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn read_bit(&self, pos: u32) -> bool {
        debug_assert!(pos < self.num_bits);
        let word_idx = (pos / WORD_BITS) as usize;
        let offset = pos % WORD_BITS;
        (self.words[word_idx] >> offset) & 1 != 0
    }

    /// Distance from `pos` to the next set bit strictly after it. Returns
    /// `num_bits - pos` when no further bit is set, so `pos + distance` is
    /// one past the end in that case.
    pub fn distance_to_next_set_bit(&self, pos: u32) -> u32 {
        debug_assert!(pos < self.num_bits);
        let next = self.next_set_bit(pos + 1);
        next - pos
    }

    /// Distance from `pos` back to the closest set bit strictly before it.
    /// Returns `pos + 1` when no earlier bit is set, so callers can detect
    /// the out-of-bound case with `distance > pos`.
    pub fn distance_to_prev_set_bit(&self, pos: u32) -> u32 {
        if pos == 0 {
            return 1;
        }
        match self.prev_set_bit(pos - 1) {
            Some(prev) => pos - prev,
            None => pos + 1,
        }
    }

    /// Smallest set position at or after `from`; `num_bits` when none.
    pub fn next_set_bit(&self, from: u32) -> u32 {
        if from >= self.num_bits {
            return self.num_bits;
        }
        let mut word_idx = (from / WORD_BITS) as usize;
        let offset = from % WORD_BITS;
        let first = self.words[word_idx] >> offset;
        if first != 0 {
            return (from + first.trailing_zeros()).min(self.num_bits);
        }
        word_idx += 1;
        while word_idx < self.words.len() {
            let word = self.words[word_idx];
            if word != 0 {
                let pos = word_idx as u32 * WORD_BITS + word.trailing_zeros();
                return pos.min(self.num_bits);
            }
            word_idx += 1;
        }
        self.num_bits
    }

    /// Largest set position at or before `from`; `None` when none.
    pub fn prev_set_bit(&self, from: u32) -> Option<u32> {
        if self.num_bits == 0 {
            return None;
        }
        let from = from.min(self.num_bits - 1);
        let mut word_idx = (from / WORD_BITS) as usize;
        let offset = from % WORD_BITS;
        let first = self.words[word_idx] << (WORD_BITS - 1 - offset);
        if first != 0 {
            return Some(from - first.leading_zeros());
        }
        while word_idx > 0 {
            word_idx -= 1;
            let word = self.words[word_idx];
            if word != 0 {
                return Some(word_idx as u32 * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros()));
            }
        }
        None
    }

    /// Heap bytes held by the packed words.
    pub fn size_bytes(&self) -> u64 {
        self.words.len() as u64 * 8
    }
}

#[cfg(test)]
mod tests {
    use super::Bitvector;

    fn from_positions(num_bits: u32, positions: &[u32]) -> Bitvector {
        let mut words = vec![0u64; num_bits.div_ceil(64) as usize];
        for &pos in positions {
            words[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
        Bitvector::from_level_bits(&[words], &[num_bits], 0, 1)
    }

    #[test]
    fn test_read_bit() {
        let bv = from_positions(130, &[0, 63, 64, 129]);
        assert!(bv.read_bit(0));
        assert!(!bv.read_bit(1));
        assert!(bv.read_bit(63));
        assert!(bv.read_bit(64));
        assert!(bv.read_bit(129));
    }

    #[test]
    fn test_level_concatenation_shifts() {
        // 3 bits [1,0,1] then 2 bits [1,1] must pack to 1,0,1,1,1.
        let bv = Bitvector::from_level_bits(&[vec![0b101u64], vec![0b11u64]], &[3, 2], 0, 2);
        assert_eq!(bv.num_bits(), 5);
        let expected = [true, false, true, true, true];
        for (pos, &bit) in expected.iter().enumerate() {
            assert_eq!(bv.read_bit(pos as u32), bit, "position {pos}");
        }
    }

    #[test]
    fn test_next_and_prev_scans() {
        let bv = from_positions(200, &[5, 70, 199]);
        assert_eq!(bv.next_set_bit(0), 5);
        assert_eq!(bv.next_set_bit(5), 5);
        assert_eq!(bv.next_set_bit(6), 70);
        assert_eq!(bv.next_set_bit(71), 199);
        assert_eq!(bv.distance_to_next_set_bit(5), 65);
        assert_eq!(bv.prev_set_bit(199), Some(199));
        assert_eq!(bv.prev_set_bit(198), Some(70));
        assert_eq!(bv.prev_set_bit(4), None);
        assert_eq!(bv.distance_to_prev_set_bit(70), 65);
        assert!(bv.distance_to_prev_set_bit(5) > 5);
    }
}
