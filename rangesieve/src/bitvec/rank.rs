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

use std::io;

use super::Bitvector;
use super::RANK_BLOCK_BITS;
use super::WORD_BITS;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;

/// Bitvector with O(1) inclusive rank.
///
/// `rank_lut[i]` caches the popcount of the first `i * 512` bits; a query
/// adds the popcounts of the in-block words up to the queried position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RankVector {
    bits: Bitvector,
    rank_lut: Vec<u32>,
}

impl RankVector {
    pub fn new(bits: Bitvector) -> Self {
        let num_blocks = bits.num_bits().div_ceil(RANK_BLOCK_BITS) as usize;
        let words_per_block = (RANK_BLOCK_BITS / WORD_BITS) as usize;
        let mut rank_lut = Vec::with_capacity(num_blocks);
        let mut cumulative = 0u32;
        for block in 0..num_blocks {
            rank_lut.push(cumulative);
            let word_start = block * words_per_block;
            let word_end = (word_start + words_per_block).min(bits.words().len());
            for word in &bits.words()[word_start..word_end] {
                cumulative += word.count_ones();
            }
        }
        RankVector { bits, rank_lut }
    }

    /// Number of set bits in positions `[0, pos]`.
    pub fn rank1(&self, pos: u32) -> u32 {
        debug_assert!(pos < self.bits.num_bits());
        let block = pos / RANK_BLOCK_BITS;
        let mut count = self.rank_lut[block as usize];
        let block_word_start = (block * RANK_BLOCK_BITS / WORD_BITS) as usize;
        let pos_word = (pos / WORD_BITS) as usize;
        for word in &self.bits.words()[block_word_start..pos_word] {
            count += word.count_ones();
        }
        let offset = pos % WORD_BITS;
        let masked = self.bits.words()[pos_word] << (WORD_BITS - 1 - offset);
        count + masked.count_ones()
    }

    pub fn read_bit(&self, pos: u32) -> bool {
        self.bits.read_bit(pos)
    }

    pub fn num_bits(&self) -> u32 {
        self.bits.num_bits()
    }

    pub fn next_set_bit(&self, from: u32) -> u32 {
        self.bits.next_set_bit(from)
    }

    pub fn distance_to_next_set_bit(&self, pos: u32) -> u32 {
        self.bits.distance_to_next_set_bit(pos)
    }

    pub fn distance_to_prev_set_bit(&self, pos: u32) -> u32 {
        self.bits.distance_to_prev_set_bit(pos)
    }

    pub fn size_bytes(&self) -> u64 {
        self.bits.size_bytes() + self.rank_lut.len() as u64 * 4
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        let lut = crate::codec::aligned(self.rank_lut.len() as u64 * 4);
        16 + lut + self.bits.words().len() as u64 * 8
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u64_le(u64::from(self.bits.num_bits()));
        out.write_u64_le(self.rank_lut.len() as u64);
        for &entry in &self.rank_lut {
            out.write_u32_le(entry);
        }
        out.pad_to_alignment();
        out.write_words_le(self.bits.words());
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let num_bits = input.read_u64_le()? as u32;
        let num_blocks = input.read_u64_le()? as usize;
        let mut rank_lut = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            rank_lut.push(input.read_u32_le()?);
        }
        input.skip_padding()?;
        let words = input.read_words_le(num_bits.div_ceil(WORD_BITS) as usize)?;
        Ok(RankVector {
            bits: Bitvector::from_parts(num_bits, words),
            rank_lut,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Bitvector;
    use super::RankVector;

    fn from_positions(num_bits: u32, positions: &[u32]) -> RankVector {
        let mut words = vec![0u64; num_bits.div_ceil(64) as usize];
        for &pos in positions {
            words[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
        RankVector::new(Bitvector::from_level_bits(&[words], &[num_bits], 0, 1))
    }

    #[test]
    fn test_rank_matches_scan() {
        let positions = [0, 1, 63, 64, 511, 512, 700, 1023];
        let rv = from_positions(1024, &positions);
        let mut expected = 0;
        let mut iter = positions.iter().peekable();
        for pos in 0..1024u32 {
            if iter.peek() == Some(&&pos) {
                expected += 1;
                iter.next();
            }
            assert_eq!(rv.rank1(pos), expected, "rank at {pos}");
        }
    }

    #[test]
    fn test_rank_select_duality() {
        let positions = [3, 70, 500, 513, 900];
        let rv = from_positions(1000, &positions);
        for pos in 0..1000u32 {
            let next = rv.next_set_bit(pos);
            if next < 1000 {
                let k = rv.rank1(pos) + if rv.read_bit(pos) { 0 } else { 1 };
                assert_eq!(positions[(k - 1) as usize], next);
            }
        }
    }
}
