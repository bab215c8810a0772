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

use super::select_in_word;
use super::Bitvector;
use super::SELECT_SAMPLE_INTERVAL;
use super::WORD_BITS;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;

/// Bitvector with sampled select.
///
/// `select_lut[0]` holds the position of the first 1-bit; `select_lut[j]`
/// holds the position of the `j * 64`-th 1-bit. A query starts at the
/// sampled position and resolves the remainder with word popcounts followed
/// by an in-word broadword search.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectVector {
    bits: Bitvector,
    select_lut: Vec<u32>,
    num_ones: u32,
}

impl SelectVector {
    pub fn new(bits: Bitvector) -> Self {
        let select_lut = Self::build_lut(&bits);
        let num_ones = bits.num_ones();
        SelectVector {
            bits,
            select_lut,
            num_ones,
        }
    }

    fn build_lut(bits: &Bitvector) -> Vec<u32> {
        let mut lut = Vec::new();
        let mut sampling_target = 1u32;
        let mut cumulative = 0u32;
        for (word_idx, &word) in bits.words().iter().enumerate() {
            let ones_in_word = word.count_ones();
            while sampling_target <= cumulative + ones_in_word {
                let in_word_rank = sampling_target - cumulative;
                lut.push(word_idx as u32 * WORD_BITS + select_in_word(word, in_word_rank));
                sampling_target = if sampling_target == 1 {
                    SELECT_SAMPLE_INTERVAL
                } else {
                    sampling_target + SELECT_SAMPLE_INTERVAL
                };
            }
            cumulative += ones_in_word;
        }
        lut
    }

    /// Position of the `k`-th (1-indexed) set bit. `k` must not exceed
    /// [`num_ones`](Self::num_ones).
    pub fn select1(&self, k: u32) -> u32 {
        debug_assert!(k >= 1 && k <= self.num_ones);
        let lut_idx = (k / SELECT_SAMPLE_INTERVAL) as usize;
        let mut rank_left = k % SELECT_SAMPLE_INTERVAL;
        // The first slot stores the rank-1 position rather than rank 0.
        if lut_idx == 0 {
            rank_left -= 1;
        }
        let sampled_pos = self.select_lut[lut_idx];
        if rank_left == 0 {
            return sampled_pos;
        }

        let mut word_id = (sampled_pos / WORD_BITS) as usize;
        let mut offset = sampled_pos % WORD_BITS;
        if offset == WORD_BITS - 1 {
            word_id += 1;
            offset = 0;
        } else {
            offset += 1;
        }
        let mut word = if offset == 0 {
            self.bits.words()[word_id]
        } else {
            self.bits.words()[word_id] & !((1u64 << offset) - 1)
        };
        let mut ones_in_word = word.count_ones();
        while ones_in_word < rank_left {
            word_id += 1;
            rank_left -= ones_in_word;
            word = self.bits.words()[word_id];
            ones_in_word = word.count_ones();
        }
        word_id as u32 * WORD_BITS + select_in_word(word, rank_left)
    }

    pub fn num_ones(&self) -> u32 {
        self.num_ones
    }

    pub fn num_bits(&self) -> u32 {
        self.bits.num_bits()
    }

    pub fn read_bit(&self, pos: u32) -> bool {
        self.bits.read_bit(pos)
    }

    pub fn distance_to_next_set_bit(&self, pos: u32) -> u32 {
        self.bits.distance_to_next_set_bit(pos)
    }

    pub fn size_bytes(&self) -> u64 {
        self.bits.size_bytes() + self.select_lut.len() as u64 * 4
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        let lut = crate::codec::aligned(self.select_lut.len() as u64 * 4);
        16 + lut + self.bits.words().len() as u64 * 8
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u64_le(u64::from(self.bits.num_bits()));
        out.write_u64_le(self.select_lut.len() as u64);
        for &entry in &self.select_lut {
            out.write_u32_le(entry);
        }
        out.pad_to_alignment();
        out.write_words_le(self.bits.words());
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let num_bits = input.read_u64_le()? as u32;
        let num_samples = input.read_u64_le()? as usize;
        let mut select_lut = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            select_lut.push(input.read_u32_le()?);
        }
        input.skip_padding()?;
        let words = input.read_words_le(num_bits.div_ceil(WORD_BITS) as usize)?;
        let bits = Bitvector::from_parts(num_bits, words);
        let num_ones = bits.num_ones();
        Ok(SelectVector {
            bits,
            select_lut,
            num_ones,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Bitvector;
    use super::SelectVector;

    fn from_positions(num_bits: u32, positions: &[u32]) -> SelectVector {
        let mut words = vec![0u64; num_bits.div_ceil(64) as usize];
        for &pos in positions {
            words[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
        SelectVector::new(Bitvector::from_level_bits(&[words], &[num_bits], 0, 1))
    }

    #[test]
    fn test_select_small() {
        let sv = from_positions(300, &[0, 17, 64, 255, 299]);
        assert_eq!(sv.select1(1), 0);
        assert_eq!(sv.select1(2), 17);
        assert_eq!(sv.select1(3), 64);
        assert_eq!(sv.select1(4), 255);
        assert_eq!(sv.select1(5), 299);
    }

    #[test]
    fn test_select_across_samples() {
        // Every third bit set over 1000 bits exercises sampled slots.
        let positions: Vec<u32> = (0..1000).filter(|p| p % 3 == 0).collect();
        let sv = from_positions(1000, &positions);
        assert_eq!(sv.num_ones(), positions.len() as u32);
        for (idx, &pos) in positions.iter().enumerate() {
            assert_eq!(sv.select1(idx as u32 + 1), pos, "select {}", idx + 1);
        }
    }
}
