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

//! Packed bitvectors with rank and select support.
//!
//! Bits are stored lsb-first in 64-bit words: bit index `i` lives in word
//! `i / 64` at in-word offset `i % 64`. [`RankVector`] layers a cumulative
//! popcount lookup table over the raw bits for O(1) rank; [`SelectVector`]
//! layers sampled select positions resolved by in-word broadword search.

mod base;
mod rank;
mod select;

pub(crate) use self::base::Bitvector;
pub(crate) use self::rank::RankVector;
pub(crate) use self::select::SelectVector;

/// Bits per storage word.
pub(crate) const WORD_BITS: u32 = 64;

/// Rank basic block size in bits.
pub(crate) const RANK_BLOCK_BITS: u32 = 512;

/// One select sample is kept per this many 1-bits.
pub(crate) const SELECT_SAMPLE_INTERVAL: u32 = 64;

/// Returns the position (from the least significant end) of the `k`-th set
/// bit of `word`, `k` being 1-indexed. The bit must exist.
///
/// Broadword-style search: halve the candidate span by popcount until a
/// single bit remains.
pub(crate) fn select_in_word(word: u64, k: u32) -> u32 {
    debug_assert!(k >= 1 && k <= word.count_ones());
    let mut w = word;
    let mut remaining = k;
    let mut base = 0u32;
    let mut width = 32u32;
    while width > 0 {
        let low = w & ((1u64 << width) - 1);
        let ones = low.count_ones();
        if remaining > ones {
            remaining -= ones;
            w >>= width;
            base += width;
        } else {
            w = low;
        }
        width >>= 1;
    }
    base
}

#[cfg(test)]
mod tests {
    use super::select_in_word;

    #[test]
    fn test_select_in_word() {
        assert_eq!(select_in_word(0b1, 1), 0);
        assert_eq!(select_in_word(0b1000, 1), 3);
        assert_eq!(select_in_word(0b1010_1010, 3), 5);
        assert_eq!(select_in_word(u64::MAX, 64), 63);
        assert_eq!(select_in_word(1u64 << 63, 1), 63);
    }
}
