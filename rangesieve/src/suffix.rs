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

//! Per-terminal suffix slots.
//!
//! Each position in the trie that terminates a key owns one packed slot of
//! `hash_len + real_len` bits. The hash part stores low bits of a digest of
//! the key bytes past the stored path; the real part stores the next bits of
//! the key itself. Checking a slot trades false-positive rate for the bits
//! spent, and only the real part can order a query against the stored key.

use std::io;

use crate::bitvec::Bitvector;
use crate::bitvec::WORD_BITS;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::hash::suffix_hash;

/// Suffix encoding stored per terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixKind {
    /// No suffix bits; any key reaching a terminal matches.
    None,
    /// Low bits of a hash of the key's remaining bytes.
    Hash,
    /// The next bits of the key beyond the stored path.
    Real,
    /// Hash bits followed by real bits.
    Mixed,
}

impl SuffixKind {
    pub(crate) fn to_code(self) -> u32 {
        match self {
            SuffixKind::None => 0,
            SuffixKind::Hash => 1,
            SuffixKind::Real => 2,
            SuffixKind::Mixed => 3,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(SuffixKind::None),
            1 => Some(SuffixKind::Hash),
            2 => Some(SuffixKind::Real),
            3 => Some(SuffixKind::Mixed),
            _ => None,
        }
    }
}

/// Outcome of ordering an iterator position or suffix slot against a query
/// key.
///
/// `CouldBePositive` marks comparisons a hash suffix (or a truncated real
/// suffix) cannot decide; range queries must treat it as a conservative
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCompare {
    /// The stored key is smaller than the query.
    Less,
    /// The stored and query bytes agree exactly.
    Equal,
    /// The stored key is greater than the query.
    Greater,
    /// The suffix bits cannot rule the query out.
    CouldBePositive,
}

/// Packed suffix slots for one trie tier, in terminal enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SuffixVector {
    kind: SuffixKind,
    hash_len: u32,
    real_len: u32,
    bits: Bitvector,
}

impl SuffixVector {
    /// An empty store for the `None` kind or an empty tier.
    pub fn empty() -> Self {
        SuffixVector {
            kind: SuffixKind::None,
            hash_len: 0,
            real_len: 0,
            bits: Bitvector::from_parts(0, Vec::new()),
        }
    }

    /// Concatenates per-level suffix bit runs of levels `start..end`.
    pub fn from_level_bits(
        kind: SuffixKind,
        hash_len: u32,
        real_len: u32,
        levels: &[Vec<u64>],
        bits_per_level: &[u32],
        start: usize,
        end: usize,
    ) -> Self {
        if kind == SuffixKind::None {
            return Self::empty();
        }
        SuffixVector {
            kind,
            hash_len,
            real_len,
            bits: Bitvector::from_level_bits(levels, bits_per_level, start, end),
        }
    }

    pub fn kind(&self) -> SuffixKind {
        self.kind
    }

    pub fn real_len(&self) -> u32 {
        self.real_len
    }

    fn slot_len(&self) -> u32 {
        self.hash_len + self.real_len
    }

    fn num_slots(&self) -> u32 {
        match self.slot_len() {
            0 => 0,
            len => self.bits.num_bits() / len,
        }
    }

    /// Builds the slot value stored for `key` whose trie path consumed
    /// `level` bytes.
    pub fn construct(kind: SuffixKind, hash_len: u32, real_len: u32, key: &[u8], level: u32) -> u64 {
        let mut suffix = 0u64;
        if matches!(kind, SuffixKind::Hash | SuffixKind::Mixed) && hash_len > 0 {
            let remaining = &key[key.len().min(level as usize)..];
            suffix = suffix_hash(remaining) & low_mask(hash_len);
        }
        if matches!(kind, SuffixKind::Real | SuffixKind::Mixed) && real_len > 0 {
            suffix = if real_len == 64 {
                construct_real(key, level, real_len)
            } else {
                (suffix << real_len) | construct_real(key, level, real_len)
            };
        }
        suffix
    }

    /// Whether slot `idx` is consistent with `key` having consumed `level`
    /// bytes of trie path. False as soon as any configured part disagrees.
    pub fn check_equality(&self, idx: u32, key: &[u8], level: u32) -> bool {
        if self.kind == SuffixKind::None {
            return true;
        }
        if idx >= self.num_slots() {
            return false;
        }
        self.read(idx) == Self::construct(self.kind, self.hash_len, self.real_len, key, level)
    }

    /// Orders slot `idx` against `key` at `level` on the real bits.
    /// Hash-only and empty stores cannot order and report
    /// [`KeyCompare::CouldBePositive`], as does real-bit equality, since a
    /// truncated suffix cannot prove the full keys equal.
    pub fn compare(&self, idx: u32, key: &[u8], level: u32) -> KeyCompare {
        if idx >= self.num_slots()
            || matches!(self.kind, SuffixKind::None | SuffixKind::Hash)
            || self.real_len == 0
        {
            return KeyCompare::CouldBePositive;
        }
        let stored_real = self.read(idx) & low_mask(self.real_len);
        let query_real = construct_real(key, level, self.real_len);
        if stored_real < query_real {
            KeyCompare::Less
        } else if stored_real > query_real {
            KeyCompare::Greater
        } else {
            KeyCompare::CouldBePositive
        }
    }

    /// Raw real bits of slot `idx`, right-justified; 0 when no real part is
    /// configured.
    pub fn read_real(&self, idx: u32) -> u64 {
        if self.real_len == 0 || idx >= self.num_slots() {
            return 0;
        }
        self.read(idx) & low_mask(self.real_len)
    }

    fn read(&self, idx: u32) -> u64 {
        let len = self.slot_len();
        let start = idx * len;
        let word_idx = (start / WORD_BITS) as usize;
        let offset = start % WORD_BITS;
        let words = self.bits.words();
        let mut value = words[word_idx] >> offset;
        if offset + len > WORD_BITS {
            value |= words[word_idx + 1] << (WORD_BITS - offset);
        }
        value & low_mask(len)
    }

    pub fn size_bytes(&self) -> u64 {
        self.bits.size_bytes()
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        24 + self.bits.words().len() as u64 * 8
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u32_le(self.kind.to_code());
        out.write_u32_le(self.hash_len);
        out.write_u32_le(self.real_len);
        out.write_u32_le(0); // padding to the num_bits word
        out.write_u64_le(u64::from(self.bits.num_bits()));
        out.write_words_le(self.bits.words());
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let code = input.read_u32_le()?;
        let hash_len = input.read_u32_le()?;
        let real_len = input.read_u32_le()?;
        let _padding = input.read_u32_le()?;
        let num_bits = input.read_u64_le()? as u32;
        let words = input.read_words_le(num_bits.div_ceil(WORD_BITS) as usize)?;
        let kind = SuffixKind::from_code(code).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad suffix kind {code}"))
        })?;
        Ok(SuffixVector {
            kind,
            hash_len,
            real_len,
            bits: Bitvector::from_parts(num_bits, words),
        })
    }
}

fn low_mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Reads `len` bits of `key` starting at bit `level * 8`, earlier bits more
/// significant, zero-padded past the end of the key.
fn construct_real(key: &[u8], level: u32, len: u32) -> u64 {
    let mut out = 0u64;
    let mut got = 0;
    let mut byte_idx = level as usize;
    while got < len {
        let byte = key.get(byte_idx).copied().unwrap_or(0);
        let take = (len - got).min(8);
        out = (out << take) | u64::from(byte >> (8 - take));
        got += take;
        byte_idx += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::construct_real;
    use super::KeyCompare;
    use super::SuffixKind;
    use super::SuffixVector;

    fn build(kind: SuffixKind, hash_len: u32, real_len: u32, keys: &[(&[u8], u32)]) -> SuffixVector {
        let slot = hash_len + real_len;
        let mut words = vec![0u64; (keys.len() as u32 * slot).div_ceil(64) as usize + 1];
        for (i, &(key, level)) in keys.iter().enumerate() {
            let value = SuffixVector::construct(kind, hash_len, real_len, key, level);
            let start = i as u32 * slot;
            let word = (start / 64) as usize;
            let offset = start % 64;
            words[word] |= value << offset;
            if offset + slot > 64 {
                words[word + 1] |= value >> (64 - offset);
            }
        }
        SuffixVector::from_level_bits(
            kind,
            hash_len,
            real_len,
            &[words],
            &[keys.len() as u32 * slot],
            0,
            1,
        )
    }

    #[test]
    fn test_construct_real_bits() {
        // "b" = 0x62: the next 8 bits beyond level 1 of "ab" are 0x62.
        assert_eq!(construct_real(b"ab", 1, 8), 0x62);
        // Past the end of the key the bits are zero.
        assert_eq!(construct_real(b"ab", 2, 8), 0);
        // 4 bits take the high nibble.
        assert_eq!(construct_real(b"ab", 1, 4), 0x6);
        // 12 bits span two bytes.
        assert_eq!(construct_real(b"abc", 1, 12), 0x626);
    }

    #[test]
    fn test_real_equality_and_isolation() {
        let sv = build(SuffixKind::Real, 0, 8, &[(b"banana" as &[u8], 5), (b"cherry", 2)]);
        assert!(sv.check_equality(0, b"banana", 5));
        assert!(sv.check_equality(1, b"cherry", 2));
        // "banani" differs from "banana" in the byte the suffix stores.
        assert!(!sv.check_equality(0, b"banani", 5));
    }

    #[test]
    fn test_hash_equality() {
        let sv = build(SuffixKind::Hash, 8, 0, &[(b"apple" as &[u8], 3)]);
        assert!(sv.check_equality(0, b"apple", 3));
        // Hash-only stores cannot order.
        assert_eq!(sv.compare(0, b"apple", 3), KeyCompare::CouldBePositive);
        assert_eq!(sv.compare(0, b"zzzzz", 3), KeyCompare::CouldBePositive);
    }

    #[test]
    fn test_real_compare_orders() {
        let sv = build(SuffixKind::Real, 0, 8, &[(b"bd" as &[u8], 1)]);
        assert_eq!(sv.compare(0, b"bz", 1), KeyCompare::Less);
        assert_eq!(sv.compare(0, b"ba", 1), KeyCompare::Greater);
        assert_eq!(sv.compare(0, b"bd", 1), KeyCompare::CouldBePositive);
    }

    #[test]
    fn test_mixed_packs_both_parts() {
        let sv = build(SuffixKind::Mixed, 4, 4, &[(b"date" as &[u8], 2)]);
        assert!(sv.check_equality(0, b"date", 2));
        assert_eq!(sv.read_real(0), u64::from(b't' >> 4));
    }

    #[test]
    fn test_zero_stored_suffix_still_compares() {
        // A key ending exactly at its stored path has zero real bits; an
        // extension must still be caught.
        let sv = build(SuffixKind::Real, 0, 8, &[(b"ab" as &[u8], 2)]);
        assert!(sv.check_equality(0, b"ab", 2));
        assert!(!sv.check_equality(0, b"abc", 2));
    }

    #[test]
    fn test_none_always_matches() {
        let sv = SuffixVector::empty();
        assert!(sv.check_equality(0, b"anything", 1));
        assert_eq!(sv.compare(0, b"anything", 1), KeyCompare::CouldBePositive);
    }
}
