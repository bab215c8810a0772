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

//! Suffix hashing.
//!
//! Hash suffixes only need a deterministic byte hash with reasonable
//! avalanche behavior: the low `hash_suffix_len` bits of the digest are
//! stored per terminal and recomputed at query time, so any bias shows up
//! directly as extra false positives rather than as corruption. FNV-1a fits
//! that contract in a few lines and keeps the serialized format
//! self-contained.
//!
//! Filters persisted by this crate embed these digests, so the function can
//! never change without bumping the serial version.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Computes the 64-bit FNV-1a digest of `bytes`.
///
/// The suffix store truncates this to the configured hash-suffix width.
pub(crate) fn suffix_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::suffix_hash;

    #[test]
    fn test_deterministic() {
        assert_eq!(suffix_hash(b"apple"), suffix_hash(b"apple"));
        assert_ne!(suffix_hash(b"apple"), suffix_hash(b"apply"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(suffix_hash(b""), super::FNV_OFFSET_BASIS);
    }

    #[test]
    fn test_low_bits_spread() {
        // Keys differing in one trailing byte must disagree in the low bits
        // most of the time; this is what the hash suffix relies on.
        let mut distinct = std::collections::HashSet::new();
        for b in 0u8..=255 {
            let key = [b"prefix" as &[u8], &[b]].concat();
            distinct.insert(suffix_hash(&key) & 0xff);
        }
        assert!(distinct.len() > 128);
    }
}
