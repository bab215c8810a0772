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

//! Packed edge labels of the sparse tier.
//!
//! Labels of one node form a strictly increasing byte run, except that a
//! terminator label may sit in front of it. Searches skip the terminator and
//! pick a strategy by run length: a linear scan for short runs, a 16-byte
//! SIMD compare when the `simd` feature is enabled, and a binary search
//! otherwise.

use std::io;

use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::trie::TERMINATOR_LABEL;

/// Runs at most this long are scanned linearly.
const LINEAR_SEARCH_MAX: u32 = 12;

/// Longest run handled by the 16-byte SIMD compare before binary search
/// wins.
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
const SIMD_SEARCH_MAX: u32 = 32;

/// Packed per-node label bytes of the sparse tier, in trie position order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LabelVector {
    labels: Vec<u8>,
}

impl LabelVector {
    /// Concatenates the per-level label runs of levels `start..end`.
    pub fn from_levels(levels: &[Vec<u8>], start: usize, end: usize) -> Self {
        let total: usize = levels[start..end].iter().map(Vec::len).sum();
        let mut labels = Vec::with_capacity(total);
        for level in &levels[start..end] {
            labels.extend_from_slice(level);
        }
        LabelVector { labels }
    }

    pub fn len(&self) -> u32 {
        self.labels.len() as u32
    }

    pub fn read(&self, pos: u32) -> u8 {
        self.labels[pos as usize]
    }

    /// Finds `target` in the run `[pos, pos + run_len)`. Returns the match
    /// position, skipping a leading terminator label.
    pub fn search(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        let (pos, run_len) = self.skip_terminator(pos, run_len);
        if run_len <= LINEAR_SEARCH_MAX {
            return self.linear_search(target, pos, run_len);
        }
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if run_len <= SIMD_SEARCH_MAX {
            return self.simd_search(target, pos, run_len);
        }
        self.binary_search(target, pos, run_len)
    }

    /// Finds the smallest label strictly greater than `target` in the run
    /// `[pos, pos + run_len)`, skipping a leading terminator label.
    pub fn search_greater_than(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        let (pos, run_len) = self.skip_terminator(pos, run_len);
        if run_len <= LINEAR_SEARCH_MAX {
            for i in 0..run_len {
                if self.labels[(pos + i) as usize] > target {
                    return Some(pos + i);
                }
            }
            return None;
        }
        self.binary_search_greater_than(target, pos, run_len)
    }

    // The terminator can only be the first label of a node and sorts before
    // every real label, so searches never need to consider it.
    fn skip_terminator(&self, pos: u32, run_len: u32) -> (u32, u32) {
        if run_len > 1 && self.labels[pos as usize] == TERMINATOR_LABEL {
            (pos + 1, run_len - 1)
        } else {
            (pos, run_len)
        }
    }

    fn linear_search(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        (0..run_len)
            .map(|i| pos + i)
            .find(|&p| self.labels[p as usize] == target)
    }

    fn binary_search(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        let run = &self.labels[pos as usize..(pos + run_len) as usize];
        run.binary_search(&target).ok().map(|i| pos + i as u32)
    }

    fn binary_search_greater_than(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        let run = &self.labels[pos as usize..(pos + run_len) as usize];
        let idx = run.partition_point(|&label| label <= target);
        if idx < run.len() {
            Some(pos + idx as u32)
        } else {
            None
        }
    }

    /// Compares 16 labels at a time against a broadcast of `target` and reads
    /// the match out of the movemask.
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    fn simd_search(&self, target: u8, pos: u32, run_len: u32) -> Option<u32> {
        use std::arch::x86_64::__m128i;
        use std::arch::x86_64::_mm_cmpeq_epi8;
        use std::arch::x86_64::_mm_loadu_si128;
        use std::arch::x86_64::_mm_movemask_epi8;
        use std::arch::x86_64::_mm_set1_epi8;

        let mut offset = 0u32;
        while offset < run_len {
            let chunk_len = (run_len - offset).min(16);
            if chunk_len < 16 {
                return self.linear_search(target, pos + offset, chunk_len);
            }
            // SAFETY: pos + offset + 16 <= labels.len() because chunk_len == 16.
            let mask = unsafe {
                let chunk =
                    _mm_loadu_si128(self.labels.as_ptr().add((pos + offset) as usize) as *const __m128i);
                let needle = _mm_set1_epi8(target as i8);
                _mm_movemask_epi8(_mm_cmpeq_epi8(chunk, needle))
            };
            if mask != 0 {
                return Some(pos + offset + mask.trailing_zeros());
            }
            offset += 16;
        }
        None
    }

    pub fn size_bytes(&self) -> u64 {
        self.labels.len() as u64
    }

    /// Serialized length in bytes, padding included.
    pub fn serialized_size(&self) -> u64 {
        crate::codec::aligned(4 + self.labels.len() as u64)
    }

    pub fn serialize(&self, out: &mut FilterBytes) {
        out.write_u32_le(self.labels.len() as u32);
        out.write(&self.labels);
        out.pad_to_alignment();
    }

    pub fn deserialize(input: &mut FilterSlice<'_>) -> io::Result<Self> {
        let len = input.read_u32_le()? as usize;
        let mut labels = vec![0u8; len];
        input.read_exact(&mut labels)?;
        input.skip_padding()?;
        Ok(LabelVector { labels })
    }
}

#[cfg(test)]
mod tests {
    use super::LabelVector;
    use crate::trie::TERMINATOR_LABEL;

    fn vector(bytes: &[u8]) -> LabelVector {
        LabelVector::from_levels(&[bytes.to_vec()], 0, 1)
    }

    #[test]
    fn test_linear_run() {
        let lv = vector(b"adgz");
        assert_eq!(lv.search(b'a', 0, 4), Some(0));
        assert_eq!(lv.search(b'z', 0, 4), Some(3));
        assert_eq!(lv.search(b'b', 0, 4), None);
    }

    #[test]
    fn test_long_run_uses_ordered_search() {
        let labels: Vec<u8> = (b'a'..=b'z').collect();
        let lv = vector(&labels);
        for (i, &label) in labels.iter().enumerate() {
            assert_eq!(lv.search(label, 0, labels.len() as u32), Some(i as u32));
        }
        assert_eq!(lv.search(b'A', 0, labels.len() as u32), None);
    }

    #[test]
    fn test_terminator_skipped() {
        let mut labels = vec![TERMINATOR_LABEL];
        labels.extend_from_slice(b"bdf");
        let lv = vector(&labels);
        assert_eq!(lv.search(b'd', 0, 4), Some(2));
        assert_eq!(lv.search(TERMINATOR_LABEL, 0, 4), None);
        // A single-label run is not skipped.
        assert_eq!(lv.search(TERMINATOR_LABEL, 0, 1), Some(0));
    }

    #[test]
    fn test_search_greater_than() {
        let lv = vector(b"bdfh");
        assert_eq!(lv.search_greater_than(b'a', 0, 4), Some(0));
        assert_eq!(lv.search_greater_than(b'b', 0, 4), Some(1));
        assert_eq!(lv.search_greater_than(b'g', 0, 4), Some(3));
        assert_eq!(lv.search_greater_than(b'h', 0, 4), None);
        let long: Vec<u8> = (0u8..40).map(|i| i * 2).collect();
        let lv = vector(&long);
        assert_eq!(lv.search_greater_than(7, 0, 40), Some(4));
        assert_eq!(lv.search_greater_than(78, 0, 40), None);
    }
}
