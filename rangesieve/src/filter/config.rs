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

use crate::error::Error;
use crate::suffix::SuffixKind;

/// Construction parameters for a [`super::RangeFilter`].
///
/// The defaults match the common configuration: a dense upper tier with a
/// size ratio of 16 and no suffix bits.
///
/// # Examples
///
/// ```
/// use rangesieve::filter::Config;
/// use rangesieve::filter::SuffixKind;
///
/// let config = Config::default()
///     .suffix(SuffixKind::Mixed, 4, 4)
///     .sparse_dense_ratio(16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Whether the upper trie levels are emitted as 256-bit-per-node
    /// bitmaps. When false the entire trie is sparse.
    pub include_dense: bool,
    /// Size threshold deciding where the encoding flips from dense to
    /// sparse: a level stays dense while its bitmap encoding is at most this
    /// many times the size of its sparse encoding.
    pub sparse_dense_ratio: u32,
    /// Which suffix bits are stored per terminal.
    pub suffix_kind: SuffixKind,
    /// Bits of hash suffix per terminal; 0 unless `suffix_kind` has a hash
    /// part.
    pub hash_suffix_len: u32,
    /// Bits of real key suffix per terminal; 0 unless `suffix_kind` has a
    /// real part.
    pub real_suffix_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            include_dense: true,
            sparse_dense_ratio: 16,
            suffix_kind: SuffixKind::None,
            hash_suffix_len: 0,
            real_suffix_len: 0,
        }
    }
}

impl Config {
    /// Sets the suffix encoding and its hash/real bit widths.
    pub fn suffix(mut self, kind: SuffixKind, hash_suffix_len: u32, real_suffix_len: u32) -> Self {
        self.suffix_kind = kind;
        self.hash_suffix_len = hash_suffix_len;
        self.real_suffix_len = real_suffix_len;
        self
    }

    /// Sets whether the dense tier is emitted.
    pub fn include_dense(mut self, include_dense: bool) -> Self {
        self.include_dense = include_dense;
        self
    }

    /// Sets the dense/sparse size threshold.
    pub fn sparse_dense_ratio(mut self, ratio: u32) -> Self {
        self.sparse_dense_ratio = ratio;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let (hash, real) = (self.hash_suffix_len, self.real_suffix_len);
        let consistent = match self.suffix_kind {
            SuffixKind::None => hash == 0 && real == 0,
            SuffixKind::Hash => hash > 0 && real == 0,
            SuffixKind::Real => hash == 0 && real > 0,
            SuffixKind::Mixed => hash > 0 && real > 0,
        };
        if !consistent {
            return Err(Error::invalid_argument(
                "suffix lengths do not match the suffix kind",
            )
            .with_context("hash_suffix_len", hash)
            .with_context("real_suffix_len", real));
        }
        if hash + real > 64 {
            return Err(
                Error::invalid_argument("suffix slots wider than 64 bits are not supported")
                    .with_context("slot_len", hash + real),
            );
        }
        Ok(())
    }
}
