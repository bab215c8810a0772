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

use super::ALIGNMENT;

/// A simple wrapper around a `Vec<u8>` that provides methods for writing the
/// field types used by the filter's serialization format.
pub(crate) struct FilterBytes {
    bytes: Vec<u8>,
}

impl FilterBytes {
    /// Constructs an empty `FilterBytes` with at least the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Consumes the `FilterBytes` and returns the underlying `Vec<u8>`.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Writes the given byte slice to the `FilterBytes`.
    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    /// Writes a single byte to the `FilterBytes`.
    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    /// Writes a 32-bit unsigned integer to the `FilterBytes` in little-endian
    /// byte order.
    pub fn write_u32_le(&mut self, n: u32) {
        self.write(&n.to_le_bytes());
    }

    /// Writes a 64-bit unsigned integer to the `FilterBytes` in little-endian
    /// byte order.
    pub fn write_u64_le(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    /// Writes a slice of 64-bit words in little-endian byte order.
    pub fn write_words_le(&mut self, words: &[u64]) {
        for &word in words {
            self.write_u64_le(word);
        }
    }

    /// Pads with zero bytes up to the next 8-byte boundary.
    pub fn pad_to_alignment(&mut self) {
        while self.bytes.len() % ALIGNMENT != 0 {
            self.bytes.push(0);
        }
    }
}

/// Rounds `size` up to the next 8-byte boundary, mirroring
/// [`FilterBytes::pad_to_alignment`] for size precomputation.
pub(crate) fn aligned(size: u64) -> u64 {
    size.div_ceil(ALIGNMENT as u64) * ALIGNMENT as u64
}
