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
use std::io::Cursor;
use std::io::Read;

use byteorder::ByteOrder;
use byteorder::LE;

use super::ALIGNMENT;

/// A wrapper around a byte slice that provides methods for reading the field
/// types used by the filter's serialization format.
pub(crate) struct FilterSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl FilterSlice<'_> {
    /// Creates a new `FilterSlice` from the given byte slice.
    pub fn new(slice: &[u8]) -> FilterSlice<'_> {
        FilterSlice {
            slice: Cursor::new(slice),
        }
    }

    /// Reads exactly `buf.len()` bytes from the slice into `buf`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.slice.read_exact(buf)
    }

    /// Reads a single byte from the slice and returns it as a `u8`.
    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a 32-bit unsigned integer from the slice in little-endian byte
    /// order.
    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a 64-bit unsigned integer from the slice in little-endian byte
    /// order.
    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads `count` 64-bit words in little-endian byte order.
    pub fn read_words_le(&mut self, count: usize) -> io::Result<Vec<u64>> {
        let mut bytes = vec![0u8; count * 8];
        self.read_exact(&mut bytes)?;
        let mut words = vec![0u64; count];
        LE::read_u64_into(&bytes, &mut words);
        Ok(words)
    }

    /// Skips the zero padding written by `FilterBytes::pad_to_alignment`.
    pub fn skip_padding(&mut self) -> io::Result<()> {
        let pos = self.slice.position() as usize;
        let pad = (ALIGNMENT - pos % ALIGNMENT) % ALIGNMENT;
        if pad > 0 {
            let mut buf = [0u8; ALIGNMENT];
            self.read_exact(&mut buf[..pad])?;
        }
        Ok(())
    }
}
