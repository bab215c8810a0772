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

//! Byte-level encoding and decoding cursors shared by every serializable
//! component of the filter.
//!
//! All multibyte integers are little-endian. Variable-length members are
//! followed by zero padding up to the next 8-byte boundary so that packed
//! word arrays always start word-aligned relative to the buffer base.

mod decode;
mod encode;

pub(crate) use self::decode::FilterSlice;
pub(crate) use self::encode::aligned;
pub(crate) use self::encode::FilterBytes;

/// Family byte identifying a serialized range filter.
pub(crate) const RANGE_FILTER_FAMILY_ID: u8 = 73;

/// Serial format version understood by this crate.
pub(crate) const SERIAL_VERSION: u8 = 1;

/// Alignment boundary, in bytes, applied after variable-length members.
pub(crate) const ALIGNMENT: usize = 8;
