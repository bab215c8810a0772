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

//! The two-tier LOUDS trie.
//!
//! The builder consumes sorted keys into per-level label, child-indicator
//! and node-boundary vectors. At finalize the upper levels are re-encoded as
//! one 256-bit block per node (the dense tier); the rest stays as packed
//! labels (the sparse tier). Queries descend the dense tier first and hand a
//! node number to the sparse tier when they outlive it.

pub(crate) mod builder;
pub(crate) mod dense;
pub(crate) mod sparse;

/// Fanout of every trie node; labels are bytes.
pub(crate) const NODE_FANOUT: u32 = 256;

/// Label marking a key that ends inside an interior node of the sparse
/// tier. It only ever appears as the first label of a node. Keys containing
/// a real 0xFF byte at a branching position collide with it and may surface
/// as extra false positives.
pub(crate) const TERMINATOR_LABEL: u8 = 0xff;

/// Sentinel position used by the range counters for "past every level".
pub(crate) const MAX_POS: u32 = u32::MAX;
