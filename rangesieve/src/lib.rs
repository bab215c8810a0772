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

//! # Rangesieve
//!
//! A succinct range-membership filter over sorted byte-string keys: a
//! Bloom-filter replacement for ordered workloads. It answers point and
//! range queries with no false negatives and a tunable false-positive rate,
//! and additionally supports ordered iteration, predecessor/successor seeks
//! and range-cardinality estimation, all from a compact serializable index
//! meant to sit in memory on the hot path of a key-value store.
//!
//! The index is a two-tier LOUDS-encoded prefix trie backed by rank/select
//! bitvectors; see the [`filter`] module for the public API.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod error;
pub mod filter;

mod bitvec;
mod codec;
mod hash;
mod labels;
mod suffix;
mod trie;
