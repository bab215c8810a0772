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

use googletest::assert_that;
use googletest::prelude::eq;
use rangesieve::error::ErrorKind;
use rangesieve::filter::Config;
use rangesieve::filter::RangeFilter;
use rangesieve::filter::SuffixKind;

fn sample_keys() -> Vec<Vec<u8>> {
    let mut keys: Vec<Vec<u8>> = (0u32..300)
        .map(|i| format!("user/{:05}/profile", i * 7).into_bytes())
        .collect();
    keys.push(b"user/".to_vec());
    keys.sort();
    keys
}

fn roundtrip(filter: &RangeFilter) -> RangeFilter {
    let bytes = filter.serialize().unwrap();
    assert_that!(bytes.len() as u64, eq(filter.serialized_size()));
    RangeFilter::deserialize(&bytes).unwrap()
}

#[test]
fn test_roundtrip_preserves_lookups() {
    let keys = sample_keys();
    for config in [
        Config::default(),
        Config::default().suffix(SuffixKind::Hash, 8, 0),
        Config::default().suffix(SuffixKind::Real, 0, 8),
        Config::default().suffix(SuffixKind::Mixed, 4, 4),
        Config::default().include_dense(false),
        Config::default().sparse_dense_ratio(1024),
    ] {
        let filter = RangeFilter::from_sorted(&keys, &config).unwrap();
        let restored = roundtrip(&filter);
        assert_that!(restored.height(), eq(filter.height()));
        assert_that!(restored.sparse_start_level(), eq(filter.sparse_start_level()));
        for key in &keys {
            assert_that!(restored.lookup(key), eq(filter.lookup(key)));
        }
        for probe in [b"user/" as &[u8], b"user/00001", b"zzz", b"user/00007/profilee"] {
            assert_that!(restored.lookup(probe), eq(filter.lookup(probe)));
        }
    }
}

#[test]
fn test_roundtrip_preserves_iteration() {
    let keys = sample_keys();
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    let restored = roundtrip(&filter);

    let mut original_iter = filter.first();
    let mut restored_iter = restored.first();
    while original_iter.is_valid() {
        assert!(restored_iter.is_valid());
        assert_that!(&restored_iter.key(), eq(&original_iter.key()));
        let advanced = original_iter.next();
        assert_that!(restored_iter.next(), eq(advanced));
        if !advanced {
            break;
        }
    }
    assert!(!restored_iter.is_valid());
}

#[test]
fn test_roundtrip_preserves_counts() {
    let keys = sample_keys();
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    let restored = roundtrip(&filter);
    for (left, right) in [
        (b"user/00000" as &[u8], b"user/02000" as &[u8]),
        (b"user/", b"user/00500/profile"),
        (b"a", b"zzzz"),
    ] {
        assert_that!(restored.approx_count(left, right), eq(filter.approx_count(left, right)));
    }
}

#[test]
fn test_roundtrip_of_empty_filter() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    filter.finalize();
    let restored = roundtrip(&filter);
    assert!(!restored.has_keys());
    assert!(!restored.lookup(b"anything"));
}

#[test]
fn test_serialize_before_finalize_fails() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    filter.insert(b"apple");
    let err = filter.serialize().unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::NotFinalized));
}

#[test]
fn test_deserialize_rejects_garbage() {
    assert_that!(
        RangeFilter::deserialize(&[]).unwrap_err().kind(),
        eq(ErrorKind::InvalidData)
    );

    let keys = sample_keys();
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    let bytes = filter.serialize().unwrap();

    // Wrong family byte.
    let mut corrupted = bytes.clone();
    corrupted[0] ^= 0xff;
    assert_that!(
        RangeFilter::deserialize(&corrupted).unwrap_err().kind(),
        eq(ErrorKind::InvalidData)
    );

    // Unsupported serial version.
    let mut corrupted = bytes.clone();
    corrupted[1] = 99;
    assert_that!(
        RangeFilter::deserialize(&corrupted).unwrap_err().kind(),
        eq(ErrorKind::InvalidData)
    );

    // Truncated buffer.
    let truncated = &bytes[..bytes.len() / 2];
    assert_that!(
        RangeFilter::deserialize(truncated).unwrap_err().kind(),
        eq(ErrorKind::InvalidData)
    );
}

#[test]
fn test_memory_usage_reported() {
    let keys = sample_keys();
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    assert!(filter.memory_usage() > 0);
    assert!(filter.serialized_size() > 0);
}
