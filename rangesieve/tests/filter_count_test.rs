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

use rangesieve::filter::Config;
use rangesieve::filter::RangeFilter;

fn numbered_keys(count: u32) -> Vec<Vec<u8>> {
    (0..count).map(|i| format!("key{i:04}").into_bytes()).collect()
}

fn exact_count(keys: &[Vec<u8>], left: &[u8], right: &[u8]) -> u64 {
    keys.iter()
        .filter(|k| k.as_slice() >= left && k.as_slice() <= right)
        .count() as u64
}

// The estimate is exact except at the range boundaries, where it may
// undercount by at most two.
fn assert_within_bound(filter: &RangeFilter, keys: &[Vec<u8>], left: &[u8], right: &[u8]) {
    let exact = exact_count(keys, left, right);
    let estimate = filter.approx_count(left, right);
    assert!(
        estimate <= exact && estimate + 2 >= exact,
        "approx_count({:?}, {:?}) = {estimate}, exact {exact}",
        String::from_utf8_lossy(left),
        String::from_utf8_lossy(right),
    );
}

#[test]
fn test_thousand_key_window() {
    let keys = numbered_keys(1000);
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    let estimate = filter.approx_count(b"key0100", b"key0199");
    assert!((98..=100).contains(&estimate), "estimate {estimate}");
}

#[test]
fn test_windows_across_the_key_space() {
    let keys = numbered_keys(1000);
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    assert_within_bound(&filter, &keys, b"key0000", b"key0999");
    assert_within_bound(&filter, &keys, b"key0250", b"key0750");
    assert_within_bound(&filter, &keys, b"key0500", b"key0509");
    assert_within_bound(&filter, &keys, b"key0998", b"key0999");
}

#[test]
fn test_unstored_boundaries() {
    let keys = numbered_keys(500);
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    // Probes that fall between stored keys.
    assert_within_bound(&filter, &keys, b"key0099z", b"key0200z");
    assert_within_bound(&filter, &keys, b"aaa", b"key0049z");
}

#[test]
fn test_empty_ranges() {
    let keys = numbered_keys(100);
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    // Entirely past the stored keys.
    assert_eq!(filter.approx_count(b"zzz", b"zzzz"), 0);
}

#[test]
fn test_count_from_iterators() {
    let keys = numbered_keys(1000);
    let filter = RangeFilter::from_sorted(&keys, &Config::default()).unwrap();
    let left = filter.seek(b"key0100", true);
    let right = filter.seek(b"key0199", true);
    let estimate = filter.approx_count_iters(&left, &right);
    assert!((98..=100).contains(&estimate), "estimate {estimate}");

    let invalid = filter.seek(b"zzz", true);
    assert_eq!(filter.approx_count_iters(&left, &invalid), 0);
}

#[test]
fn test_count_sparse_only_matches_dense_config() {
    let keys = numbered_keys(300);
    let dense_heavy =
        RangeFilter::from_sorted(&keys, &Config::default().sparse_dense_ratio(1024)).unwrap();
    let sparse_only =
        RangeFilter::from_sorted(&keys, &Config::default().include_dense(false)).unwrap();
    for (left, right) in [
        (b"key0000".as_slice(), b"key0299".as_slice()),
        (b"key0050", b"key0149"),
        (b"key0123", b"key0124"),
    ] {
        assert_within_bound(&dense_heavy, &keys, left, right);
        assert_within_bound(&sparse_only, &keys, left, right);
    }
}
