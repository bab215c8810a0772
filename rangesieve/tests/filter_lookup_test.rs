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

use rangesieve::error::ErrorKind;
use rangesieve::filter::Config;
use rangesieve::filter::RangeFilter;
use rangesieve::filter::SuffixKind;

const FRUIT: [&[u8]; 5] = [b"apple", b"banana", b"cherry", b"date", b"elderberry"];

fn fruit_filter(config: &Config) -> RangeFilter {
    RangeFilter::from_sorted(FRUIT, config).unwrap()
}

#[test]
fn test_basic_lookups() {
    let filter = fruit_filter(&Config::default());
    for key in FRUIT {
        assert!(filter.lookup(key), "inserted key {:?}", key);
    }
    assert!(!filter.lookup(b"nonexistent"));
    assert!(!filter.lookup(b"fig"));
    assert!(filter.has_keys());
}

#[test]
fn test_lookups_per_suffix_kind() {
    let configs = [
        Config::default(),
        Config::default().suffix(SuffixKind::Hash, 8, 0),
        Config::default().suffix(SuffixKind::Real, 0, 8),
        Config::default().suffix(SuffixKind::Mixed, 4, 4),
    ];
    for config in configs {
        let filter = fruit_filter(&config);
        for key in FRUIT {
            assert!(filter.lookup(key), "{:?} under {:?}", key, config.suffix_kind);
        }
        assert!(!filter.lookup(b"grape"), "under {:?}", config.suffix_kind);
    }
}

#[test]
fn test_false_positive_isolation_with_real_suffix() {
    // "banana" stores only "b" in the trie; 40 real bits cover the five
    // remaining bytes, so "banani" differs inside the stored suffix.
    let filter = fruit_filter(&Config::default().suffix(SuffixKind::Real, 0, 40));
    assert!(!filter.lookup(b"banani"));
    assert!(filter.lookup(b"banana"));
}

#[test]
fn test_extension_rejected_by_hash_suffix() {
    let filter = fruit_filter(&Config::default().suffix(SuffixKind::Hash, 16, 0));
    // "dates" walks the stored path of "date" and must be caught by the
    // digest of the bytes beyond it ("ates" against "ate").
    assert!(!filter.lookup(b"dates"));
    assert!(filter.lookup(b"date"));
}

#[test]
fn test_extension_rejected_by_real_suffix() {
    // 32 real bits beyond the stored path "d" hold "ate" plus zero padding;
    // the extension "dates" disagrees in the fourth suffix byte.
    let filter = fruit_filter(&Config::default().suffix(SuffixKind::Real, 0, 32));
    assert!(!filter.lookup(b"dates"));
    assert!(filter.lookup(b"date"));

    // Eight bits see only the first byte beyond the path.
    let filter = fruit_filter(&Config::default().suffix(SuffixKind::Real, 0, 8));
    assert!(!filter.lookup(b"dog"));
    assert!(filter.lookup(b"date"));
}

#[test]
fn test_out_of_order_insert_rejected() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    assert!(filter.insert(b"zebra"));
    assert!(!filter.insert(b"apple"));
    assert!(!filter.insert(b"zebra"));
    filter.finalize();
    assert!(!filter.lookup(b"apple"));
    assert!(filter.lookup(b"zebra"));
}

#[test]
fn test_lookup_before_finalize_returns_nothing() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    assert!(filter.insert(b"apple"));
    assert!(!filter.lookup(b"apple"));
    assert!(filter.has_keys());
    filter.finalize();
    assert!(filter.lookup(b"apple"));
}

#[test]
fn test_insert_after_finalize_rejected() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    assert!(filter.insert(b"apple"));
    filter.finalize();
    assert!(!filter.insert(b"banana"));
}

#[test]
fn test_empty_filter_matches_nothing() {
    let mut filter = RangeFilter::incremental(&Config::default()).unwrap();
    filter.finalize();
    assert!(!filter.has_keys());
    assert!(!filter.lookup(b"anything"));
    assert!(!filter.first().is_valid());
    assert!(!filter.last().is_valid());
    assert!(!filter.seek(b"a", true).is_valid());
    assert_eq!(filter.approx_count(b"a", b"z"), 0);
}

#[test]
fn test_prefix_keys() {
    let keys: [&[u8]; 5] = [b"a", b"ab", b"abc", b"b", b"bc"];
    let filter = RangeFilter::from_sorted(keys, &Config::default()).unwrap();
    for key in keys {
        assert!(filter.lookup(key), "inserted key {:?}", key);
    }
    assert!(!filter.lookup(b"ac"));
    assert!(!filter.lookup(b"c"));
}

#[test]
fn test_sparse_only_configuration() {
    let keys: [&[u8]; 5] = [b"a", b"ab", b"abc", b"b", b"bc"];
    let filter =
        RangeFilter::from_sorted(keys, &Config::default().include_dense(false)).unwrap();
    assert_eq!(filter.sparse_start_level(), 0);
    for key in keys {
        assert!(filter.lookup(key));
    }
    assert!(!filter.lookup(b"ac"));
    let mut iter = filter.first();
    assert_eq!(iter.key(), b"a");
    assert!(iter.next());
    assert_eq!(iter.key(), b"ab");
}

#[test]
fn test_range_nonempty() {
    let filter = fruit_filter(&Config::default());
    // A stored key inside the range.
    assert!(filter.lookup_range(b"aardvark", true, b"apricot", true));
    assert!(filter.lookup_range(b"banana", true, b"banana", true));
    // Entirely past the stored keys.
    assert!(!filter.lookup_range(b"f", true, b"zzz", true));

    // A gap between stored keys needs suffix bits deep enough to order the
    // boundaries; 40 real bits cover the fruit names past their first byte.
    let filter = fruit_filter(&Config::default().suffix(SuffixKind::Real, 0, 40));
    assert!(!filter.lookup_range(b"dog", true, b"elder", true));
    assert!(filter.lookup_range(b"dirt", true, b"elderberry", true));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::default().suffix(SuffixKind::Hash, 0, 8);
    let err = RangeFilter::incremental(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let config = Config::default().suffix(SuffixKind::Mixed, 40, 40);
    let err = RangeFilter::incremental(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = RangeFilter::from_sorted([b"b" as &[u8], b"a"], &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfOrderInsert);
}
