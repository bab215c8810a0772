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

//! Walks through the range filter API: construction, point and range
//! queries, ordered iteration and serialization.

use rangesieve::filter::Config;
use rangesieve::filter::RangeFilter;
use rangesieve::filter::SuffixKind;

fn main() {
    let keys: Vec<&[u8]> = vec![
        b"orders/2024-01-14/0001",
        b"orders/2024-01-14/0002",
        b"orders/2024-01-15/0001",
        b"orders/2024-02-02/0001",
        b"orders/2024-02-02/0002",
        b"orders/2024-02-03/0001",
    ];

    let config = Config::default().suffix(SuffixKind::Mixed, 4, 4);
    let filter = RangeFilter::from_sorted(&keys, &config).expect("sorted input");

    println!("height: {}", filter.height());
    println!("sparse start level: {}", filter.sparse_start_level());
    println!("memory usage: {} bytes", filter.memory_usage());

    // Point membership, no false negatives.
    assert!(filter.lookup(b"orders/2024-01-15/0001"));
    println!(
        "lookup(orders/2024-03-01/0001) = {}",
        filter.lookup(b"orders/2024-03-01/0001")
    );

    // Is any order stored for January?
    let january = filter.lookup_range(b"orders/2024-01-", true, b"orders/2024-02-", false);
    println!("orders in January: {january}");

    // Roughly how many orders in February?
    let february = filter.approx_count(b"orders/2024-02-", b"orders/2024-02-z");
    println!("approximately {february} orders in February");

    // Ordered scan from a seek position.
    let mut iter = filter.seek(b"orders/2024-02-02", true);
    while iter.is_valid() {
        println!("scan: {}", String::from_utf8_lossy(&iter.key()));
        if !iter.next() {
            break;
        }
    }

    // Ship the filter to another process.
    let bytes = filter.serialize().expect("finalized");
    let restored = RangeFilter::deserialize(&bytes).expect("intact buffer");
    assert!(restored.lookup(b"orders/2024-01-14/0001"));
    println!("serialized size: {} bytes", bytes.len());
}
