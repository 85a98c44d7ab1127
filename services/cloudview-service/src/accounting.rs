// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Time-bucketed accounting aggregation
//!
//! Turns raw VM history records into one chronological `(timestamp, sum)`
//! series per meter, suitable for painting historical usage graphs. The
//! aggregation is pure; the dispatcher fetches the records and hands them
//! here.

use crate::backend::HistoryRecord;
use std::collections::BTreeMap;

/// Aggregate `records` over `[start, end)` in `interval`-wide buckets.
///
/// A record counts toward the bucket starting at `ts` (with upper bound
/// `tstep = ts + interval`) when it started before the bucket's upper bound
/// and either is still running (`end == 0`) or finished no earlier than the
/// bucket's start. Records overlapping several buckets count in each.
///
/// For every bucket with at least one matching record, each requested meter
/// gets a `(ts, sum)` pair; a record missing a meter contributes 0 to that
/// sum. Buckets with no matching records emit nothing, leaving a gap in the
/// series. The final bucket may extend past `end` when `interval` does not
/// divide the range evenly; that overrun is accepted.
///
/// A zero-length range, or a non-positive interval, yields the requested
/// meters with empty series.
pub fn aggregate(
    records: &[HistoryRecord],
    start: i64,
    end: i64,
    interval: i64,
    meters: &[String],
) -> BTreeMap<String, Vec<(i64, i64)>> {
    let mut result: BTreeMap<String, Vec<(i64, i64)>> = meters
        .iter()
        .map(|meter| (meter.clone(), Vec::new()))
        .collect();

    if interval <= 0 {
        return result;
    }

    let mut tstart = start;
    while tstart < end {
        let tstep = tstart + interval;

        let mut matched = false;
        let mut sums: BTreeMap<&str, i64> = BTreeMap::new();

        for record in records {
            let still_running = record.start <= tstep && record.end == 0;
            let overlaps = record.start <= tstep && record.end >= tstart;
            if !(still_running || overlaps) {
                continue;
            }

            matched = true;
            for meter in meters {
                let value = record.meters.get(meter.as_str()).copied().unwrap_or(0);
                *sums.entry(meter.as_str()).or_insert(0) += value;
            }
        }

        if matched {
            for meter in meters {
                let sum = sums.get(meter.as_str()).copied().unwrap_or(0);
                if let Some(series) = result.get_mut(meter.as_str()) {
                    series.push((tstart, sum));
                }
            }
        }

        tstart = tstep;
    }

    result
}
