// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use hifitime::{Duration, Epoch};

use edb_trending::{
    calculate_statistics, AveragingPolicy, ClipParams, Comparator, Condition, RelationTest,
    Samples, Sampling, TimeSeries,
};

/// `n` samples one second apart of a slow sine, which spends half of its time
/// above zero.
fn sine(name: &str, n: usize, offset_ns: i128) -> TimeSeries {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 1)
        + Duration::from_total_nanoseconds(offset_ns);
    TimeSeries::new(
        name,
        (0..n)
            .map(|i| start + Duration::from_seconds(i as f64))
            .collect(),
        Samples::Numeric((0..n).map(|i| (i as f64 / 600.0).sin()).collect()),
        Sampling::AllPoints,
    )
    .unwrap()
}

fn conditions(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditions");
    for n in [100_000, 1_000_000] {
        let dependency = sine("CURRENT", n, 0);
        // Sampled out of step with the dependency.
        let target = sine("TEMPERATURE", n, 250_000_000);
        let positive = RelationTest::new(&dependency, Comparator::Gt, 0.0.into()).unwrap();
        let condition = Condition::new(vec![positive.into()]);

        group.bench_with_input(BenchmarkId::new("relation test", n), &dependency, |b, d| {
            b.iter(|| RelationTest::new(d, Comparator::Gt, 0.0.into()))
        });
        group.bench_with_input(BenchmarkId::new("extract data", n), &target, |b, t| {
            b.iter(|| condition.extract_data(t))
        });

        let extracted = condition.extract_data(&target).extracted_data;
        group.bench_with_input(BenchmarkId::new("block means", n), &extracted, |b, e| {
            b.iter(|| {
                calculate_statistics(e, AveragingPolicy::BlockMeans, None, ClipParams::default())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, conditions);
criterion_main!(benches);
