// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::time_series::{Samples, Sampling};

fn hours_from(start: Epoch, step_hours: f64, n: usize) -> Vec<Epoch> {
    (0..n)
        .map(|i| start + Duration::from_hours(step_hours * i as f64))
        .collect()
}

/// Two-hourly samples over a little more than three days, constant within
/// each day.
fn daily_fixture() -> TimeSeries {
    let start = Epoch::from_gregorian_utc_hms(2021, 12, 18, 12, 0, 0);
    let values = [
        vec![10.0; 12],
        vec![25.0; 12],
        vec![12.0; 12],
        vec![50.0; 2],
    ]
    .concat();
    TimeSeries::new(
        "SE_ZIMIRICEA",
        hours_from(start, 2.0, values.len()),
        Samples::Numeric(values),
        Sampling::AllPoints,
    )
    .unwrap()
    .with_unit(Some("A"))
}

#[test]
fn test_daily_stats() {
    let series = daily_fixture();
    let stats = calculate_statistics(&series, AveragingPolicy::DailyMeans, None, ClipParams::default())
        .unwrap();
    assert_eq!(stats.identifier, "SE_ZIMIRICEA");
    assert_eq!(stats.unit.as_deref(), Some("A"));
    assert_eq!(stats.means(), vec![10.0, 25.0, 12.0, 50.0]);
    assert_eq!(stats.medians(), vec![10.0, 25.0, 12.0, 50.0]);
    assert_eq!(stats.stdevs(), vec![0.0; 4]);

    // Each day's time is the middle of its samples.
    let times = series.timestamps();
    assert_eq!(
        stats.segments[0].time,
        times[5] + Duration::from_hours(1.0)
    );
    assert_eq!(
        stats.segments[3].time,
        times[36] + Duration::from_hours(1.0)
    );
}

#[test]
fn test_daily_stats_skips_empty_days() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 1, 1);
    let times = vec![
        start,
        start + Duration::from_hours(1.0),
        start + Duration::from_days(3.5),
    ];
    let series = TimeSeries::new(
        "GAPPY",
        times,
        Samples::Numeric(vec![1.0, 3.0, 7.0]),
        Sampling::AllPoints,
    )
    .unwrap();
    let stats = daily_stats(&series, ClipParams::default()).unwrap();
    assert_eq!(stats.means(), vec![2.0, 7.0]);
}

#[test]
fn test_daily_stats_last_bucket_includes_boundary_sample() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 1, 1);
    let times = vec![
        start,
        start + Duration::from_hours(12.0),
        start + Duration::from_hours(30.0),
        start + Duration::from_days(2.0),
    ];
    let series = TimeSeries::new(
        "BOUNDARY",
        times.clone(),
        Samples::Numeric(vec![1.0, 3.0, 5.0, 7.0]),
        Sampling::AllPoints,
    )
    .unwrap();
    let stats = daily_stats(&series, ClipParams::default()).unwrap();
    assert_eq!(stats.means(), vec![2.0, 6.0]);
    assert_eq!(stats.segments[1].time, times[2] + Duration::from_hours(9.0));

    // Only the last sample is folded back; one on an earlier boundary starts
    // a new bucket.
    let mut times = times;
    times.push(start + Duration::from_days(2.5));
    let series = TimeSeries::new(
        "BOUNDARY",
        times,
        Samples::Numeric(vec![1.0, 3.0, 5.0, 7.0, 9.0]),
        Sampling::AllPoints,
    )
    .unwrap();
    let stats = daily_stats(&series, ClipParams::default()).unwrap();
    assert_eq!(stats.means(), vec![2.0, 5.0, 8.0]);
}

#[test]
fn test_block_stats() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    let series = TimeSeries::new(
        "TEMPERATURE",
        hours_from(start, 1.0, 7),
        Samples::Numeric(vec![1.0, 2.0, 3.0, 10.0, 10.0, 20.0, 30.0]),
        Sampling::AllPoints,
    )
    .unwrap()
    .with_blocks(vec![0, 3, 5, 7])
    .unwrap();
    let stats = calculate_statistics(&series, AveragingPolicy::BlockMeans, None, ClipParams::default())
        .unwrap();
    assert_eq!(stats.len(), 3);
    assert_abs_diff_eq!(stats.segments[0].mean, 2.0);
    assert_abs_diff_eq!(stats.segments[0].stdev, (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(stats.segments[1].mean, 10.0);
    assert_abs_diff_eq!(stats.segments[2].mean, 25.0);
    assert_abs_diff_eq!(stats.segments[2].max, 30.0);
    assert_abs_diff_eq!(stats.segments[2].min, 20.0);
    assert_eq!(stats.segments[0].time, series.timestamps()[1]);
}

#[test]
fn test_block_stats_of_empty_series() {
    let series = TimeSeries::empty("NOTHING", Sampling::AllPoints);
    let stats = block_stats(&series, ClipParams::default()).unwrap();
    assert!(stats.is_empty());
    let stats = full_stats(&series, ClipParams::default()).unwrap();
    assert!(stats.is_empty());
}

#[test]
fn test_timed_stats_restart_at_blocks() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    // Minutely samples; the second block starts 30 minutes later.
    let mut times = (0..7)
        .map(|i| start + Duration::from_seconds(60.0 * i as f64))
        .collect::<Vec<_>>();
    times.extend((0..3).map(|i| start + Duration::from_seconds(60.0 * (30 + i) as f64)));
    let series = TimeSeries::new(
        "CURRENT",
        times,
        Samples::Numeric(vec![1., 1., 1., 2., 2., 2., 3., 4., 4., 5.]),
        Sampling::AllPoints,
    )
    .unwrap()
    .with_blocks(vec![0, 7, 10])
    .unwrap();
    let stats = calculate_statistics(
        &series,
        AveragingPolicy::TimeInterval(Duration::from_seconds(180.0)),
        None,
        ClipParams::default(),
    )
    .unwrap();
    // Block one: [0, 3) min, [3, 6) min, and the partial bin holding 6 min.
    // Block two: a single bin.
    let means = stats.means();
    assert_eq!(means.len(), 4);
    assert_abs_diff_eq!(means[0], 1.0);
    assert_abs_diff_eq!(means[1], 2.0);
    assert_abs_diff_eq!(means[2], 3.0);
    assert_abs_diff_eq!(means[3], 13.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_timed_stats_rejects_zero_interval() {
    let series = daily_fixture();
    assert!(matches!(
        timed_stats(&series, Duration::from_seconds(0.0), ClipParams::default()),
        Err(AveragingError::NonPositiveInterval(_))
    ));
}

#[test]
fn test_every_change_stats_pool_by_value() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    let series = TimeSeries::new(
        "IMIR_HK_ICE_SEC_VOLT1",
        hours_from(start, 1.0, 8),
        Samples::Numeric(vec![5., 5., 9., 9., 5., 7., 9., 9.]),
        Sampling::AllPoints,
    )
    .unwrap();
    // The filter wheel moves at 0, 2, 4, 5 and 6 hours.
    let dependency = TimeSeries::new(
        "IMIR_HK_FW_POS",
        vec![
            start,
            start + Duration::from_hours(2.0),
            start + Duration::from_hours(4.0),
            start + Duration::from_hours(5.0),
            start + Duration::from_hours(6.0),
        ],
        Samples::Text(
            ["F560W", "F1000W", "F560W", "OPAQUE", "F1000W"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        Sampling::ChangeOnly,
    )
    .unwrap();

    let stats = calculate_statistics(
        &series,
        AveragingPolicy::EveryChange,
        Some(&dependency),
        ClipParams::default(),
    )
    .unwrap();
    let labels: Vec<_> = stats
        .segments
        .iter()
        .map(|s| s.label.clone().unwrap())
        .collect();
    assert_eq!(labels, vec!["F560W", "F1000W", "OPAQUE"]);
    assert_eq!(stats.means(), vec![5.0, 9.0, 7.0]);
    assert_eq!(stats.stdevs(), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_every_change_ignores_samples_before_dependency() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    let series = TimeSeries::new(
        "VOLT",
        hours_from(start, 1.0, 4),
        Samples::Numeric(vec![100., 1., 2., 3.]),
        Sampling::AllPoints,
    )
    .unwrap();
    let dependency = TimeSeries::new(
        "MODE",
        vec![start + Duration::from_hours(0.5)],
        Samples::Numeric(vec![1.0]),
        Sampling::ChangeOnly,
    )
    .unwrap();
    let stats = every_change_stats(&series, &dependency, ClipParams::default()).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats.segments[0].label.as_deref(), Some("1"));
    assert_abs_diff_eq!(stats.segments[0].mean, 2.0);
}

#[test]
fn test_every_change_needs_dependency() {
    assert!(matches!(
        calculate_statistics(
            &daily_fixture(),
            AveragingPolicy::EveryChange,
            None,
            ClipParams::default()
        ),
        Err(AveragingError::MissingDependency(_))
    ));
}

#[test]
fn test_constant_segment_stats_for_any_sigma() {
    let series = daily_fixture();
    for sigma in [0.0, 0.5, 3.0, 100.0] {
        let clip = ClipParams {
            sigma,
            max_iters: 5,
        };
        let stats = calculate_statistics(&series, AveragingPolicy::BlockMeans, None, clip).unwrap();
        assert_eq!(stats.len(), 1);
        let s = &stats.segments[0];
        // The values differ between days, but not within one.
        assert_abs_diff_eq!(s.max, 50.0);
        assert_abs_diff_eq!(s.min, 10.0);

        let stats = calculate_statistics(&series, AveragingPolicy::DailyMeans, None, clip).unwrap();
        for s in &stats.segments {
            assert_eq!(s.mean, s.median);
            assert_eq!(s.stdev, 0.0);
        }
    }
}

#[test]
fn test_constant_segment_with_inexact_mean_under_tight_clipping() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    let series = TimeSeries::new(
        "SE_ZIMIRICEA",
        hours_from(start, 1.0, 10),
        Samples::Numeric(vec![35.1; 10]),
        Sampling::AllPoints,
    )
    .unwrap();
    let clip = ClipParams {
        sigma: 0.5,
        max_iters: 5,
    };
    let stats = calculate_statistics(&series, AveragingPolicy::BlockMeans, None, clip).unwrap();
    assert_eq!(stats.means(), vec![35.1]);
    assert_eq!(stats.medians(), vec![35.1]);
    assert_eq!(stats.stdevs(), vec![0.0]);
}

#[test]
fn test_change_only_series_is_materialised() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    // A value that is 0 for the first day, then 10 for the next half day.
    let series = TimeSeries::new(
        "SE_ZIMIRICEA",
        vec![
            start,
            start + Duration::from_days(1.0),
            start + Duration::from_days(1.5),
        ],
        Samples::Numeric(vec![0.0, 10.0, 10.0]),
        Sampling::ChangeOnly,
    )
    .unwrap();
    let stats = calculate_statistics(&series, AveragingPolicy::DailyMeans, None, ClipParams::default())
        .unwrap();
    // The held 0 just before the change belongs to the first day.
    assert_eq!(stats.means(), vec![0.0, 10.0]);
    let stats = calculate_statistics(&series, AveragingPolicy::None, None, ClipParams::default())
        .unwrap();
    assert_eq!(stats.len(), 1);
    // Two held zeros and three tens.
    assert_abs_diff_eq!(stats.segments[0].mean, 6.0);
}

#[test]
fn test_text_series_cannot_be_averaged() {
    let start = Epoch::from_gregorian_utc_at_midnight(2022, 2, 2);
    let series = TimeSeries::new(
        "MODE",
        vec![start],
        Samples::Text(vec!["ON".to_string()]),
        Sampling::AllPoints,
    )
    .unwrap();
    assert!(matches!(
        calculate_statistics(&series, AveragingPolicy::None, None, ClipParams::default()),
        Err(AveragingError::TimeSeries(_))
    ));
}

#[test]
fn test_extend_stats() {
    let series = daily_fixture();
    let mut stats = TelemetryStats::new("SE_ZIMIRICEA", None);
    stats.extend(daily_stats(&series, ClipParams::default()).unwrap());
    stats.extend(full_stats(&series, ClipParams::default()).unwrap());
    assert_eq!(stats.len(), 5);
    assert_eq!(stats.unit.as_deref(), Some("A"));
}
