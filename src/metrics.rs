use std::sync::LazyLock;

use prometheus::*;

static METRIC_VIDEO_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("vidmatch_video_count", "count of the indexed videos", &["index"])
        .unwrap()
});

static METRIC_REPORT_ROWS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "vidmatch_report_rows",
        "rows of the latest match report",
        &["report", "match_distance"]
    )
    .unwrap()
});

static METRIC_FLAGGED_VIDEOS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "vidmatch_flagged_videos",
        "count of the videos flagged by quality filter",
        &["reason"]
    )
    .unwrap()
});

static METRIC_STAGE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vidmatch_stage_duration",
        "duration of each pipeline stage in seconds",
        &["stage"],
        exponential_buckets(0.001, 4.0, 12).unwrap()
    )
    .unwrap()
});

/// 增加已索引视频计数
pub fn inc_video_count(index: &str, n: usize) {
    METRIC_VIDEO_COUNT.with_label_values(&[index]).inc_by(n as u64);
}

/// 记录报告行数
pub fn set_report_rows(report: &str, match_distance: f32, rows: usize) {
    METRIC_REPORT_ROWS
        .with_label_values(&[report, &match_distance.to_string()])
        .set(rows as i64);
}

pub fn inc_flagged_videos(reason: &str, n: usize) {
    METRIC_FLAGGED_VIDEOS.with_label_values(&[reason]).inc_by(n as u64);
}

pub fn observe_stage_duration(stage: &str, seconds: f64) {
    METRIC_STAGE_DURATION.with_label_values(&[stage]).observe(seconds);
}
