mod frames;

use std::collections::{BTreeSet, HashMap};

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub use self::frames::FrameStats;
use crate::error::{MatchError, Result};
use crate::report::Report;

/// 由帧级数据计算出的视频统计信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub video_id: String,
    /// 视频时长（秒）
    pub video_length_seconds: f32,
    /// 每帧激活值之和的均值
    pub activity_mean: f32,
    /// 每帧激活值之和的标准差
    pub activity_std: f32,
    /// 每帧激活值之和的最大差值
    pub activity_max_delta: f32,
    /// 每帧平均灰度的均值
    pub gray_mean: f32,
    /// 每帧平均灰度的标准差
    pub gray_std: f32,
    /// 每帧平均灰度的最大值
    pub gray_max: f32,
}

/// 视频质量记录，包含统计信息和判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    pub video_id: String,
    pub video_length_seconds: f32,
    pub activity_mean: f32,
    pub activity_std: f32,
    pub activity_max_delta: f32,
    pub gray_mean: f32,
    pub gray_std: f32,
    pub gray_max: f32,
    /// 时长过短
    pub duration_flag: bool,
    /// 画面过暗
    pub dark_flag: bool,
    /// duration_flag || dark_flag
    pub flagged: bool,
}

/// 质量过滤策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPolicy {
    pub min_video_duration_seconds: f32,
    pub dark_frame_threshold: f32,
    /// 缺少质量数据的视频视为合格，而不是报错
    pub tolerate_missing: bool,
}

impl QualityPolicy {
    /// 根据阈值判定视频质量
    pub fn assess(&self, stats: VideoStats) -> QualityRecord {
        let duration_flag = stats.video_length_seconds < self.min_video_duration_seconds;
        let dark_flag = stats.gray_max < self.dark_frame_threshold;
        QualityRecord {
            video_id: stats.video_id,
            video_length_seconds: stats.video_length_seconds,
            activity_mean: stats.activity_mean,
            activity_std: stats.activity_std,
            activity_max_delta: stats.activity_max_delta,
            gray_mean: stats.gray_mean,
            gray_std: stats.gray_std,
            gray_max: stats.gray_max,
            duration_flag,
            dark_flag,
            flagged: duration_flag || dark_flag,
        }
    }

    /// 批量判定，结果按视频 ID 排序
    pub fn assess_all(&self, stats: impl IntoIterator<Item = VideoStats>) -> Vec<QualityRecord> {
        let mut records = stats.into_iter().map(|s| self.assess(s)).collect::<Vec<_>>();
        records.sort_by(|a, b| a.video_id.cmp(&b.video_id));

        let short = records.iter().filter(|r| r.duration_flag).count();
        let dark = records.iter().filter(|r| r.dark_flag).count();
        info!("因时长过短被标记的视频: {short}");
        info!("因画面过暗被标记的视频: {dark}");
        crate::metrics::inc_flagged_videos("duration", short);
        crate::metrics::inc_flagged_videos("dark", dark);

        records
    }
}

/// 丢弃任意一端视频被标记的匹配
///
/// 报告中的视频缺少质量数据时，严格模式返回 `MissingQualityData`，
/// 宽松模式视为未标记并打印警告
pub fn filter_report(
    report: &Report,
    records: &[QualityRecord],
    policy: &QualityPolicy,
) -> Result<Report> {
    let by_id = records.iter().map(|r| (r.video_id.as_str(), r)).collect::<HashMap<_, _>>();

    let missing = report
        .video_ids()
        .filter(|id| !by_id.contains_key(id))
        .map(str::to_owned)
        .collect::<BTreeSet<_>>();
    if !missing.is_empty() {
        let video_ids = missing.into_iter().collect::<Vec<_>>();
        if !policy.tolerate_missing {
            return Err(MatchError::MissingQualityData { video_ids });
        }
        warn!("{} 个视频缺少质量数据，视为未标记: {}", video_ids.len(), video_ids.join(", "));
    }

    let flagged = |id: &str| by_id.get(id).is_some_and(|r| r.flagged);
    Ok(report.filter(|e| !flagged(&e.query_video) && !flagged(&e.match_video)))
}
