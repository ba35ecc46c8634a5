use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::pairs::MatchPair;
use crate::quality::QualityRecord;

/// 报告中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// 锚点视频
    pub query_video: String,
    /// 与锚点匹配的视频
    pub match_video: String,
    pub distance: f32,
}

impl ReportEntry {
    pub fn from_pair(anchor: &str, pair: &MatchPair) -> Self {
        let (query, other) = match pair.other(anchor) {
            Some(other) => (anchor, other),
            None => (pair.video_a(), pair.video_b()),
        };
        Self { query_video: query.to_owned(), match_video: other.to_owned(), distance: pair.distance() }
    }

    /// 转换回无序匹配对
    pub fn pair(&self) -> Option<MatchPair> {
        MatchPair::new(self.query_video.as_str(), self.match_video.as_str(), self.distance)
    }

    /// 无序的去重键
    pub fn key(&self) -> (&str, &str) {
        if self.query_video <= self.match_video {
            (&self.query_video, &self.match_video)
        } else {
            (&self.match_video, &self.query_video)
        }
    }

    pub fn involves(&self, video_id: &str) -> bool {
        self.query_video == video_id || self.match_video == video_id
    }
}

/// 有序的匹配报告
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReportEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有涉及的视频 ID，可能重复
    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().flat_map(|e| [e.query_video.as_str(), e.match_video.as_str()])
    }

    pub fn contains(&self, entry: &ReportEntry) -> bool {
        self.entries.iter().any(|e| e.key() == entry.key())
    }

    /// 保留满足条件的行，顺序不变
    pub fn filter(&self, mut keep: impl FnMut(&ReportEntry) -> bool) -> Report {
        self.entries.iter().filter(|e| keep(e)).cloned().collect()
    }

    /// 对所有行计算 blake3 哈希，两次运行结果相同时哈希相同
    pub fn digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        self.update_hasher(&mut hasher);
        hasher.finalize()
    }

    fn update_hasher(&self, hasher: &mut blake3::Hasher) {
        for e in &self.entries {
            hasher.update(e.query_video.as_bytes());
            hasher.update(&[0]);
            hasher.update(e.match_video.as_bytes());
            hasher.update(&[0]);
            hasher.update(&e.distance.to_le_bytes());
        }
    }
}

impl FromIterator<ReportEntry> for Report {
    fn from_iter<T: IntoIterator<Item = ReportEntry>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ReportEntry;
    type IntoIter = std::slice::Iter<'a, ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// 一次运行的全部结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    /// 匹配距离阈值
    pub match_distance: f32,
    /// 每个视频查询的近邻数量
    pub neighbors: usize,
    /// 参与匹配的视频数量
    pub videos: usize,
    /// 未过滤的报告
    pub unfiltered: Report,
    /// 过滤掉低质量视频后的报告，未启用过滤时为空
    pub filtered: Option<Report>,
    /// 每个视频的质量数据，用于审计
    pub quality: Vec<QualityRecord>,
}

impl MatchReport {
    /// 整个结果的哈希，十六进制
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        self.unfiltered.update_hasher(&mut hasher);
        if let Some(filtered) = &self.filtered {
            hasher.update(b"\xfffiltered");
            filtered.update_hasher(&mut hasher);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// 未过滤报告中每一行是否被质量过滤丢弃
    pub fn discarded(&self) -> Vec<bool> {
        let Some(filtered) = &self.filtered else {
            return vec![false; self.unfiltered.len()];
        };
        let kept = filtered.iter().map(|e| e.key()).collect::<HashSet<_>>();
        self.unfiltered.iter().map(|e| !kept.contains(&e.key())).collect()
    }

    /// 被标记为低质量的视频数量
    pub fn flagged_videos(&self) -> usize {
        self.quality.iter().filter(|r| r.flagged).count()
    }
}
