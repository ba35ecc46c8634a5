use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::neighbors::NeighborTable;

/// 无序的视频匹配对
///
/// 两个视频 ID 按字典序存放，(A, B) 和 (B, A) 是同一个匹配对。
/// 两个 ID 相同的匹配对无法被构造出来
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    video_a: String,
    video_b: String,
    distance: f32,
}

impl MatchPair {
    /// 构造匹配对，x 和 y 相同时返回 None
    pub fn new(x: impl Into<String>, y: impl Into<String>, distance: f32) -> Option<Self> {
        let (x, y) = (x.into(), y.into());
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { video_a: x, video_b: y, distance }),
            std::cmp::Ordering::Greater => Some(Self { video_a: y, video_b: x, distance }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn video_a(&self) -> &str {
        &self.video_a
    }

    pub fn video_b(&self) -> &str {
        &self.video_b
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// 去重用的键
    pub fn key(&self) -> (&str, &str) {
        (&self.video_a, &self.video_b)
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.video_a == video_id || self.video_b == video_id
    }

    /// 返回匹配对中的另一个视频
    pub fn other(&self, video_id: &str) -> Option<&str> {
        if self.video_a == video_id {
            Some(&self.video_b)
        } else if self.video_b == video_id {
            Some(&self.video_a)
        } else {
            None
        }
    }
}

/// 以一个查询视频为锚点的匹配簇
///
/// 锚点只用于展示排序，不影响匹配对本身
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCluster {
    /// 锚点视频
    pub anchor: String,
    /// 阈值内的所有近邻，不含锚点自己，按距离排列
    pub members: Vec<String>,
    /// 锚点与每个成员的匹配对，同一个匹配对可能同时出现在两个簇中
    pub pairs: Vec<MatchPair>,
}

impl MatchCluster {
    /// 簇的大小，包括锚点
    pub fn size(&self) -> usize {
        self.members.len() + 1
    }
}

/// 将 k 近邻表按查询视频分组为匹配簇
///
/// - 丢弃视频自己
/// - 丢弃距离大于 threshold 的近邻
/// - (A, B) 和 (B, A) 的距离统一取两者较小值
///
/// 跨簇的去重在排序之后进行，见 [`crate::rank::flatten`]
pub fn canonicalize(table: &NeighborTable, threshold: f32) -> Vec<MatchCluster> {
    let mut clusters: Vec<MatchCluster> = vec![];
    // (video_a, video_b) => 最小距离
    let mut best: HashMap<(String, String), f32> = HashMap::new();

    for row in table.rows() {
        let mut members = vec![];
        let mut pairs = vec![];

        for (neighbor_id, distance) in &row.neighbors {
            if *distance > threshold {
                continue;
            }
            let Some(pair) = MatchPair::new(row.query_id.as_str(), neighbor_id.as_str(), *distance)
            else {
                continue;
            };
            best.entry((pair.video_a.clone(), pair.video_b.clone()))
                .and_modify(|d| *d = d.min(pair.distance))
                .or_insert(pair.distance);
            members.push(neighbor_id.clone());
            pairs.push(pair);
        }

        if !members.is_empty() {
            clusters.push(MatchCluster { anchor: row.query_id.clone(), members, pairs });
        }
    }

    for pair in clusters.iter_mut().flat_map(|c| c.pairs.iter_mut()) {
        if let Some(&d) = best.get(&(pair.video_a.clone(), pair.video_b.clone())) {
            pair.distance = d;
        }
    }
    clusters
}
