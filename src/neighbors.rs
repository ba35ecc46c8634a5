use std::collections::BTreeMap;

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::index::VectorIndex;

/// 一条 (查询视频, 近邻视频, 距离) 记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborResult {
    pub query_id: String,
    pub neighbor_id: String,
    pub distance: f32,
}

/// 一个视频的近邻列表
///
/// 第一个元素永远是视频自己，距离为 0，由下游负责丢弃
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRow {
    pub query_id: String,
    pub neighbors: Vec<(String, f32)>,
}

/// 所有视频的近邻列表，按查询视频 ID 升序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborTable {
    rows: Vec<NeighborRow>,
}

impl NeighborTable {
    pub fn from_rows(mut rows: Vec<NeighborRow>) -> Self {
        rows.sort_by(|a, b| a.query_id.cmp(&b.query_id));
        Self { rows }
    }

    pub fn rows(&self) -> &[NeighborRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 展开为逐条记录
    pub fn results(&self) -> impl Iterator<Item = NeighborResult> + '_ {
        self.rows.iter().flat_map(|row| {
            row.neighbors.iter().map(|(id, distance)| NeighborResult {
                query_id: row.query_id.clone(),
                neighbor_id: id.clone(),
                distance: *distance,
            })
        })
    }

    /// 转换为 视频 ID => 近邻列表 的映射
    pub fn into_map(self) -> BTreeMap<String, Vec<(String, f32)>> {
        self.rows.into_iter().map(|row| (row.query_id, row.neighbors)).collect()
    }
}

/// 使用索引中的每个向量查询它的 k 个近邻（包括它自己）
///
/// 每个查询相互独立，使用 rayon 并行计算，结果按视频 ID 顺序返回，与完成顺序无关。
/// 索引中的向量数量少于 k 时返回全部向量
///
/// # Arguments
///
/// * `index` - 索引
/// * `k` - 近邻数量，包括视频自己
/// * `pb` - 进度条
pub fn query_all(index: &dyn VectorIndex, k: usize, pb: &ProgressBar) -> NeighborTable {
    let store = index.store();
    pb.set_length(store.len() as u64);

    let rows = (0..store.len())
        .into_par_iter()
        .progress_with(pb.clone())
        .map(|pos| query_one(index, pos, k))
        .collect::<Vec<_>>();

    debug!("完成 {} 个视频的 {} 近邻查询", rows.len(), k);
    // store 已按视频 ID 排序，rows 的顺序与之相同
    NeighborTable { rows }
}

/// 查询单个视频的 k 个近邻（包括它自己）
pub fn query_one(index: &dyn VectorIndex, pos: usize, k: usize) -> NeighborRow {
    let store = index.store();
    let query_id = store.id(pos).to_owned();
    let mut neighbors = Vec::with_capacity(k.min(store.len()));
    if k > 0 {
        neighbors.push((query_id.clone(), 0.0));
    }
    // 近邻数不会超过索引中其他向量的数量
    let k = k.saturating_sub(1).min(store.len().saturating_sub(1));
    for n in index.search(pos, k) {
        neighbors.push((store.id(n.pos).to_owned(), n.distance.sqrt()));
    }
    NeighborRow { query_id, neighbors }
}
