mod brute;
pub mod distance;
mod kdtree;
pub mod topk;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

pub use self::brute::BruteForceIndex;
pub use self::kdtree::KdTreeIndex;
pub use self::topk::{Neighbor, TopKNeighbors};
use crate::error::{MatchError, Result};

/// 一个视频的特征向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub video_id: String,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn new(video_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self { video_id: video_id.into(), vector }
    }
}

/// 索引类型
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    /// 维度不超过 kdtree_max_dim 时使用 k-d 树，否则暴力搜索
    #[default]
    Auto,
    /// 暴力计算所有距离
    BruteForce,
    /// k-d 树
    KdTree,
}

/// 精确的 k 近邻索引
///
/// 所有实现都必须是精确的：同样的输入，不同实现返回完全相同的结果
pub trait VectorIndex: Sync {
    /// 索引中的向量
    fn store(&self) -> &VectorStore;

    /// 搜索第 pos 个向量的 k 个近邻，不包含它自己
    ///
    /// 结果按距离升序排列，距离相同时按位置（即视频 ID）升序
    fn search(&self, pos: usize, k: usize) -> Vec<Neighbor>;

    /// 索引名称，用于日志
    fn name(&self) -> &'static str;
}

/// 按视频 ID 排序后连续存放的向量
///
/// 向量的位置与视频 ID 的字典序一致，所以按位置打破平局就是按视频 ID 打破平局
#[derive(Debug, Clone)]
pub struct VectorStore {
    ids: Vec<String>,
    data: Vec<f32>,
    dim: usize,
}

impl VectorStore {
    /// 检查输入并构建存储
    ///
    /// 调用者需要提前把 NaN/Inf 替换为 0
    pub fn build(mut records: Vec<EmbeddingRecord>) -> Result<Self> {
        let Some(first) = records.first() else {
            return Err(MatchError::EmptyInput);
        };
        let dim = first.vector.len();
        if let Some(r) = records.iter().find(|r| r.vector.len() != dim) {
            return Err(MatchError::DimensionMismatch {
                video_id: r.video_id.clone(),
                expected: dim,
                actual: r.vector.len(),
            });
        }

        records.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        if let Some(w) = records.windows(2).find(|w| w[0].video_id == w[1].video_id) {
            return Err(MatchError::DuplicateVideo { video_id: w[0].video_id.clone() });
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut data = Vec::with_capacity(records.len() * dim);
        for r in records {
            debug_assert!(r.vector.iter().all(|x| x.is_finite()));
            ids.push(r.video_id);
            data.extend_from_slice(&r.vector);
        }
        Ok(Self { ids, data, dim })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn id(&self, pos: usize) -> &str {
        &self.ids[pos]
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// 根据视频 ID 查找位置
    pub fn position(&self, video_id: &str) -> Option<usize> {
        self.ids.binary_search_by(|id| id.as_str().cmp(video_id)).ok()
    }

    pub fn vector(&self, pos: usize) -> &[f32] {
        &self.data[pos * self.dim..(pos + 1) * self.dim]
    }
}

/// 构建索引
///
/// # Arguments
///
/// * `records` - 所有视频的向量
/// * `kind` - 索引类型
/// * `kdtree_max_dim` - `IndexKind::Auto` 时使用 k-d 树的最大维度
pub fn build_index(
    records: Vec<EmbeddingRecord>,
    kind: IndexKind,
    kdtree_max_dim: usize,
) -> Result<Box<dyn VectorIndex>> {
    let store = VectorStore::build(records)?;
    let kind = match kind {
        IndexKind::Auto if store.dim() <= kdtree_max_dim => IndexKind::KdTree,
        IndexKind::Auto => IndexKind::BruteForce,
        kind => kind,
    };
    let index: Box<dyn VectorIndex> = match kind {
        IndexKind::KdTree => Box::new(KdTreeIndex::new(store)),
        _ => Box::new(BruteForceIndex::new(store)),
    };
    debug!(
        "索引构建完成: {} ({} 个向量, {} 维)",
        index.name(),
        index.store().len(),
        index.store().dim()
    );
    Ok(index)
}
