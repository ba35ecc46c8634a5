mod jsonl;
mod npy;

use std::path::Path;

pub use self::jsonl::{JsonlSource, read_jsonl, write_jsonl};
pub use self::npy::{NpyFrameDir, NpySignatureDir};
use crate::index::EmbeddingRecord;
use crate::quality::VideoStats;

/// 提供每个视频的特征向量
pub trait EmbeddingSource {
    fn list(&self) -> anyhow::Result<Vec<EmbeddingRecord>>;
}

/// 提供每个视频的统计信息
pub trait QualitySource {
    fn list(&self) -> anyhow::Result<Vec<VideoStats>>;
}

impl EmbeddingSource for Vec<EmbeddingRecord> {
    fn list(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        Ok(self.clone())
    }
}

impl QualitySource for Vec<VideoStats> {
    fn list(&self) -> anyhow::Result<Vec<VideoStats>> {
        Ok(self.clone())
    }
}

/// 根据路径类型打开向量数据源：目录视为 npy 目录，文件视为 JSONL
pub fn open_embeddings(path: impl AsRef<Path>) -> Box<dyn EmbeddingSource> {
    let path = path.as_ref();
    if path.is_dir() {
        Box::new(NpySignatureDir::new(path))
    } else {
        Box::new(JsonlSource::new(path))
    }
}
