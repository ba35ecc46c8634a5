use indicatif::ProgressBar;
use log::{debug, info, warn};

use crate::config::MatchConfig;
use crate::error::Result;
use crate::index::{self, EmbeddingRecord, VectorIndex, distance};
use crate::neighbors::{self, NeighborRow, NeighborTable};
use crate::quality::{self, VideoStats};
use crate::report::MatchReport;
use crate::source::{EmbeddingSource, QualitySource};
use crate::utils::TimeMeasure;
use crate::{metrics, pairs, rank};

/// 重复视频匹配引擎
///
/// 流程：向量索引 -> 近邻查询 -> 匹配对去重 -> 簇排序 -> 质量过滤
pub struct MatchEngine {
    config: MatchConfig,
    pb: ProgressBar,
    pool: Option<rayon::ThreadPool>,
}

impl MatchEngine {
    /// 检查配置并创建引擎
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let threads = match config.threads {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("无法创建 {threads} 个线程的线程池，使用全局线程池: {e}");
                None
            }
        };
        debug!("使用 {threads} 个线程");
        Ok(Self { config, pb: ProgressBar::hidden(), pool })
    }

    /// 设置近邻查询的进度条
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// 清理向量中的 NaN/Inf 并构建索引
    pub fn build_index(&self, mut embeddings: Vec<EmbeddingRecord>) -> Result<Box<dyn VectorIndex>> {
        let mut dirty = 0;
        for record in embeddings.iter_mut() {
            let n = distance::sanitize(&mut record.vector);
            if n > 0 {
                debug!("视频 {} 的向量中有 {} 个非有限值", record.video_id, n);
                dirty += 1;
            }
        }
        if dirty > 0 {
            warn!("{dirty} 个视频的向量包含 NaN 或 Inf，已替换为 0");
        }
        let index = index::build_index(embeddings, self.config.index, self.config.kdtree_max_dim)?;
        metrics::inc_video_count(index.name(), index.store().len());
        Ok(index)
    }

    /// 对所有视频进行近邻查询
    pub fn query_all(&self, index: &dyn VectorIndex) -> NeighborTable {
        let k = self.config.neighbors;
        let query = || neighbors::query_all(index, k, &self.pb);
        match &self.pool {
            Some(pool) => pool.install(query),
            None => query(),
        }
    }

    /// 查询单个视频的近邻，视频不存在时返回 None
    pub fn query(
        &self,
        embeddings: Vec<EmbeddingRecord>,
        video_id: &str,
    ) -> Result<Option<NeighborRow>> {
        let index = self.build_index(embeddings)?;
        Ok(index
            .store()
            .position(video_id)
            .map(|pos| neighbors::query_one(index.as_ref(), pos, self.config.neighbors)))
    }

    /// 运行完整的匹配流程
    ///
    /// # Arguments
    ///
    /// * `embeddings` - 所有视频的向量
    /// * `stats` - 视频统计信息，为 None 时所有视频都被视为缺少质量数据
    pub fn run(
        &self,
        embeddings: Vec<EmbeddingRecord>,
        stats: Option<Vec<VideoStats>>,
    ) -> Result<MatchReport> {
        let config = &self.config;
        let mut tm = TimeMeasure::new();

        let index = tm.measure("index", || self.build_index(embeddings))?;
        let store = index.store();
        info!("使用 {} 索引 {} 个视频，维度 {}", index.name(), store.len(), store.dim());

        let table = tm.measure("neighbors", || self.query_all(index.as_ref()));

        let clusters = tm.measure("pairs", || pairs::canonicalize(&table, config.match_distance));
        let clusters = tm.measure("rank", || rank::rank_clusters(clusters));
        let unfiltered = rank::flatten(&clusters);
        info!(
            "距离 {} 以内找到 {} 个匹配，分为 {} 个簇",
            config.match_distance,
            unfiltered.len(),
            clusters.len()
        );

        let policy = config.quality_policy();
        let stats = stats.unwrap_or_default();
        let before = stats.len();
        let known = stats.into_iter().filter(|s| store.position(&s.video_id).is_some());
        let quality = policy.assess_all(known);
        if quality.len() < before {
            debug!("忽略 {} 条未知视频的质量数据", before - quality.len());
        }

        let filtered = if config.filter_dark_videos {
            let filtered =
                tm.measure("quality", || quality::filter_report(&unfiltered, &quality, &policy))?;
            info!("质量过滤丢弃 {} 个匹配", unfiltered.len() - filtered.len());
            Some(filtered)
        } else {
            None
        };

        let report = MatchReport {
            match_distance: config.match_distance,
            neighbors: config.neighbors,
            videos: store.len(),
            unfiltered,
            filtered,
            quality,
        };
        metrics::set_report_rows("unfiltered", config.match_distance, report.unfiltered.len());
        if let Some(filtered) = &report.filtered {
            metrics::set_report_rows("filtered", config.match_distance, filtered.len());
        }
        info!("报告哈希: {}，总耗时 {:.3}s", report.digest(), tm.total().as_secs_f64());
        Ok(report)
    }

    /// 从数据源读取输入并运行
    pub fn run_sources(
        &self,
        embeddings: &dyn EmbeddingSource,
        stats: Option<&dyn QualitySource>,
    ) -> anyhow::Result<MatchReport> {
        let embeddings = embeddings.list()?;
        let stats = match stats {
            Some(source) => Some(source.list()?),
            None => None,
        };
        Ok(self.run(embeddings, stats)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MatchError, Stage};

    fn config() -> MatchConfig {
        MatchConfig { match_distance: 0.5, neighbors: 5, ..Default::default() }
    }

    fn stats(id: &str, length: f32, gray_max: f32) -> VideoStats {
        VideoStats {
            video_id: id.into(),
            video_length_seconds: length,
            activity_mean: 0.0,
            activity_std: 0.0,
            activity_max_delta: 0.0,
            gray_mean: 0.0,
            gray_std: 0.0,
            gray_max,
        }
    }

    fn embeddings() -> Vec<EmbeddingRecord> {
        vec![
            EmbeddingRecord::new("v3", vec![0.0, 0.1]),
            EmbeddingRecord::new("v1", vec![0.0, 0.0]),
            EmbeddingRecord::new("v2", vec![0.0, 0.0]),
            EmbeddingRecord::new("v9", vec![10.0, 10.0]),
        ]
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = MatchEngine::new(MatchConfig { neighbors: 0, ..config() }).err().unwrap();
        assert!(matches!(err, MatchError::InvalidThreshold { name: "neighbors", .. }));
    }

    #[test]
    fn test_run_unfiltered() {
        let engine = MatchEngine::new(config()).unwrap();
        let report = engine.run(embeddings(), None).unwrap();
        assert_eq!(report.videos, 4);
        assert!(report.filtered.is_none());
        let rows = report
            .unfiltered
            .iter()
            .map(|e| (e.query_video.as_str(), e.match_video.as_str()))
            .collect::<Vec<_>>();
        // v2 与 v3 的匹配在 v1 的簇中没有出现过，归入 v2 的簇
        assert_eq!(rows, [("v1", "v2"), ("v1", "v3"), ("v2", "v3")]);
    }

    #[test]
    fn test_nan_is_sanitized() {
        let engine = MatchEngine::new(config()).unwrap();
        let records = vec![
            EmbeddingRecord::new("a", vec![f32::NAN, 0.0]),
            EmbeddingRecord::new("b", vec![0.0, 0.0]),
        ];
        let report = engine.run(records, None).unwrap();
        assert_eq!(report.unfiltered.len(), 1);
        assert_eq!(report.unfiltered.entries()[0].distance, 0.0);
    }

    #[test]
    fn test_run_filtered() {
        let engine = MatchEngine::new(MatchConfig { filter_dark_videos: true, ..config() }).unwrap();
        let stats = vec![
            stats("v1", 10.0, 100.0),
            stats("v2", 1.0, 100.0),
            stats("v3", 10.0, 100.0),
            stats("v9", 10.0, 100.0),
            stats("unknown", 10.0, 100.0),
        ];
        let report = engine.run(embeddings(), Some(stats)).unwrap();
        let filtered = report.filtered.as_ref().unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(filtered.entries()[0].involves("v3"));
        assert_eq!(report.quality.len(), 4);
        assert_eq!(report.discarded(), [true, false, true]);
    }

    #[test]
    fn test_run_filtered_without_stats() {
        let engine = MatchEngine::new(MatchConfig { filter_dark_videos: true, ..config() }).unwrap();
        let err = engine.run(embeddings(), None).unwrap_err();
        assert_eq!(err.stage(), Stage::Quality);
    }

    #[test]
    fn test_query_single() {
        let engine = MatchEngine::new(MatchConfig { neighbors: 2, ..config() }).unwrap();
        let row = engine.query(embeddings(), "v9").unwrap().unwrap();
        assert_eq!(row.neighbors[0], ("v9".to_string(), 0.0));
        assert_eq!(row.neighbors[1].0, "v3");
        assert!(engine.query(embeddings(), "missing").unwrap().is_none());
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let engine = MatchEngine::new(MatchConfig { threads: 2, ..config() }).unwrap();
        let expected = MatchEngine::new(config()).unwrap().run(embeddings(), None).unwrap();
        assert_eq!(engine.run(embeddings(), None).unwrap(), expected);
    }
}
