use sqlx::FromRow;

/// 一次匹配运行
#[derive(Debug, Clone, FromRow)]
pub struct RunRecord {
    pub id: i64,
    /// 运行时间，UTC
    pub created_at: String,
    pub match_distance: f64,
    pub neighbors: i64,
    /// 是否启用了质量过滤
    pub filtered: bool,
    /// 报告的 blake3 哈希
    pub digest: String,
}

/// 匹配记录
#[derive(Debug, Clone, FromRow)]
pub struct MatchRecord {
    pub id: i64,
    pub run_id: i64,
    pub query_video: String,
    pub match_video: String,
    pub distance: f64,
    /// 是否被质量过滤丢弃
    pub discarded: bool,
}

/// 视频质量记录
#[derive(Debug, Clone, FromRow)]
pub struct VideoMetadataRecord {
    pub run_id: i64,
    pub video_id: String,
    pub video_length_seconds: f64,
    pub gray_max: f64,
    pub flagged: bool,
}
