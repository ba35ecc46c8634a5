use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

/// 出错的流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Index,
    Quality,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Index => "index",
            Self::Quality => "quality",
        };
        f.write_str(name)
    }
}

/// 匹配流程中的致命错误，任何一个都会中止本次运行
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// 向量维度不一致
    #[error("[index] 视频 {video_id} 的向量维度为 {actual}，期望 {expected}")]
    DimensionMismatch { video_id: String, expected: usize, actual: usize },

    /// 没有任何向量
    #[error("[index] 没有输入任何视频向量")]
    EmptyInput,

    /// 同一个视频 ID 出现了多次
    #[error("[index] 视频 {video_id} 重复出现")]
    DuplicateVideo { video_id: String },

    /// 严格模式下，匹配结果中的视频缺少质量数据
    #[error("[quality] 以下视频缺少质量数据: {}", .video_ids.join(", "))]
    MissingQualityData { video_ids: Vec<String> },

    /// 阈值或参数超出范围
    #[error("[config] 无效的参数 {name} = {value}: {reason}")]
    InvalidThreshold { name: &'static str, value: f64, reason: &'static str },
}

impl MatchError {
    /// 返回首先发现该错误的阶段
    pub fn stage(&self) -> Stage {
        match self {
            Self::DimensionMismatch { .. } | Self::EmptyInput | Self::DuplicateVideo { .. } => {
                Stage::Index
            }
            Self::MissingQualityData { .. } => Stage::Quality,
            Self::InvalidThreshold { .. } => Stage::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_errors() {
        assert_eq!(MatchError::EmptyInput.stage(), Stage::Index);
        assert_eq!(MatchError::MissingQualityData { video_ids: vec![] }.stage(), Stage::Quality);
        let err = MatchError::InvalidThreshold { name: "neighbors", value: 0., reason: "必须 >= 1" };
        assert_eq!(err.stage(), Stage::Config);
    }

    #[test]
    fn test_message_names_videos() {
        let err = MatchError::MissingQualityData { video_ids: vec!["a".into(), "b".into()] };
        let msg = err.to_string();
        assert!(msg.contains("[quality]"));
        assert!(msg.contains("a, b"));
    }
}
