use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::cli::*;
use crate::error::MatchError;
use crate::index::IndexKind;
use crate::quality::QualityPolicy;

static CONF_DIR: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    ProjectDirs::from("", "winnow", "vidmatch").map(|dirs| dirs.config_dir().to_path_buf())
});

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    CONF_DIR.as_ref().map(|dir| dir.join("config.yaml"))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vidmatch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 配置文件路径，不指定时使用用户配置目录下的 config.yaml（如果存在）
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Opts {
    /// 加载配置文件，没有配置文件时使用默认配置
    pub fn load_config(&self) -> anyhow::Result<MatchConfig> {
        match &self.config {
            Some(path) => MatchConfig::from_file(path),
            None => match default_config_file().filter(|p| p.exists()) {
                Some(path) => MatchConfig::from_file(path),
                None => {
                    debug!("未找到配置文件，使用默认配置");
                    Ok(MatchConfig::default())
                }
            },
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 查找重复视频，生成匹配报告
    Run(RunCommand),
    /// 查询单个视频的近邻
    Query(QueryCommand),
    /// 由帧级数据计算视频质量统计信息
    Stats(StatsCommand),
}

/// 匹配配置
///
/// 键名与 config.yaml 保持一致，未知的键会被忽略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// 每个视频查询的近邻数量，包括它自己
    pub neighbors: usize,
    /// 两个视频被视为重复的最大欧氏距离
    pub match_distance: f32,
    /// 是否过滤过短或过暗的视频
    pub filter_dark_videos: bool,
    /// 最大灰度低于该值的视频被视为过暗
    #[serde(rename = "filter_dark_videos_thr")]
    pub dark_frame_threshold: f32,
    /// 时长低于该值（秒）的视频被视为过短
    pub min_video_duration_seconds: f32,
    /// 缺少质量数据的视频视为合格，而不是报错
    pub tolerate_missing_quality: bool,
    /// 帧级数据的采样帧率
    pub frames_per_second: f32,
    /// 索引类型
    pub index: IndexKind,
    /// 自动选择索引时，使用 k-d 树的最大维度
    pub kdtree_max_dim: usize,
    /// 报告输出目录
    pub destination_folder: PathBuf,
    /// 计算线程数，0 表示使用全部 CPU
    pub threads: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            neighbors: 20,
            match_distance: 0.75,
            filter_dark_videos: false,
            dark_frame_threshold: 2.0,
            min_video_duration_seconds: 3.0,
            tolerate_missing_quality: false,
            frames_per_second: 1.0,
            index: IndexKind::Auto,
            kdtree_max_dim: 32,
            destination_folder: PathBuf::from("output"),
            threads: 0,
        }
    }
}

impl MatchConfig {
    /// 从 YAML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        debug!("读取配置文件: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        Ok(config)
    }

    /// 检查参数范围，必须在任何计算之前调用
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.neighbors < 1 {
            return Err(invalid("neighbors", self.neighbors as f64, "必须大于等于 1"));
        }
        if !(self.match_distance.is_finite() && self.match_distance > 0.0) {
            return Err(invalid("match_distance", self.match_distance as f64, "必须为正数"));
        }
        if !(self.min_video_duration_seconds.is_finite() && self.min_video_duration_seconds > 0.0)
        {
            let value = self.min_video_duration_seconds as f64;
            return Err(invalid("min_video_duration_seconds", value, "必须为正数"));
        }
        let dark = self.dark_frame_threshold;
        if !(dark.is_finite() && dark > 0.0 && dark <= 255.0) {
            return Err(invalid("filter_dark_videos_thr", dark as f64, "必须在 (0, 255] 之间"));
        }
        if !(self.frames_per_second.is_finite() && self.frames_per_second > 0.0) {
            return Err(invalid("frames_per_second", self.frames_per_second as f64, "必须为正数"));
        }
        Ok(())
    }

    pub fn quality_policy(&self) -> QualityPolicy {
        QualityPolicy {
            min_video_duration_seconds: self.min_video_duration_seconds,
            dark_frame_threshold: self.dark_frame_threshold,
            tolerate_missing: self.tolerate_missing_quality,
        }
    }
}

fn invalid(name: &'static str, value: f64, reason: &'static str) -> MatchError {
    MatchError::InvalidThreshold { name, value, reason }
}

/// 命令行中可以覆盖配置文件的选项
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// 每个视频查询的近邻数量（包括它自己）
    #[arg(short = 'k', long, value_name = "K")]
    pub neighbors: Option<usize>,
    /// 两个视频被视为重复的最大距离
    #[arg(short, long, value_name = "DISTANCE")]
    pub distance: Option<f32>,
    /// 过滤过短或过暗的视频
    #[arg(long)]
    pub filter: bool,
    /// 最大灰度低于该值的视频被视为过暗
    #[arg(long, value_name = "GRAY")]
    pub dark_threshold: Option<f32>,
    /// 时长低于该值（秒）的视频被视为过短
    #[arg(long, value_name = "SECONDS")]
    pub min_duration: Option<f32>,
    /// 缺少质量数据时不报错，视为合格
    #[arg(long)]
    pub tolerate_missing: bool,
    /// 帧级数据的采样帧率
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,
    /// 索引类型
    #[arg(long, value_enum)]
    pub index: Option<IndexKind>,
    /// 报告输出目录
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// 计算线程数，0 表示使用全部 CPU
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut MatchConfig) {
        if let Some(k) = self.neighbors {
            config.neighbors = k;
        }
        if let Some(d) = self.distance {
            config.match_distance = d;
        }
        if self.filter {
            config.filter_dark_videos = true;
        }
        if let Some(t) = self.dark_threshold {
            config.dark_frame_threshold = t;
        }
        if let Some(s) = self.min_duration {
            config.min_video_duration_seconds = s;
        }
        if self.tolerate_missing {
            config.tolerate_missing_quality = true;
        }
        if let Some(fps) = self.fps {
            config.frames_per_second = fps;
        }
        if let Some(index) = self.index {
            config.index = index;
        }
        if let Some(output) = &self.output {
            config.destination_folder = output.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
    }
}

/// 报告输出目录
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 创建目录
    pub fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }

    /// 返回未过滤报告的路径
    pub fn unfiltered_report(&self, distance: f32) -> PathBuf {
        self.path.join(format!("matches_at_{}_distance.csv", distance))
    }

    /// 返回过滤后报告的路径
    pub fn filtered_report(&self, distance: f32) -> PathBuf {
        self.path.join(format!("matches_at_{}_distance_filtered.csv", distance))
    }

    /// 返回视频质量数据的路径
    pub fn metadata(&self) -> PathBuf {
        self.path.join("metadata_signatures.csv")
    }
}
