use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use indicatif::ProgressBar;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use tokio::task::{block_in_place, spawn_blocking};

use crate::cli::SubCommandExtend;
use crate::config::{ConfigOverrides, MatchConfig, Opts, OutputDir};
use crate::db::init_db;
use crate::engine::MatchEngine;
use crate::report::MatchReport;
use crate::sink::*;
use crate::source::*;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    /// 视频向量，可以是 JSONL 文件，也可以是包含 <id>_vgg_signature.npy 的目录
    pub embeddings: PathBuf,
    /// 视频统计信息，JSONL 格式，可由 stats 子命令生成
    #[arg(short, long, value_name = "JSONL", conflicts_with = "frames")]
    pub quality: Option<PathBuf>,
    /// 包含 <id>_vgg_features.npy 和 <id>_vgg_frames.npy 的目录，用于计算视频统计信息
    #[arg(short, long, value_name = "DIR")]
    pub frames: Option<PathBuf>,
    /// 使用正则表达式从向量文件名中提取 id 分组作为视频 ID
    /// 例：`^(?<id>.+)_vgg_signature\.npy$`
    #[arg(short, long, verbatim_doc_comment)]
    pub regex: Option<String>,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    /// 同时将报告保存到 SQLite 数据库
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,
    /// 将报告打印到标准输出
    #[arg(long, value_name = "FORMAT")]
    pub print: Option<OutputFormat>,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl SubCommandExtend for RunCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let mut config = opts.load_config()?;
        self.overrides.apply(&mut config);

        if config.filter_dark_videos
            && !config.tolerate_missing_quality
            && self.quality.is_none()
            && self.frames.is_none()
        {
            bail!("启用质量过滤时需要指定 --quality 或 --frames");
        }

        let report = block_in_place(|| self.match_videos(config.clone()))?;

        CsvReportSink::new(OutputDir::new(&config.destination_folder)).write(&report).await?;

        if let Some(path) = &self.database {
            let db = init_db(path).await?;
            SqliteReportSink::new(db).write(&report).await?;
        }

        if let Some(format) = self.print {
            StdoutReportSink::new(format).write(&report).await?;
        }

        if let Some(url) = self.prometheus_push.clone() {
            self.push_metrics(url).await?;
        }

        Ok(())
    }
}

impl RunCommand {
    fn match_videos(&self, config: MatchConfig) -> anyhow::Result<MatchReport> {
        let embeddings: Box<dyn EmbeddingSource> = match &self.regex {
            Some(re) => Box::new(NpySignatureDir::new(&self.embeddings).with_regex(re)?),
            None => open_embeddings(&self.embeddings),
        };
        let quality: Option<Box<dyn QualitySource>> = match (&self.quality, &self.frames) {
            (Some(path), _) => Some(Box::new(JsonlSource::new(path))),
            (None, Some(dir)) => Some(Box::new(NpyFrameDir::new(dir, config.frames_per_second))),
            (None, None) => None,
        };

        let pb = ProgressBar::no_length().with_style(pb_style());
        let engine = MatchEngine::new(config)?.with_progress(pb.clone());
        let report = engine.run_sources(embeddings.as_ref(), quality.as_deref())?;
        pb.finish_and_clear();

        info!(
            "共 {} 个视频，{} 个匹配，{} 个视频被标记为低质量",
            report.videos,
            report.unfiltered.len(),
            report.flagged_videos()
        );
        Ok(report)
    }

    async fn push_metrics(&self, url: String) -> anyhow::Result<()> {
        let instance = self.prometheus_instance.clone().unwrap_or_else(|| "vidmatch".to_string());
        let auth = match &self.prometheus_auth {
            Some(s) => {
                let (username, password) =
                    s.split_once(':').context("prometheus 认证信息格式应为 username:password")?;
                Some(BasicAuthentication {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            None => None,
        };

        let metric_families = prometheus::gather();
        let r = spawn_blocking(move || {
            prometheus::push_metrics(
                "vidmatch",
                labels! {
                    "instance".to_string() => instance,
                },
                &url,
                metric_families,
                auth,
            )
        })
        .await?;
        if let Err(e) = r {
            error!("推送指标失败: {e}");
        }
        Ok(())
    }
}
