use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::source::{NpyFrameDir, QualitySource, write_jsonl};

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    /// 包含 <id>_vgg_features.npy 和 <id>_vgg_frames.npy 的目录
    pub frames: PathBuf,
    /// 采样帧率，不指定时使用配置文件中的值
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,
    /// 使用正则表达式从帧级特征文件名中提取 id 分组作为视频 ID
    #[arg(short, long)]
    pub regex: Option<String>,
    /// 输出的 JSONL 文件，不指定时输出到标准输出
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let mut config = opts.load_config()?;
        if let Some(fps) = self.fps {
            config.frames_per_second = fps;
        }
        config.validate()?;

        block_in_place(|| -> anyhow::Result<()> {
            let mut source = NpyFrameDir::new(&self.frames, config.frames_per_second);
            if let Some(re) = &self.regex {
                source = source.with_regex(re)?;
            }
            let stats = source.list()?;
            match &self.output {
                Some(path) => {
                    write_jsonl(File::create(path)?, &stats)?;
                    info!("已保存 {} 个视频的统计信息: {}", stats.len(), path.display());
                }
                None => write_jsonl(std::io::stdout().lock(), &stats)?,
            }
            Ok(())
        })
    }
}
