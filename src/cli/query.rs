use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::engine::MatchEngine;
use crate::neighbors::NeighborRow;
use crate::sink::OutputFormat;
use crate::source::open_embeddings;

#[derive(Parser, Debug, Clone)]
pub struct QueryCommand {
    /// 视频向量，可以是 JSONL 文件，也可以是包含 <id>_vgg_signature.npy 的目录
    pub embeddings: PathBuf,
    /// 被查询的视频 ID
    pub video_id: String,
    /// 近邻数量（包括它自己）
    #[arg(short, long)]
    pub k: Option<usize>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for QueryCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let mut config = opts.load_config()?;
        if let Some(k) = self.k {
            config.neighbors = k;
        }

        let row = block_in_place(|| -> anyhow::Result<_> {
            let embeddings = open_embeddings(&self.embeddings).list()?;
            let engine = MatchEngine::new(config)?;
            Ok(engine.query(embeddings, &self.video_id)?)
        })?
        .with_context(|| format!("视频不存在: {}", self.video_id))?;

        print_result(&row, self.output_format)
    }
}

fn print_result(row: &NeighborRow, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(row)?)
        }
        OutputFormat::Table => {
            for (id, distance) in &row.neighbors {
                println!("{:.4}\t{}", distance, id);
            }
        }
    }
    Ok(())
}
