use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;

use super::ReportSink;
use crate::config::OutputDir;
use crate::report::{MatchReport, Report};

/// 将报告写入输出目录下的 CSV 文件
pub struct CsvReportSink {
    dir: OutputDir,
}

impl CsvReportSink {
    pub fn new(dir: OutputDir) -> Self {
        Self { dir }
    }
}

impl ReportSink for CsvReportSink {
    async fn write(&self, report: &MatchReport) -> anyhow::Result<()> {
        self.dir
            .create()
            .with_context(|| format!("无法创建输出目录: {}", self.dir.path().display()))?;

        let path = self.dir.unfiltered_report(report.match_distance);
        write_report(&path, &report.unfiltered)?;
        info!("已保存 {} 个匹配: {}", report.unfiltered.len(), path.display());

        let path = self.dir.filtered_report(report.match_distance);
        match &report.filtered {
            Some(filtered) => {
                write_report(&path, filtered)?;
                info!("已保存 {} 个过滤后的匹配: {}", filtered.len(), path.display());
            }
            None => remove_stale(&path)?,
        }

        let path = self.dir.metadata();
        if report.quality.is_empty() {
            remove_stale(&path)?;
        } else {
            write_csv(&path, &report.quality)?;
            info!("已保存 {} 个视频的质量数据: {}", report.quality.len(), path.display());
        }
        Ok(())
    }
}

/// 删除上一次运行留下、本次没有生成的文件
fn remove_stale(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            warn!("已删除上一次运行的旧文件: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("无法删除文件: {}", path.display())),
    }
}

/// 报告为空时也写入表头
fn write_report(path: &Path, report: &Report) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("无法创建文件: {}", path.display()))?;
    wtr.write_record(["query_video", "match_video", "distance"])?;
    for entry in report {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_csv<'a, T, I>(path: &Path, rows: I) -> anyhow::Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("无法创建文件: {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
