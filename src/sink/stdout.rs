use clap::ValueEnum;

use super::ReportSink;
use crate::report::MatchReport;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

/// 打印报告，启用过滤时打印过滤后的报告
pub struct StdoutReportSink {
    format: OutputFormat,
}

impl StdoutReportSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl ReportSink for StdoutReportSink {
    async fn write(&self, report: &MatchReport) -> anyhow::Result<()> {
        let rows = report.filtered.as_ref().unwrap_or(&report.unfiltered);
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(rows)?)
            }
            OutputFormat::Table => {
                for e in rows {
                    println!("{:.4}\t{}\t{}", e.distance, e.query_video, e.match_video);
                }
            }
        }
        Ok(())
    }
}
