use log::info;

use super::ReportSink;
use crate::db::{Database, crud};
use crate::report::MatchReport;

/// 将报告保存到 SQLite 数据库
pub struct SqliteReportSink {
    db: Database,
}

impl SqliteReportSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ReportSink for SqliteReportSink {
    async fn write(&self, report: &MatchReport) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await?;

        let digest = report.digest();
        let run_id = crud::add_run(
            &mut *tx,
            report.match_distance,
            report.neighbors,
            report.filtered.is_some(),
            &digest,
        )
        .await?;

        for (entry, discarded) in report.unfiltered.iter().zip(report.discarded()) {
            crud::add_match(&mut *tx, run_id, entry, discarded).await?;
        }
        for record in &report.quality {
            crud::add_video_metadata(&mut *tx, run_id, record).await?;
        }

        tx.commit().await?;
        info!("已保存到数据库，运行 ID: {run_id}");
        Ok(())
    }
}
