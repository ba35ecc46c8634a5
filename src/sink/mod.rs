mod csv;
mod sqlite;
mod stdout;

pub use self::csv::CsvReportSink;
pub use self::sqlite::SqliteReportSink;
pub use self::stdout::{OutputFormat, StdoutReportSink};
use crate::report::MatchReport;

/// 匹配报告的输出目标
pub trait ReportSink {
    fn write(
        &self,
        report: &MatchReport,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
